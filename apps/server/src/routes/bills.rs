//! # Bill Handlers
//!
//! ## Batch Generation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/bills/generate                                               │
//! │                                                                         │
//! │  unbilled transactions (date order)                                     │
//! │       │      catalog snapshot        previous bill's item names         │
//! │       │            │                          │                         │
//! │       ▼            ▼                          ▼                         │
//! │  generate_batch ── in-memory: compose, decrement, thread lookback       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.bills().create_many ── one SQLite transaction for the whole batch   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  { bills, skipped, stopped }                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Local, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use billbook_core::billing::{
    assemble_bill, generate_batch, previous_bill_names, BatchIssue, BillMeta,
};
use billbook_core::composer::TracingObserver;
use billbook_core::money::{Money, PositiveAmount};
use billbook_core::validation::validate_uuid;
use billbook_core::{Bill, CompositionResult, DateRange, NewBill};
use billbook_db::Database;

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::state::AppState;

// =============================================================================
// DTOs
// =============================================================================

/// Body of `POST /api/bills`.
///
/// With a `transactionId`, missing target, customer and date are taken from
/// the transaction.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRequest {
    pub target_cents: Option<i64>,
    pub customer_name: Option<String>,
    pub transaction_id: Option<String>,
    pub bill_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillResponse {
    pub bill: Bill,
    pub composition: CompositionResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchIssueView {
    pub transaction_id: String,
    pub code: ErrorCode,
    pub message: String,
}

impl From<BatchIssue> for BatchIssueView {
    fn from(issue: BatchIssue) -> Self {
        let error = ApiError::from(issue.error);
        BatchIssueView {
            transaction_id: issue.transaction_id,
            code: error.code,
            message: error.message,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBillsResponse {
    pub bills: Vec<Bill>,
    pub skipped: Vec<BatchIssueView>,
    /// The transaction the batch stopped at, if it ran out of stock.
    pub stopped: Option<BatchIssueView>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn lookback(db: &Database) -> ApiResult<HashSet<String>> {
    Ok(db
        .bills()
        .latest()
        .await?
        .map(|bill| previous_bill_names(&bill))
        .unwrap_or_default())
}

/// Composes one bill against current stock and stores it.
pub async fn create_bill(
    State(state): State<AppState>,
    Json(request): Json<CreateBillRequest>,
) -> ApiResult<(StatusCode, Json<CreateBillResponse>)> {
    let txn = match &request.transaction_id {
        Some(id) => Some(
            state
                .db
                .transactions()
                .get(id)
                .await?
                .ok_or_else(|| ApiError::not_found("Transaction", id))?,
        ),
        None => None,
    };

    let target_cents = request
        .target_cents
        .or_else(|| txn.as_ref().map(|t| t.amount_cents));
    let target = PositiveAmount::from_optional(target_cents.map(Money::from_cents))?;

    let catalog = state.db.stock().list().await?;
    let previous = lookback(&state.db).await?;

    let composition = {
        let mut rng = StdRng::from_entropy();
        state
            .composer
            .compose_observed(target, &catalog, &previous, &mut rng, &mut TracingObserver)?
    };

    let meta = BillMeta {
        customer_name: request
            .customer_name
            .or_else(|| txn.as_ref().and_then(|t| t.customer_name.clone())),
        transaction_id: request.transaction_id,
        bill_date: request
            .bill_date
            .or_else(|| txn.map(|t| t.txn_date))
            .unwrap_or_else(|| Local::now().date_naive()),
    };

    let bill = state.db.bills().create(&assemble_bill(&composition, meta)).await?;

    info!(
        bill_number = %bill.bill_number,
        target = %target,
        total = %bill.total(),
        items = bill.items.len(),
        "Bill composed and stored"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateBillResponse { bill, composition }),
    ))
}

/// Composes bills for every unbilled transaction and stores them together.
pub async fn generate_bills(
    State(state): State<AppState>,
) -> ApiResult<Json<GenerateBillsResponse>> {
    let transactions = state.db.transactions().list_unbilled().await?;
    let catalog = state.db.stock().list().await?;
    let previous = lookback(&state.db).await?;

    let outcome = {
        let mut rng = StdRng::from_entropy();
        generate_batch(&state.composer, &transactions, &catalog, previous, &mut rng)
    };

    let drafts: Vec<NewBill> = outcome.bills.into_iter().map(|g| g.bill).collect();
    let bills = state.db.bills().create_many(&drafts).await?;

    debug!(pending = transactions.len(), created = bills.len(), "Batch stored");

    Ok(Json(GenerateBillsResponse {
        bills,
        skipped: outcome.skipped.into_iter().map(BatchIssueView::from).collect(),
        stopped: outcome.stopped.map(BatchIssueView::from),
    }))
}

pub async fn list_bills(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> ApiResult<Json<Vec<Bill>>> {
    Ok(Json(state.db.bills().list(range).await?))
}

pub async fn get_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Bill>> {
    validate_uuid(&id)?;
    state
        .db
        .bills()
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Bill", &id))
}

/// Deletes a bill and puts its quantities back in stock.
pub async fn delete_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Bill>> {
    validate_uuid(&id)?;
    Ok(Json(state.db.bills().delete(&id).await?))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::test_support::{
        delete, get, post_json, post_text, seed_stock, send_json, test_app,
    };

    fn quantities(body: &Value) -> Vec<(i64, i64)> {
        body["bill"]["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|line| {
                (
                    line["stockId"].as_i64().unwrap(),
                    line["quantity"].as_i64().unwrap(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_create_bill_decrements_stock() {
        let (app, state) = test_app().await;
        seed_stock(&app).await;

        let (status, body) =
            send_json(&app, post_json("/api/bills", json!({ "targetCents": 30000 }))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["bill"]["billNumber"], "INV-000001");

        let items = body["bill"]["items"].as_array().unwrap();
        assert!((2..=7).contains(&items.len()));
        let total = body["bill"]["totalCents"].as_i64().unwrap();
        assert_eq!(total, body["composition"]["achievedTotalCents"].as_i64().unwrap());

        let catalog = state.db.stock().list().await.unwrap();
        for (stock_id, qty) in quantities(&body) {
            let item = catalog.iter().find(|i| i.id == stock_id).unwrap();
            assert_eq!(item.available_quantity, 10 - qty);
        }
    }

    #[tokio::test]
    async fn test_create_bill_rejects_zero_target() {
        let (app, state) = test_app().await;
        seed_stock(&app).await;

        let (status, body) =
            send_json(&app, post_json("/api/bills", json!({ "targetCents": 0 }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_TARGET");
        assert_eq!(state.db.bills().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_bill_rejects_oversized_target() {
        let (app, state) = test_app().await;
        seed_stock(&app).await;

        let (status, body) =
            send_json(&app, post_json("/api/bills", json!({ "targetCents": i64::MAX }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_TARGET");
        assert_eq!(state.db.bills().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_bill_requires_target() {
        let (app, _) = test_app().await;

        let (status, body) = send_json(&app, post_json("/api/bills", json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_TARGET");
    }

    #[tokio::test]
    async fn test_create_bill_single_item_catalog() {
        let (app, state) = test_app().await;
        send_json(&app, post_text("/api/stock/import", "Item,Price,Qty\nRice,80,10\n")).await;

        let (status, body) =
            send_json(&app, post_json("/api/bills", json!({ "targetCents": 30000 }))).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INSUFFICIENT_STOCK");
        assert_eq!(state.db.bills().count().await.unwrap(), 0);
        let rice = &state.db.stock().list().await.unwrap()[0];
        assert_eq!(rice.available_quantity, 10);
    }

    #[tokio::test]
    async fn test_delete_bill_restores_stock() {
        let (app, state) = test_app().await;
        seed_stock(&app).await;
        let before = state.db.stock().list().await.unwrap();

        let (_, body) =
            send_json(&app, post_json("/api/bills", json!({ "targetCents": 25000 }))).await;
        let id = body["bill"]["id"].as_str().unwrap().to_string();

        let (status, _) = send_json(&app, get(&format!("/api/bills/{id}"))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, deleted) = send_json(&app, delete(&format!("/api/bills/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["id"], id.as_str());

        let after = state.db.stock().list().await.unwrap();
        let on_hand = |items: &[billbook_core::StockItem]| -> Vec<(i64, i64)> {
            items.iter().map(|i| (i.id, i.available_quantity)).collect()
        };
        assert_eq!(on_hand(&after), on_hand(&before));

        let (status, body) = send_json(&app, get(&format!("/api/bills/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_delete_unknown_bill() {
        let (app, _) = test_app().await;

        let id = "550e8400-e29b-41d4-a716-446655440000";

        let (status, body) = send_json(&app, delete(&format!("/api/bills/{id}"))).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], format!("Bill not found: {id}"));
    }

    #[tokio::test]
    async fn test_malformed_bill_id() {
        let (app, _) = test_app().await;

        let (status, body) = send_json(&app, get("/api/bills/missing")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_bill_for_transaction_uses_its_details() {
        let (app, state) = test_app().await;
        seed_stock(&app).await;
        send_json(
            &app,
            post_text(
                "/api/transactions/import",
                "Date,Amount,Customer\n05/04/2024,300,Ravi Traders\n",
            ),
        )
        .await;
        let txn = state.db.transactions().list_unbilled().await.unwrap().remove(0);

        let (status, body) = send_json(
            &app,
            post_json("/api/bills", json!({ "transactionId": txn.id })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["bill"]["customerName"], "Ravi Traders");
        assert_eq!(body["bill"]["billDate"], "2024-04-05");
        assert_eq!(body["composition"]["targetCents"], 30000);

        // A transaction is billed once.
        let (status, body) = send_json(
            &app,
            post_json("/api/bills", json!({ "transactionId": txn.id })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_generate_bills_for_unbilled_transactions() {
        let (app, state) = test_app().await;
        seed_stock(&app).await;
        let statement = "Txn Date,Credit,Party\n\
                         01/04/2024,300,Ravi\n\
                         02/04/2024,250,\n\
                         03/04/2024,180,Meena\n";
        send_json(&app, post_text("/api/transactions/import", statement)).await;

        let (status, body) = send_json(&app, post_json("/api/bills/generate", json!({}))).await;

        assert_eq!(status, StatusCode::OK);
        let bills = body["bills"].as_array().unwrap();
        assert_eq!(bills.len(), 3);
        assert_eq!(bills[0]["billNumber"], "INV-000001");
        assert_eq!(bills[2]["billNumber"], "INV-000003");
        assert!(body["stopped"].is_null());

        assert!(state.db.transactions().list_unbilled().await.unwrap().is_empty());

        let sold: i64 = bills
            .iter()
            .flat_map(|b| b["items"].as_array().unwrap().iter())
            .map(|line| line["quantity"].as_i64().unwrap())
            .sum();
        let remaining: i64 = state
            .db
            .stock()
            .list()
            .await
            .unwrap()
            .iter()
            .map(|i| i.available_quantity)
            .sum();
        assert_eq!(remaining, 50 - sold);

        // Nothing left to bill.
        let (_, body) = send_json(&app, post_json("/api/bills/generate", json!({}))).await;
        assert!(body["bills"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_bills_by_date() {
        let (app, _) = test_app().await;
        seed_stock(&app).await;
        for (date, target) in [("2024-04-01", 20000), ("2024-04-10", 22000)] {
            let (status, _) = send_json(
                &app,
                post_json("/api/bills", json!({ "targetCents": target, "billDate": date })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, all) = send_json(&app, get("/api/bills")).await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (_, early) = send_json(&app, get("/api/bills?to=2024-04-05")).await;
        let early = early.as_array().unwrap();
        assert_eq!(early.len(), 1);
        assert_eq!(early[0]["billDate"], "2024-04-01");
    }
}
