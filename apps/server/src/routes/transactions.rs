use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use billbook_core::{DateRange, Transaction};
use billbook_docs::{import_transactions_csv, SkippedRow};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionImportResponse {
    pub imported: Vec<Transaction>,
    pub skipped: Vec<SkippedRow>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> ApiResult<Json<Vec<Transaction>>> {
    Ok(Json(state.db.transactions().list(range).await?))
}

/// Stores every parseable row of a payment statement as unbilled.
pub async fn import_transactions(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<TransactionImportResponse>> {
    let report = import_transactions_csv(body.as_bytes())?;
    let imported = state.db.transactions().insert_many(&report.records).await?;

    info!(
        imported = imported.len(),
        skipped = report.skipped.len(),
        "Statement imported"
    );

    Ok(Json(TransactionImportResponse {
        imported,
        skipped: report.skipped,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::test_support::{get, post_text, send_json, test_app};

    #[tokio::test]
    async fn test_import_and_list() {
        let (app, _) = test_app().await;
        let statement = "Transaction Date,Amount,Customer Name,Narration\n\
                         2024-04-01,450.00,Ravi,UPI/123\n\
                         2024-04-02,-20,Bank charge,\n\
                         2024-04-03,120,,\n";

        let (status, body) = send_json(&app, post_text("/api/transactions/import", statement)).await;

        assert_eq!(status, StatusCode::OK);
        let imported = body["imported"].as_array().unwrap();
        assert_eq!(imported.len(), 2);
        assert_eq!(imported[0]["amountCents"], 45000);
        assert_eq!(imported[0]["reference"], "UPI/123");
        assert_eq!(imported[0]["billed"], false);
        assert_eq!(body["skipped"][0]["line"], 3);

        let (_, listed) = send_json(&app, get("/api/transactions?from=2024-04-02")).await;
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["txnDate"], "2024-04-03");
    }

    #[tokio::test]
    async fn test_import_without_date_column() {
        let (app, _) = test_app().await;

        let (status, body) =
            send_json(&app, post_text("/api/transactions/import", "Amount\n100\n")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "IMPORT_ERROR");
    }
}
