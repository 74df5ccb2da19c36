//! # Stock Handlers
//!
//! ## Import Flow
//! ```text
//! POST /api/stock/import  (raw CSV body)
//!      │
//!      ▼
//! import_stock_csv ── header synonyms, bad rows → skipped
//!      │
//!      ▼
//! db.stock().upsert_many ── one transaction, matched by item name
//!      │
//!      ▼
//! { inserted, updated, skipped: [{ line, reason }] }
//! ```

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::info;

use billbook_core::StockItem;
use billbook_docs::{import_stock_csv, SkippedRow};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockImportResponse {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: Vec<SkippedRow>,
}

pub async fn list_stock(State(state): State<AppState>) -> ApiResult<Json<Vec<StockItem>>> {
    Ok(Json(state.db.stock().list().await?))
}

/// Upserts every parseable row of a stock sheet.
pub async fn import_stock(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<StockImportResponse>> {
    let report = import_stock_csv(body.as_bytes())?;
    let summary = state.db.stock().upsert_many(&report.records).await?;

    info!(
        inserted = summary.inserted,
        updated = summary.updated,
        skipped = report.skipped.len(),
        "Stock sheet imported"
    );

    Ok(Json(StockImportResponse {
        inserted: summary.inserted,
        updated: summary.updated,
        skipped: report.skipped,
    }))
}
