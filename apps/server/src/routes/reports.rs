use axum::extract::{Query, State};
use axum::Json;

use billbook_core::report::{summarize_bills, BillReport};
use billbook_core::DateRange;

use crate::error::ApiResult;
use crate::state::AppState;

/// Totals and per-item sales for bills dated in the range.
pub async fn summary(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> ApiResult<Json<BillReport>> {
    let bills = state.db.bills().list(range).await?;
    Ok(Json(summarize_bills(&bills, range)))
}
