//! Key/value store for the browser client's per-account data.
//!
//! Two keys are also read by the server: `export_options` supplies defaults
//! for `/api/bills/export`, `letterhead` the business block printed on bills.
//! Both are type-checked on write.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use tracing::debug;

use billbook_docs::{ExportOptions, Letterhead};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const EXPORT_OPTIONS_KEY: &str = "export_options";
pub const LETTERHEAD_KEY: &str = "letterhead";

const MAX_KEY_LEN: usize = 64;

fn validate_key(key: &str) -> ApiResult<()> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "setting key must be 1-{MAX_KEY_LEN} letters, digits, '_', '-' or '.'"
        )))
    }
}

/// Rejects values the server could not read back for its own keys.
fn check_known_value(key: &str, value: &Value) -> ApiResult<()> {
    match key {
        EXPORT_OPTIONS_KEY => {
            let options: ExportOptions = serde_json::from_value(value.clone())
                .map_err(|e| ApiError::validation(format!("invalid export options: {e}")))?;
            options.validate()?;
        }
        LETTERHEAD_KEY => {
            serde_json::from_value::<Letterhead>(value.clone())
                .map_err(|e| ApiError::validation(format!("invalid letterhead: {e}")))?;
        }
        _ => {}
    }
    Ok(())
}

pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Value>> {
    validate_key(&key)?;
    state
        .db
        .settings()
        .load_json(&key)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Setting", &key))
}

pub async fn put_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> ApiResult<StatusCode> {
    validate_key(&key)?;
    check_known_value(&key, &value)?;
    state.db.settings().save_json(&key, &value).await?;
    debug!(%key, "Setting saved");
    Ok(StatusCode::NO_CONTENT)
}
