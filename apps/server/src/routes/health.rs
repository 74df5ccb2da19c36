use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub account_id: String,
    pub database: &'static str,
    pub checked_at: String,
}

/// `ready` with 200 when the database answers, `degraded` with 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let ready = state.db.health_check().await;

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        account_id: state.config.account_id.clone(),
        database: if ready { "ready" } else { "unreachable" },
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get, send_json, test_app};

    #[tokio::test]
    async fn test_health_ready() {
        let (app, _) = test_app().await;

        let (status, body) = send_json(&app, get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
        assert_eq!(body["accountId"], "default");
    }

    #[tokio::test]
    async fn test_health_degraded_after_close() {
        let (_, state) = test_app().await;
        state.db.close().await;

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
    }
}
