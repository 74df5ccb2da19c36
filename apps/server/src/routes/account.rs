use axum::extract::State;
use axum::Json;

use billbook_core::AccountInfo;

use crate::state::AppState;

/// What the browser client needs to label its window and namespace its
/// local storage.
pub async fn account_info(State(state): State<AppState>) -> Json<AccountInfo> {
    let config = &state.config;
    Json(AccountInfo {
        account_id: config.account_id.clone(),
        account_name: config.account_name.clone(),
        port: config.port,
        storage_prefix: config.storage_prefix.clone(),
    })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::{get, send_json, test_app};

    #[tokio::test]
    async fn test_account_payload() {
        let (app, _) = test_app().await;

        let (status, body) = send_json(&app, get("/api/account")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "accountId": "default",
                "accountName": "Sharma General Store",
                "port": 3001,
                "storagePrefix": "billbook:default:",
            })
        );
    }
}
