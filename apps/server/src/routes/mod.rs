//! # Routes
//!
//! ```text
//! GET    /health                    database reachability
//! GET    /api/account               account id, name, port, storage prefix
//! GET    /api/stock                 catalog
//! POST   /api/stock/import          CSV body, upsert by name
//! GET    /api/bills                 ?from=&to=
//! POST   /api/bills                 compose + persist one bill
//! GET    /api/bills/{id}
//! DELETE /api/bills/{id}             restores stock
//! POST   /api/bills/generate        one bill per unbilled transaction
//! GET    /api/bills/export          ?format=html|csv&hideCustomerNames=..
//! GET    /api/transactions          ?from=&to=
//! POST   /api/transactions/import   CSV body
//! GET    /api/reports/summary       ?from=&to=
//! GET    /api/settings/{key}         stored JSON value
//! PUT    /api/settings/{key}
//! *                                 static client assets
//! ```

pub mod account;
pub mod bills;
pub mod export;
pub mod health;
pub mod reports;
pub mod settings;
pub mod stock;
pub mod transactions;

use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route("/health", get(health::health))
        .route("/api/account", get(account::account_info))
        .route("/api/stock", get(stock::list_stock))
        .route("/api/stock/import", post(stock::import_stock))
        .route("/api/bills", get(bills::list_bills).post(bills::create_bill))
        .route("/api/bills/generate", post(bills::generate_bills))
        .route("/api/bills/export", get(export::export_bills))
        .route("/api/bills/{id}", get(bills::get_bill).delete(bills::delete_bill))
        .route("/api/transactions", get(transactions::list_transactions))
        .route("/api/transactions/import", post(transactions::import_transactions))
        .route("/api/reports/summary", get(reports::summary))
        .route(
            "/api/settings/{key}",
            get(settings::get_setting).put(settings::put_setting),
        )
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
