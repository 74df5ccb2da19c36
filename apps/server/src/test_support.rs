//! Helpers for router tests.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use billbook_db::{Database, DbConfig};

use crate::config::ServerConfig;
use crate::routes::router;
use crate::state::AppState;

pub const GROCERY_CSV: &str = "Item Name,Price,Available Quantity,HSN\n\
    Rice,80,10,1006\n\
    Oil,120,10,1507\n\
    Sugar,60,10,1701\n\
    Dal,95,10,0713\n\
    Tea,140,10,0902\n";

pub async fn test_app() -> (Router, AppState) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let config = ServerConfig {
        account_name: "Sharma General Store".to_string(),
        port: 3001,
        ..ServerConfig::default()
    };
    let state = AppState::new(db, config).unwrap();
    (router(state.clone()), state)
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

pub async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_text(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    json_request("POST", uri, body)
}

pub fn put_json(uri: &str, body: Value) -> Request<Body> {
    json_request("PUT", uri, body)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Imports the grocery catalog through the API.
pub async fn seed_stock(app: &Router) {
    let (status, _) = send_json(app, post_text("/api/stock/import", GROCERY_CSV)).await;
    assert_eq!(status, StatusCode::OK);
}
