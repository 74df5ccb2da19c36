//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Handler -> Result<T, ApiError>                                         │
//! │       │                                                                 │
//! │       ├── CoreError::InvalidTarget ─────────► 400 INVALID_TARGET        │
//! │       ├── CoreError::InsufficientStock* ────► 409 INSUFFICIENT_STOCK    │
//! │       ├── CoreError::*NotFound / NotFound ──► 404 NOT_FOUND             │
//! │       ├── ValidationError ──────────────────► 400 VALIDATION_ERROR      │
//! │       ├── Duplicate / UniqueViolation ──────► 409 CONFLICT              │
//! │       ├── DocError (bad CSV) ───────────────► 400 IMPORT_ERROR          │
//! │       └── anything from sqlx ───────────────► 500 DATABASE_ERROR        │
//! │                                                                         │
//! │  Body: { "code": "NOT_FOUND", "message": "Bill not found: 1f3c..." }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Database failures are logged with their detail; the client only sees a
//! generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use billbook_core::{CoreError, ValidationError};
use billbook_db::DbError;
use billbook_docs::DocError;

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Bill target missing, zero or negative (400)
    InvalidTarget,

    /// Spreadsheet could not be read (400)
    ImportError,

    /// Not enough stock to compose or persist a bill (409)
    InsufficientStock,

    /// Value already exists (409)
    Conflict,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError | ErrorCode::InvalidTarget | ErrorCode::ImportError => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::InsufficientStock | ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Converts validation errors to API errors.
impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Duplicate { .. } => ApiError::new(ErrorCode::Conflict, err.to_string()),
            other => ApiError::validation(other.to_string()),
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidTarget { .. } => ApiError::new(ErrorCode::InvalidTarget, err.to_string()),
            CoreError::InsufficientStock { .. } | CoreError::InsufficientStockForItem { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::StockItemNotFound(id) => ApiError::not_found("Stock item", &id.to_string()),
            CoreError::BillNotFound(id) => ApiError::not_found("Bill", &id),
            CoreError::Validation(inner) => ApiError::from(inner),
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::Core(core) => ApiError::from(core),
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::QueryFailed(e) | DbError::TransactionFailed(e) | DbError::Internal(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Serialization(e) => {
                tracing::error!("Stored value could not be decoded: {}", e);
                ApiError::internal("Stored value could not be decoded")
            }
        }
    }
}

/// Converts import/export errors to API errors.
impl From<DocError> for ApiError {
    fn from(err: DocError) -> Self {
        match err {
            DocError::Csv(_) | DocError::MissingColumn { .. } => {
                ApiError::new(ErrorCode::ImportError, err.to_string())
            }
            DocError::InvalidOption(_) => ApiError::validation(err.to_string()),
            DocError::Template(_) | DocError::Io(_) => {
                tracing::error!("Document rendering failed: {}", err);
                ApiError::internal("Document rendering failed")
            }
        }
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
