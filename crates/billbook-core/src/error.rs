//! # Error Types
//!
//! Domain-specific error types for billbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  billbook-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule failures                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  billbook-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  server errors (apps/server)                                           │
//! │  └── ApiError         - What the browser sees (serialized)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Browser      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Soft conditions (a clamped price adjustment) are NOT errors; they travel
//! inside the composition result as [`crate::composer::CompositionWarning`].

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// None of these are retried: composing again against the same catalog
/// cannot change the outcome.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bill target is absent, zero, or negative.
    ///
    /// Raised by [`crate::money::PositiveAmount`] before any search begins.
    #[error("Invalid target: {reason}")]
    InvalidTarget { reason: String },

    /// Fewer than two sellable catalog entries exist.
    ///
    /// ## User Workflow
    /// ```text
    /// Generate bill (target: 300.00)
    ///      │
    ///      ▼
    /// Catalog has 1 item with stock
    ///      │
    ///      ▼
    /// InsufficientStock { available_items: 1 }
    ///      │
    ///      ▼
    /// UI shows: "Add stock before generating bills"
    /// ```
    #[error("Insufficient stock: {available_items} sellable item(s), at least {required} required")]
    InsufficientStock {
        available_items: usize,
        required: usize,
    },

    /// A specific line asks for more than the catalog holds.
    ///
    /// ## When This Occurs
    /// - Confirming a bill after another bill consumed the same stock
    /// - Editing a bill to a quantity above what remains
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStockForItem {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Stock item cannot be found.
    #[error("Stock item not found: {0}")]
    StockItemNotFound(i64),

    /// Bill cannot be found.
    #[error("Bill not found: {0}")]
    BillNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate item name).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
