//! # Validation Module
//!
//! Input validation utilities for Billbook.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Import / HTTP handler                                        │
//! │  ├── Header matching, deserialization                                  │
//! │  └── Rows missing required fields are dropped                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE: Business rule validation                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE (account_id, name)                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{NewStockItem, NewTransaction};
use crate::{MAX_AMOUNT_CENTS, MAX_STOCK_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a stock item name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use billbook_core::validation::validate_item_name;
///
/// assert!(validate_item_name("Sunflower Oil 1L").is_ok());
/// assert!(validate_item_name("   ").is_err());
/// ```
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an optional customer name (at most 120 characters).
pub fn validate_customer_name(name: Option<&str>) -> ValidationResult<()> {
    if let Some(name) = name {
        if name.trim().chars().count() > 120 {
            return Err(ValidationError::TooLong {
                field: "customer name".to_string(),
                max: 120,
            });
        }
    }
    Ok(())
}

/// Validates an account identifier.
///
/// Account ids namespace storage, so they are restricted to characters that
/// are safe in file names and storage keys.
pub fn validate_account_id(id: &str) -> ValidationResult<()> {
    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "account id".to_string(),
        });
    }

    if id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "account id".to_string(),
            max: 64,
        });
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "account id".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price in minor units.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
/// - Must not exceed MAX_AMOUNT_CENTS
///
/// ## Example
/// ```rust
/// use billbook_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(8000).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_AMOUNT_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates an on-hand stock quantity.
///
/// ## Rules
/// - Must be non-negative
/// - Must not exceed MAX_STOCK_QUANTITY
pub fn validate_available_quantity(qty: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "available quantity".to_string(),
            min: 0,
            max: MAX_STOCK_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a transaction amount in minor units (must be positive).
pub fn validate_amount_cents(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 1,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates every field of a stock item draft.
pub fn validate_new_stock_item(item: &NewStockItem) -> ValidationResult<()> {
    validate_item_name(&item.name)?;
    validate_price_cents(item.unit_price_cents)?;
    validate_available_quantity(item.available_quantity)?;
    Ok(())
}

/// Validates every field of a transaction draft.
pub fn validate_new_transaction(txn: &NewTransaction) -> ValidationResult<()> {
    validate_amount_cents(txn.amount_cents)?;
    validate_customer_name(txn.customer_name.as_deref())?;
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use billbook_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_item_name() {
        assert!(validate_item_name("Basmati Rice 5kg").is_ok());
        assert!(validate_item_name("").is_err());
        assert!(validate_item_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_account_id() {
        assert!(validate_account_id("shop-1").is_ok());
        assert!(validate_account_id("").is_err());
        assert!(validate_account_id("../etc").is_err());
        assert!(validate_account_id(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_available_quantity() {
        assert!(validate_available_quantity(0).is_ok());
        assert!(validate_available_quantity(10).is_ok());
        assert!(validate_available_quantity(-1).is_err());
        assert!(validate_available_quantity(MAX_STOCK_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_amount_bounds() {
        assert!(validate_price_cents(MAX_AMOUNT_CENTS).is_ok());
        assert!(validate_price_cents(MAX_AMOUNT_CENTS + 1).is_err());
        assert!(validate_price_cents(i64::MAX).is_err());
        assert!(validate_amount_cents(1).is_ok());
        assert!(validate_amount_cents(MAX_AMOUNT_CENTS + 1).is_err());
    }

    #[test]
    fn test_validate_new_stock_item() {
        let ok = NewStockItem {
            name: "Sugar".to_string(),
            hsn_code: None,
            unit_price_cents: 6000,
            available_quantity: 10,
        };
        assert!(validate_new_stock_item(&ok).is_ok());

        let bad = NewStockItem {
            unit_price_cents: -1,
            ..ok
        };
        assert!(validate_new_stock_item(&bad).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
