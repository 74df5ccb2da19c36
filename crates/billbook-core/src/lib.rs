//! # billbook-core: Pure Business Logic for Billbook
//!
//! This crate holds the billing rules as pure functions: money math, the
//! approximate bill composer, stock ledger planning and reporting. It never
//! touches a database, a socket or the file system.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Billbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Browser client (static assets)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 apps/server (axum, per account)                 │   │
//! │  │    /api/bills, /api/stock, /api/transactions, /api/account     │   │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘   │
//! │                 │                              │                        │
//! │  ┌──────────────▼──────────────────┐  ┌────────▼───────────────────┐   │
//! │  │  ★ billbook-core (THIS CRATE) ★ │  │  billbook-docs             │   │
//! │  │                                 │  │  CSV import, HTML/CSV      │   │
//! │  │  money  composer  ledger        │  │  export                    │   │
//! │  │  types  billing   report        │  └────────────────────────────┘   │
//! │  │                                 │                                   │
//! │  │  NO I/O • INJECTED RANDOMNESS   │                                   │
//! │  └──────────────┬──────────────────┘                                   │
//! │                 │                                                       │
//! │  ┌──────────────▼──────────────────────────────────────────────────┐   │
//! │  │               billbook-db (SQLite via sqlx)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (StockItem, Bill, Transaction, etc.)
//! - [`money`] - Money type with integer arithmetic, PositiveAmount
//! - [`composer`] - Approximate bill composer
//! - [`ledger`] - Stock decrement/restore planning
//! - [`billing`] - Bill assembly and batch generation
//! - [`report`] - Bill summaries
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use billbook_core::money::{Money, PositiveAmount};
//!
//! let target = PositiveAmount::new(Money::from_units(300)).unwrap();
//! assert_eq!(target.get().cents(), 30_000);
//!
//! assert!(PositiveAmount::new(Money::zero()).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod composer;
pub mod error;
pub mod ledger;
pub mod money;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use composer::{ComposeOptions, Composer, CompositionResult, CompositionWarning};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, PositiveAmount};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Account used when none is configured.
pub const DEFAULT_ACCOUNT_ID: &str = "default";

/// Fewest lines a composed bill may have.
pub const MIN_BILL_ITEMS: usize = 2;

/// Most lines a composed bill may have.
pub const MAX_BILL_ITEMS: usize = 7;

/// Composer policy cap on units per line, independent of stock on hand.
pub const MAX_LINE_QUANTITY: i64 = 2;

/// How far above the target a trial may run (30.00).
pub const DEFAULT_TOLERANCE: Money = Money::from_units(30);

/// Trials per composition.
pub const DEFAULT_MAX_ATTEMPTS: usize = 200;

/// The exact-match adjustment never prices a line below this (1.00).
pub const MIN_UNIT_PRICE: Money = Money::from_units(1);

/// Largest price, target or transaction amount accepted (1,000,000,000.00).
///
/// Keeps `target + 2 × tolerance` and every line total well inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

/// Upper bound on a single item's stock on hand.
///
/// ## Business Reason
/// Catches unit mix-ups in imports (a price column read as quantity).
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000;
