//! # billbook-db: Database Layer for Billbook
//!
//! SQLite persistence for one or more business accounts, via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Billbook Data Flow                               │
//! │                                                                         │
//! │  POST /api/bills                                                       │
//! │       │  composer runs in billbook-core (no I/O)                       │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   billbook-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ StockRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ BillRepo       │    │ 001_initial  │  │   │
//! │  │   │ account_id    │    │ TransactionRepo│    │              │  │   │
//! │  │   │               │    │ SettingsRepo   │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (BILLBOOK_DATABASE_PATH)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use billbook_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("billbook.db").account_id("shop-1")).await?;
//!
//! let catalog = db.stock().list().await?;
//! let previous = db.bills().latest().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::bill::BillRepository;
pub use repository::settings::SettingsRepository;
pub use repository::stock::{StockRepository, UpsertSummary};
pub use repository::transaction::TransactionRepository;
