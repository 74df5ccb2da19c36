//! # Repository Module
//!
//! Database repository implementations for Billbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.bills().create(&draft)                                     │
//! │       ▼                                                                 │
//! │  BillRepository ──────────┐                                            │
//! │  ├── create / create_many │ shares transaction helpers with            │
//! │  ├── get / latest / list  │ StockRepository (take_stock/return_stock)  │
//! │  └── delete               │                                            │
//! │       │                   ▼                                            │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database (every row scoped by account_id)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`StockRepository`](stock::StockRepository) - Catalog CRUD and bulk upsert
//! - [`BillRepository`](bill::BillRepository) - Bills with atomic stock movement
//! - [`TransactionRepository`](transaction::TransactionRepository) - Imported payments
//! - [`SettingsRepository`](settings::SettingsRepository) - JSON key/value store

pub mod bill;
pub mod settings;
pub mod stock;
pub mod transaction;
