//! # billbook-docs: Import and Export for Billbook
//!
//! Spreadsheet rows in, documents out. Nothing here touches the database:
//! callers persist the drafts and pass in the bills to render.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  stock.csv ─────────┐                                                   │
//! │                      ├──► import ──► ImportReport<NewStockItem>         │
//! │  statement.csv ─────┘              ImportReport<NewTransaction>        │
//! │                                                                         │
//! │  Vec<Bill> ──► export ──► HTML (tera, paged for print)                  │
//! │                       └─► CSV  (one row per bill line)                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`import`] - CSV readers with header synonyms
//! - [`export`] - HTML and CSV bill documents
//! - [`error`] - Import/export error types

pub mod error;
pub mod export;
pub mod import;

pub use error::{DocError, DocResult};
pub use export::{export_csv, export_csv_string, ExportOptions, HtmlExporter, Letterhead};
pub use import::{import_stock_csv, import_transactions_csv, ImportReport, SkippedRow};
