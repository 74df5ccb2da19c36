//! # billbook-server
//!
//! HTTP surface for one Billbook account.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POST /api/bills { targetCents: 30000 }                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  routes::bills::create_bill                                            │
//! │       │  catalog   ◄── db.stock().list()                               │
//! │       │  exclusion ◄── db.bills().latest() → previous_bill_names       │
//! │       ▼                                                                 │
//! │  Composer::compose (billbook-core, synchronous)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.bills().create ── one SQLite transaction:                          │
//! │       │                 conditional stock decrement per line            │
//! │       │                 next bill number                                │
//! │       │                 bill + lines                                    │
//! │       ▼                                                                 │
//! │  201 { bill, composition }   or   ApiError { code, message }           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - `BILLBOOK_*` environment configuration
//! - [`state`] - Shared handler state
//! - [`routes`] - Router and handlers
//! - [`error`] - `ApiError` and status mapping

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::router;
pub use state::AppState;

#[cfg(test)]
pub(crate) mod test_support;
