//! # Application State
//!
//! Shared by every handler through axum's `State` extractor.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AppState (Clone, cheap)                                                │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────────┐ │
//! │  │  Database    │  │  Composer    │  │ ServerConfig │  │HtmlExporter │ │
//! │  │  (pool,      │  │  (options    │  │ (Arc, read-  │  │ (Arc, tera  │ │
//! │  │   account)   │  │   from env)  │  │  only)       │  │  compiled)  │ │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └─────────────┘ │
//! │                                                                         │
//! │  Nothing here is behind a lock: the pool is internally synchronized    │
//! │  and the rest is read-only after startup.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use billbook_core::Composer;
use billbook_db::Database;
use billbook_docs::{DocResult, HtmlExporter};

use crate::config::ServerConfig;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub composer: Composer,
    pub config: Arc<ServerConfig>,
    pub exporter: Arc<HtmlExporter>,
}

impl AppState {
    /// Builds state for an opened database. Fails only if the embedded
    /// export template does not compile.
    pub fn new(db: Database, config: ServerConfig) -> DocResult<Self> {
        Ok(AppState {
            db,
            composer: Composer::new(config.compose_options()),
            config: Arc::new(config),
            exporter: Arc::new(HtmlExporter::new()?),
        })
    }
}
