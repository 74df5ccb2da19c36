//! # Bill Export
//!
//! ```text
//! GET /api/bills/export?format=csv&hideCustomerNames=true&from=2024-04-01
//!      │
//!      ├── options: query params, else stored `export_options`, else defaults
//!      ├── bills:   db.bills().list(from..to)
//!      │
//!      ├── html ──► HtmlExporter + letterhead ──► text/html
//!      └── csv  ──► export_csv_string         ──► text/csv attachment
//! ```

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use billbook_core::DateRange;
use billbook_docs::{export_csv_string, ExportOptions, Letterhead};

use crate::config::ServerConfig;
use crate::error::ApiResult;
use crate::routes::settings::{EXPORT_OPTIONS_KEY, LETTERHEAD_KEY};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Html,
    Csv,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    pub format: Option<ExportFormat>,
    pub hide_customer_names: Option<bool>,
    pub include_tax_id: Option<bool>,
    pub bills_per_page: Option<usize>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ExportQuery {
    fn options(&self, stored: ExportOptions) -> ExportOptions {
        ExportOptions {
            hide_customer_names: self.hide_customer_names.unwrap_or(stored.hide_customer_names),
            include_tax_id: self.include_tax_id.unwrap_or(stored.include_tax_id),
            bills_per_page: self.bills_per_page.unwrap_or(stored.bills_per_page),
        }
    }
}

fn default_letterhead(config: &ServerConfig) -> Letterhead {
    Letterhead {
        business_name: config.account_name.clone(),
        address: config.business_address.clone(),
        tax_id: config.tax_id.clone(),
    }
}

pub async fn export_bills(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let settings = state.db.settings();
    let stored = settings
        .load::<ExportOptions>(EXPORT_OPTIONS_KEY)
        .await?
        .unwrap_or_default();
    let options = query.options(stored);
    options.validate()?;

    let range = DateRange {
        from: query.from,
        to: query.to,
    };
    let bills = state.db.bills().list(range).await?;
    let format = query.format.unwrap_or_default();

    info!(?format, bills = bills.len(), "Exporting bills");

    match format {
        ExportFormat::Html => {
            let letterhead = match settings.load::<Letterhead>(LETTERHEAD_KEY).await? {
                Some(letterhead) => letterhead,
                None => default_letterhead(&state.config),
            };
            let html = state.exporter.render_html(&bills, &options, &letterhead)?;
            Ok(Html(html).into_response())
        }
        ExportFormat::Csv => {
            let csv = export_csv_string(&bills, &options)?;
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                    (header::CONTENT_DISPOSITION, "attachment; filename=\"bills.csv\""),
                ],
                csv,
            )
                .into_response())
        }
    }
}
