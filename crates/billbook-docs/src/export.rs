//! # Document Export
//!
//! Turns persisted bills into printable HTML or a spreadsheet.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  &[Bill] + ExportOptions + Letterhead                                   │
//! │       │                                                                 │
//! │       ├──► HtmlExporter::render_html                                    │
//! │       │        bills → BillView (strings only, names masked)            │
//! │       │        chunk by bills_per_page → PageView                       │
//! │       │        tera "bills.html" → page-break-after between pages       │
//! │       │                                                                 │
//! │       └──► export_csv                                                   │
//! │                one row per bill line, bill total repeated per row       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Views are built in Rust so the template needs no arithmetic and no
//! built-in filters beyond the registered `money` filter.

use std::collections::HashMap;
use std::io::Write;

use csv::{Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use tracing::{debug, info};
use ts_rs::TS;

use billbook_core::money::Money;
use billbook_core::Bill;

use crate::error::{DocError, DocResult};

const BILLS_TEMPLATE: &str = "bills.html";

/// Shown in place of a customer name when names are hidden or absent.
pub const WALK_IN_CUSTOMER: &str = "Walk-in Customer";

// =============================================================================
// Options
// =============================================================================

/// Export switches chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    /// Replace customer names with a generic label.
    pub hide_customer_names: bool,

    /// Print the business tax id and the per-line HSN code.
    pub include_tax_id: bool,

    /// Bills laid out on one printed page. Range: 1..=10
    pub bills_per_page: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            hide_customer_names: false,
            include_tax_id: true,
            bills_per_page: 1,
        }
    }
}

impl ExportOptions {
    pub const MAX_BILLS_PER_PAGE: usize = 10;

    pub fn validate(&self) -> DocResult<()> {
        if self.bills_per_page == 0 || self.bills_per_page > Self::MAX_BILLS_PER_PAGE {
            return Err(DocError::InvalidOption(format!(
                "bills per page must be between 1 and {}, got {}",
                Self::MAX_BILLS_PER_PAGE,
                self.bills_per_page
            )));
        }
        Ok(())
    }
}

/// Business details printed at the top of every bill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Letterhead {
    pub business_name: String,
    pub address: Option<String>,
    pub tax_id: Option<String>,
}

// =============================================================================
// Template Views
// =============================================================================

#[derive(Debug, Serialize)]
struct LineView {
    line_no: usize,
    name: String,
    hsn_code: String,
    quantity: i64,
    unit_price_cents: i64,
    line_total_cents: i64,
}

#[derive(Debug, Serialize)]
struct BillView {
    bill_number: String,
    bill_date: String,
    customer: String,
    lines: Vec<LineView>,
    total_cents: i64,
}

#[derive(Debug, Serialize)]
struct PageView {
    bills: Vec<BillView>,
}

fn display_customer(bill: &Bill, options: &ExportOptions) -> String {
    if options.hide_customer_names {
        return WALK_IN_CUSTOMER.to_string();
    }
    bill.customer_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(WALK_IN_CUSTOMER)
        .to_string()
}

fn bill_view(bill: &Bill, options: &ExportOptions) -> BillView {
    BillView {
        bill_number: bill.bill_number.clone(),
        bill_date: bill.bill_date.format("%d/%m/%Y").to_string(),
        customer: display_customer(bill, options),
        lines: bill
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| LineView {
                line_no: index + 1,
                name: item.name.clone(),
                hsn_code: item.hsn_code.clone().unwrap_or_default(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
                line_total_cents: item.line_total().cents(),
            })
            .collect(),
        total_cents: bill.total_cents,
    }
}

// =============================================================================
// HTML Exporter
// =============================================================================

/// Renders bills with the embedded `bills.html` template.
#[derive(Debug, Clone)]
pub struct HtmlExporter {
    tera: Tera,
}

impl HtmlExporter {
    /// Loads the embedded template.
    pub fn new() -> DocResult<Self> {
        let mut tera = Tera::default();
        tera.register_filter("money", money_filter);
        tera.add_raw_template(BILLS_TEMPLATE, include_str!("../templates/bills.html"))?;
        Ok(HtmlExporter { tera })
    }

    /// Renders a printable HTML document.
    ///
    /// An empty slice renders a document with a "no bills" notice rather
    /// than failing.
    pub fn render_html(
        &self,
        bills: &[Bill],
        options: &ExportOptions,
        letterhead: &Letterhead,
    ) -> DocResult<String> {
        options.validate()?;

        let views: Vec<BillView> = bills.iter().map(|b| bill_view(b, options)).collect();
        let mut pages = Vec::new();
        let mut views = views.into_iter().peekable();
        while views.peek().is_some() {
            pages.push(PageView {
                bills: views.by_ref().take(options.bills_per_page).collect(),
            });
        }

        debug!(bills = bills.len(), pages = pages.len(), "Rendering bill document");

        let mut context = Context::new();
        context.insert("pages", &pages);
        context.insert("letterhead", letterhead);
        context.insert("show_tax_id", &options.include_tax_id);
        context.insert("bill_count", &bills.len());

        let html = self.tera.render(BILLS_TEMPLATE, &context)?;
        info!(bills = bills.len(), bytes = html.len(), "Bill document rendered");
        Ok(html)
    }
}

/// `{{ cents | money }}` → `"1250.50"`.
fn money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let cents = value
        .as_i64()
        .ok_or_else(|| tera::Error::msg("money filter expects an integer amount in cents"))?;
    Ok(tera::Value::String(Money::from_cents(cents).to_string()))
}

// =============================================================================
// CSV Export
// =============================================================================

/// Writes one row per bill line.
///
/// Columns: Bill Number, Date, Customer, Item, HSN, Quantity, Unit Price,
/// Line Total, Bill Total. `Customer` is left out when names are hidden and
/// `HSN` when tax ids are off.
pub fn export_csv<W: Write>(bills: &[Bill], options: &ExportOptions, out: W) -> DocResult<()> {
    options.validate()?;

    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out);

    let mut header = vec!["Bill Number", "Date"];
    if !options.hide_customer_names {
        header.push("Customer");
    }
    header.push("Item");
    if options.include_tax_id {
        header.push("HSN");
    }
    header.extend(["Quantity", "Unit Price", "Line Total", "Bill Total"]);
    writer.write_record(&header)?;

    let mut rows = 0usize;
    for bill in bills {
        let date = bill.bill_date.format("%Y-%m-%d").to_string();
        let customer = display_customer(bill, options);
        let bill_total = bill.total().to_string();

        for item in &bill.items {
            let mut row: Vec<String> = vec![bill.bill_number.clone(), date.clone()];
            if !options.hide_customer_names {
                row.push(customer.clone());
            }
            row.push(item.name.clone());
            if options.include_tax_id {
                row.push(item.hsn_code.clone().unwrap_or_default());
            }
            row.push(item.quantity.to_string());
            row.push(item.unit_price().to_string());
            row.push(item.line_total().to_string());
            row.push(bill_total.clone());
            writer.write_record(&row)?;
            rows += 1;
        }
    }

    writer.flush()?;
    debug!(bills = bills.len(), rows, "Bill spreadsheet written");
    Ok(())
}

/// [`export_csv`] into a `String`.
pub fn export_csv_string(bills: &[Bill], options: &ExportOptions) -> DocResult<String> {
    let mut buffer = Vec::new();
    export_csv(bills, options, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| DocError::Template(e.to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use billbook_core::BillLineItem;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn line(stock_id: i64, name: &str, price: i64, qty: i64) -> BillLineItem {
        BillLineItem {
            stock_id,
            name: name.to_string(),
            hsn_code: Some(format!("10{stock_id:02}")),
            unit_price_cents: price,
            quantity: qty,
        }
    }

    fn bill(number: u32, customer: Option<&str>) -> Bill {
        let items = vec![line(1, "Rice", 8000, 2), line(2, "Oil", 12000, 1)];
        let total_cents = items.iter().map(|i| i.unit_price_cents * i.quantity).sum();
        Bill {
            id: format!("bill-{number}"),
            account_id: "default".to_string(),
            bill_number: format!("INV-{number:06}"),
            customer_name: customer.map(str::to_string),
            transaction_id: None,
            bill_date: NaiveDate::from_ymd_opt(2024, 4, number).unwrap(),
            items,
            total_cents,
            created_at: Utc.with_ymd_and_hms(2024, 4, number, 10, 0, 0).unwrap(),
        }
    }

    fn letterhead() -> Letterhead {
        Letterhead {
            business_name: "Sharma General Store".to_string(),
            address: Some("12 Market Road".to_string()),
            tax_id: Some("27ABCDE1234F1Z5".to_string()),
        }
    }

    #[test]
    fn test_html_contains_bill_details() {
        let exporter = HtmlExporter::new().unwrap();
        let html = exporter
            .render_html(&[bill(1, Some("Ravi"))], &ExportOptions::default(), &letterhead())
            .unwrap();

        assert!(html.contains("Sharma General Store"));
        assert!(html.contains("INV-000001"));
        assert!(html.contains("Ravi"));
        assert!(html.contains("280.00"));
        assert!(html.contains("27ABCDE1234F1Z5"));
        assert!(html.contains("1001"));
    }

    #[test]
    fn test_html_hides_customer_names() {
        let exporter = HtmlExporter::new().unwrap();
        let options = ExportOptions {
            hide_customer_names: true,
            ..ExportOptions::default()
        };
        let html = exporter
            .render_html(&[bill(1, Some("Ravi Traders"))], &options, &letterhead())
            .unwrap();

        assert!(!html.contains("Ravi Traders"));
        assert!(html.contains(WALK_IN_CUSTOMER));
    }

    #[test]
    fn test_html_omits_tax_id_when_disabled() {
        let exporter = HtmlExporter::new().unwrap();
        let options = ExportOptions {
            include_tax_id: false,
            ..ExportOptions::default()
        };
        let html = exporter
            .render_html(&[bill(1, None)], &options, &letterhead())
            .unwrap();

        assert!(!html.contains("27ABCDE1234F1Z5"));
        assert!(!html.contains("HSN"));
    }

    #[test]
    fn test_html_page_breaks_between_pages() {
        let exporter = HtmlExporter::new().unwrap();
        let bills: Vec<Bill> = (1..=5).map(|n| bill(n, None)).collect();
        let options = ExportOptions {
            bills_per_page: 2,
            ..ExportOptions::default()
        };
        let html = exporter.render_html(&bills, &options, &letterhead()).unwrap();

        // 3 pages, breaks after the first two only.
        assert_eq!(html.matches("class=\"page\"").count(), 3);
        assert_eq!(html.matches("page-break-after: always").count(), 2);
    }

    #[test]
    fn test_html_escapes_customer_name() {
        let exporter = HtmlExporter::new().unwrap();
        let html = exporter
            .render_html(&[bill(1, Some("<b>Ravi</b>"))], &ExportOptions::default(), &letterhead())
            .unwrap();

        assert!(!html.contains("<b>Ravi</b>"));
        assert!(html.contains("&lt;b&gt;Ravi"));
    }

    #[test]
    fn test_html_empty_bills() {
        let exporter = HtmlExporter::new().unwrap();
        let html = exporter
            .render_html(&[], &ExportOptions::default(), &letterhead())
            .unwrap();
        assert!(html.contains("No bills"));
    }

    #[test]
    fn test_invalid_bills_per_page() {
        let options = ExportOptions {
            bills_per_page: 0,
            ..ExportOptions::default()
        };
        assert!(matches!(options.validate(), Err(DocError::InvalidOption(_))));

        let options = ExportOptions {
            bills_per_page: 11,
            ..ExportOptions::default()
        };
        assert!(export_csv_string(&[], &options).is_err());
    }

    #[test]
    fn test_csv_export_rows() {
        let csv = export_csv_string(&[bill(1, Some("Ravi")), bill(2, None)], &ExportOptions::default())
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "Bill Number,Date,Customer,Item,HSN,Quantity,Unit Price,Line Total,Bill Total"
        );
        assert_eq!(lines[1], "INV-000001,2024-04-01,Ravi,Rice,1001,2,80.00,160.00,280.00");
        assert_eq!(lines.len(), 5);
        assert!(lines[3].contains(WALK_IN_CUSTOMER));
    }

    #[test]
    fn test_csv_export_hides_columns() {
        let options = ExportOptions {
            hide_customer_names: true,
            include_tax_id: false,
            bills_per_page: 1,
        };
        let csv = export_csv_string(&[bill(1, Some("Ravi"))], &options).unwrap();

        assert!(csv.starts_with("Bill Number,Date,Item,Quantity,Unit Price,Line Total,Bill Total\n"));
        assert!(!csv.contains("Ravi"));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: ExportOptions = serde_json::from_str(r#"{"hideCustomerNames":true}"#).unwrap();
        assert!(options.hide_customer_names);
        assert!(options.include_tax_id);
        assert_eq!(options.bills_per_page, 1);
    }
}
