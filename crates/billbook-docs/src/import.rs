//! # Tabular Import
//!
//! Reads stock catalogs and transaction statements from CSV whose headers
//! vary by where the sheet came from.
//!
//! ## Header Matching
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "  Item  NAME " ──► normalize ──► "item name" ──► synonym table       │
//! │                                                                         │
//! │  normalize: lowercase, '_' and '-' become spaces, runs of spaces        │
//! │             collapse, ends trimmed                                      │
//! │                                                                         │
//! │  Per field, synonyms are tried in order and the first matching column   │
//! │  wins, so "Item Name" beats "Name" when a sheet has both.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows with a missing or unparseable required cell are dropped and listed in
//! [`ImportReport::skipped`]; the rest of the file still imports.

use std::io::Read;

use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use tracing::{debug, info};
use ts_rs::TS;

use billbook_core::money::Money;
use billbook_core::validation::{validate_new_stock_item, validate_new_transaction};
use billbook_core::{NewStockItem, NewTransaction};

use crate::error::{DocError, DocResult};

// =============================================================================
// Header Synonyms
// =============================================================================

pub const STOCK_NAME_HEADERS: &[&str] = &[
    "Item Name",
    "Name",
    "Product",
    "Item",
    "Product Name",
    "Description",
];
pub const STOCK_PRICE_HEADERS: &[&str] = &["Price", "Cost", "Rate", "Unit Price", "MRP", "Amount"];
pub const STOCK_QUANTITY_HEADERS: &[&str] =
    &["Available Quantity", "Stock", "Qty", "Quantity", "Available"];
pub const STOCK_HSN_HEADERS: &[&str] = &["HSN", "HSN Code"];

pub const TXN_DATE_HEADERS: &[&str] = &["Date", "Transaction Date", "Txn Date"];
pub const TXN_AMOUNT_HEADERS: &[&str] = &["Amount", "Total", "Value", "Credit"];
pub const TXN_CUSTOMER_HEADERS: &[&str] = &["Customer", "Customer Name", "Name", "Party"];
pub const TXN_REFERENCE_HEADERS: &[&str] = &["Reference", "Ref", "UTR", "Narration"];

/// Day-first formats are tried before month-first ones.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d %b %Y", "%d-%b-%Y", "%d-%b-%y",
    "%d/%m/%y", "%m/%d/%Y",
];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M"];

fn normalize_header(header: &str) -> String {
    header
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Column index for the first synonym present in `headers`.
fn find_column(headers: &[String], synonyms: &[&str]) -> Option<usize> {
    synonyms.iter().find_map(|synonym| {
        let wanted = normalize_header(synonym);
        headers.iter().position(|h| *h == wanted)
    })
}

fn require_column(headers: &[String], field: &str, synonyms: &[&str]) -> DocResult<usize> {
    find_column(headers, synonyms).ok_or_else(|| DocError::MissingColumn {
        field: field.to_string(),
        accepted: synonyms.join(", "),
    })
}

// =============================================================================
// Report
// =============================================================================

/// A row that did not make it into the import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    /// 1-based line in the file, header included.
    pub line: u64,
    pub reason: String,
}

/// Parsed drafts plus what was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkippedRow>,
}

impl<T> ImportReport<T> {
    fn new() -> Self {
        ImportReport {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Data rows seen, kept or not.
    pub fn total_rows(&self) -> usize {
        self.records.len() + self.skipped.len()
    }
}

fn cell<'r>(record: &'r StringRecord, column: Option<usize>) -> Option<&'r str> {
    column
        .and_then(|index| record.get(index))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn line_of(record: &StringRecord, fallback: usize) -> u64 {
    record
        .position()
        .map(|p| p.line())
        .unwrap_or(fallback as u64 + 2)
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input)
}

// =============================================================================
// Stock Import
// =============================================================================

/// Parses a stock sheet into drafts.
///
/// `name` and `price` columns are required. A missing quantity column or a
/// blank quantity cell means 0 on hand.
///
/// ## Example
/// ```rust
/// use billbook_docs::import::import_stock_csv;
///
/// let csv = "Product,MRP,Qty\nRice,80,10\n,50,1\n";
/// let report = import_stock_csv(csv.as_bytes()).unwrap();
///
/// assert_eq!(report.records.len(), 1);
/// assert_eq!(report.skipped.len(), 1);
/// ```
pub fn import_stock_csv<R: Read>(input: R) -> DocResult<ImportReport<NewStockItem>> {
    let mut rdr = reader(input);
    let headers: Vec<String> = rdr.headers()?.iter().map(normalize_header).collect();

    let name_col = require_column(&headers, "name", STOCK_NAME_HEADERS)?;
    let price_col = require_column(&headers, "price", STOCK_PRICE_HEADERS)?;
    let qty_col = find_column(&headers, STOCK_QUANTITY_HEADERS);
    let hsn_col = find_column(&headers, STOCK_HSN_HEADERS);

    debug!(?headers, name_col, price_col, ?qty_col, ?hsn_col, "Stock sheet columns");

    let mut report = ImportReport::new();

    for (index, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                report.skipped.push(SkippedRow {
                    line: err.position().map(|p| p.line()).unwrap_or(index as u64 + 2),
                    reason: err.to_string(),
                });
                continue;
            }
        };
        let line = line_of(&record, index);

        match parse_stock_row(&record, name_col, price_col, qty_col, hsn_col) {
            Ok(draft) => report.records.push(draft),
            Err(reason) => report.skipped.push(SkippedRow { line, reason }),
        }
    }

    info!(
        imported = report.records.len(),
        skipped = report.skipped.len(),
        "Stock sheet parsed"
    );
    Ok(report)
}

fn parse_stock_row(
    record: &StringRecord,
    name_col: usize,
    price_col: usize,
    qty_col: Option<usize>,
    hsn_col: Option<usize>,
) -> Result<NewStockItem, String> {
    let name = cell(record, Some(name_col)).ok_or("missing item name")?;
    let raw_price = cell(record, Some(price_col)).ok_or("missing price")?;
    let price = Money::parse(raw_price).ok_or_else(|| format!("invalid price '{raw_price}'"))?;

    let quantity = match cell(record, qty_col) {
        Some(raw) => parse_quantity(raw).ok_or_else(|| format!("invalid quantity '{raw}'"))?,
        None => 0,
    };

    let draft = NewStockItem {
        name: name.to_string(),
        hsn_code: cell(record, hsn_col).map(str::to_string),
        unit_price_cents: price.cents(),
        available_quantity: quantity,
    };
    validate_new_stock_item(&draft).map_err(|e| e.to_string())?;
    Ok(draft)
}

/// Whole numbers, optionally written with a zero fraction (`"12.0"`).
fn parse_quantity(raw: &str) -> Option<i64> {
    let cleaned = raw.replace(',', "");
    if let Ok(value) = cleaned.parse::<i64>() {
        return Some(value);
    }
    let (whole, frac) = cleaned.split_once('.')?;
    if frac.chars().all(|c| c == '0') {
        whole.parse().ok()
    } else {
        None
    }
}

// =============================================================================
// Transaction Import
// =============================================================================

/// Parses a payment statement into transaction drafts.
///
/// `date` and `amount` columns are required. Rows with a zero or negative
/// amount (debits, reversals) are skipped.
pub fn import_transactions_csv<R: Read>(input: R) -> DocResult<ImportReport<NewTransaction>> {
    let mut rdr = reader(input);
    let headers: Vec<String> = rdr.headers()?.iter().map(normalize_header).collect();

    let date_col = require_column(&headers, "date", TXN_DATE_HEADERS)?;
    let amount_col = require_column(&headers, "amount", TXN_AMOUNT_HEADERS)?;
    let customer_col = find_column(&headers, TXN_CUSTOMER_HEADERS);
    let reference_col = find_column(&headers, TXN_REFERENCE_HEADERS);

    let mut report = ImportReport::new();

    for (index, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                report.skipped.push(SkippedRow {
                    line: err.position().map(|p| p.line()).unwrap_or(index as u64 + 2),
                    reason: err.to_string(),
                });
                continue;
            }
        };
        let line = line_of(&record, index);

        let parsed = parse_transaction_row(&record, date_col, amount_col, customer_col, reference_col);
        match parsed {
            Ok(draft) => report.records.push(draft),
            Err(reason) => report.skipped.push(SkippedRow { line, reason }),
        }
    }

    info!(
        imported = report.records.len(),
        skipped = report.skipped.len(),
        "Transaction sheet parsed"
    );
    Ok(report)
}

fn parse_transaction_row(
    record: &StringRecord,
    date_col: usize,
    amount_col: usize,
    customer_col: Option<usize>,
    reference_col: Option<usize>,
) -> Result<NewTransaction, String> {
    let raw_date = cell(record, Some(date_col)).ok_or("missing date")?;
    let txn_date = parse_date(raw_date).ok_or_else(|| format!("invalid date '{raw_date}'"))?;

    let raw_amount = cell(record, Some(amount_col)).ok_or("missing amount")?;
    let amount =
        Money::parse(raw_amount).ok_or_else(|| format!("invalid amount '{raw_amount}'"))?;

    let draft = NewTransaction {
        txn_date,
        customer_name: cell(record, customer_col).map(str::to_string),
        amount_cents: amount.cents(),
        reference: cell(record, reference_col).map(str::to_string),
    };
    validate_new_transaction(&draft).map_err(|e| e.to_string())?;
    Ok(draft)
}

/// Parses the date formats bank statements commonly use.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .map(|dt| dt.date())
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
