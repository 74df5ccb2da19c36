//! # Domain Types
//!
//! Core domain types used throughout Billbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   StockItem     │   │      Bill       │   │  Transaction    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (rowid)     │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name (unique)  │   │  bill_number    │   │  date           │       │
//! │  │  unit_price     │   │  items[]  ──────┼─┐ │  amount         │       │
//! │  │  available_qty  │   │  total_cents    │ │ │  billed         │       │
//! │  └────────▲────────┘   └─────────────────┘ │ └─────────────────┘       │
//! │           │                                 │                           │
//! │           │            ┌─────────────────┐  │                           │
//! │           └────────────┤  BillLineItem   │◄─┘                           │
//! │             stock_id   │  name snapshot  │                              │
//! │                        │  price snapshot │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Bill lines copy the item name and price when the bill is composed. Later
//! catalog edits never rewrite a bill that was already issued.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Stock Item
// =============================================================================

/// A priced, quantity-tracked catalog entry available for selection into a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockItem {
    /// Unique identifier, stable for the session.
    pub id: i64,

    /// Account this item belongs to.
    pub account_id: String,

    /// Display name; unique per account for matching against previous bills.
    pub name: String,

    /// Tax classification code, printed on exported bills when present.
    pub hsn_code: Option<String>,

    /// Unit price in minor units.
    pub unit_price_cents: i64,

    /// Units on hand. Never negative.
    pub available_quantity: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// An item with nothing on hand is never selectable.
    #[inline]
    pub fn is_sellable(&self) -> bool {
        self.available_quantity > 0
    }
}

/// A stock item that has not been stored yet (import rows, API input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewStockItem {
    pub name: String,
    pub hsn_code: Option<String>,
    pub unit_price_cents: i64,
    pub available_quantity: i64,
}

// =============================================================================
// Bill Line Item
// =============================================================================

/// One line of a bill.
///
/// `unit_price_cents` starts as the catalog price and may be corrected by
/// the composer's exact-match adjustment on at most one line per bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillLineItem {
    /// Catalog entry this line was drawn from.
    pub stock_id: i64,
    /// Item name at time of composition (frozen).
    pub name: String,
    /// Tax classification at time of composition (frozen).
    pub hsn_code: Option<String>,
    /// Unit price at time of composition.
    pub unit_price_cents: i64,
    /// Units sold on this line.
    pub quantity: i64,
}

impl BillLineItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// `unit_price * quantity`.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

/// Sums the line totals of `items`.
pub fn lines_total(items: &[BillLineItem]) -> Money {
    items.iter().map(BillLineItem::line_total).sum()
}

// =============================================================================
// Bill
// =============================================================================

/// A bill as issued and stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    pub account_id: String,
    /// Human-readable sequential number, e.g. `INV-000042`.
    pub bill_number: String,
    pub customer_name: Option<String>,
    /// Imported transaction this bill was generated for, if any.
    pub transaction_id: Option<String>,
    #[ts(as = "String")]
    pub bill_date: NaiveDate,
    pub items: Vec<BillLineItem>,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Bill {
    /// Returns the bill total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Total units across all lines.
    pub fn unit_count(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// A bill that has been composed but not stored yet.
///
/// The repository assigns `id`, `bill_number` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewBill {
    pub customer_name: Option<String>,
    pub transaction_id: Option<String>,
    #[ts(as = "String")]
    pub bill_date: NaiveDate,
    pub items: Vec<BillLineItem>,
    pub total_cents: i64,
}

// =============================================================================
// Transaction
// =============================================================================

/// An imported payment record that a bill is generated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    #[ts(as = "String")]
    pub txn_date: NaiveDate,
    pub customer_name: Option<String>,
    pub amount_cents: i64,
    pub reference: Option<String>,
    /// Set once a bill has been generated for this transaction.
    pub billed: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Returns the amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// A transaction parsed from an import that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    #[ts(as = "String")]
    pub txn_date: NaiveDate,
    pub customer_name: Option<String>,
    pub amount_cents: i64,
    pub reference: Option<String>,
}

// =============================================================================
// Account
// =============================================================================

/// What a per-account server reports about itself so the browser client can
/// label its window and namespace its storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account_id: String,
    pub account_name: String,
    pub port: u16,
    pub storage_prefix: String,
}

// =============================================================================
// Date Range
// =============================================================================

/// Inclusive date range used by reports and exports. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Unbounded on both ends.
    pub const fn all() -> Self {
        DateRange { from: None, to: None }
    }

    /// Checks whether `date` falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
