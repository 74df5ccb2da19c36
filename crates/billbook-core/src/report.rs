//! # Reports
//!
//! Aggregates issued bills into a sales summary for a date range.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Bill, DateRange};

/// Units and revenue for one item name across the reported bills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ItemSales {
    pub name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

impl ItemSales {
    pub fn revenue(&self) -> Money {
        Money::from_cents(self.revenue_cents)
    }
}

/// Summary of the bills inside a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillReport {
    pub range: DateRange,
    pub bill_count: usize,
    pub total_amount_cents: i64,
    /// Units across all lines.
    pub items_sold: i64,
    /// Sorted by revenue, highest first, then by name.
    pub by_item: Vec<ItemSales>,
}

impl BillReport {
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

/// Summarizes the bills whose date falls inside `range`.
///
/// Lines are grouped by their name snapshot, so a renamed catalog entry
/// reports under both names.
pub fn summarize_bills(bills: &[Bill], range: DateRange) -> BillReport {
    let mut by_name: BTreeMap<&str, (i64, Money)> = BTreeMap::new();
    let mut bill_count = 0;
    let mut total = Money::zero();
    let mut items_sold = 0;

    for bill in bills.iter().filter(|bill| range.contains(bill.bill_date)) {
        bill_count += 1;
        total += bill.total();

        for line in &bill.items {
            items_sold += line.quantity;
            let entry = by_name.entry(line.name.as_str()).or_insert((0, Money::zero()));
            entry.0 += line.quantity;
            entry.1 += line.line_total();
        }
    }

    let mut by_item: Vec<ItemSales> = by_name
        .into_iter()
        .map(|(name, (quantity, revenue))| ItemSales {
            name: name.to_string(),
            quantity,
            revenue_cents: revenue.cents(),
        })
        .collect();
    // BTreeMap already yields names in order; the stable sort keeps it for ties.
    by_item.sort_by(|a, b| b.revenue_cents.cmp(&a.revenue_cents));

    BillReport {
        range,
        bill_count,
        total_amount_cents: total.cents(),
        items_sold,
        by_item,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
