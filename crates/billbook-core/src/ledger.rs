//! # Stock Ledger
//!
//! Plans the stock movements that follow from issuing or deleting a bill.
//!
//! ```text
//! issue bill   ──► plan_stock_decrement ──► [-qty per stock_id] ──┐
//!                                                                 ├──► apply
//! delete bill  ──► plan_stock_restore   ──► [+qty per stock_id] ──┘
//! ```
//!
//! The composer never writes stock. Callers plan deltas here, then apply them
//! either to an in-memory catalog ([`apply_deltas`], used by batch generation)
//! or inside a database transaction (billbook-db).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{BillLineItem, StockItem};

/// A signed change to one catalog entry's on-hand quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockDelta {
    pub stock_id: i64,
    /// Name snapshot from the bill line, used in error messages.
    pub name: String,
    /// Negative when stock leaves, positive when it comes back.
    pub delta: i64,
}

/// Merges lines that point at the same stock entry, keeping first-seen order.
fn aggregate(items: &[BillLineItem], sign: i64) -> CoreResult<Vec<StockDelta>> {
    let mut deltas: Vec<StockDelta> = Vec::with_capacity(items.len());

    for line in items {
        if line.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: format!("quantity of {}", line.name),
            }
            .into());
        }

        match deltas.iter_mut().find(|d| d.stock_id == line.stock_id) {
            Some(existing) => existing.delta += sign * line.quantity,
            None => deltas.push(StockDelta {
                stock_id: line.stock_id,
                name: line.name.clone(),
                delta: sign * line.quantity,
            }),
        }
    }

    Ok(deltas)
}

/// Checks every line against the catalog and returns the decrements.
///
/// ## Errors
/// - `StockItemNotFound` if a line references an unknown entry
/// - `InsufficientStockForItem` if the summed quantity exceeds what is on hand
pub fn plan_stock_decrement(
    catalog: &[StockItem],
    items: &[BillLineItem],
) -> CoreResult<Vec<StockDelta>> {
    let deltas = aggregate(items, -1)?;

    for delta in &deltas {
        let entry = catalog
            .iter()
            .find(|item| item.id == delta.stock_id)
            .ok_or(CoreError::StockItemNotFound(delta.stock_id))?;

        let requested = -delta.delta;
        if requested > entry.available_quantity {
            return Err(CoreError::InsufficientStockForItem {
                name: entry.name.clone(),
                available: entry.available_quantity,
                requested,
            });
        }
    }

    Ok(deltas)
}

/// Returns the decrements a bill asks for without checking availability.
///
/// For stores that enforce availability themselves, such as a conditional
/// `UPDATE` in SQL.
pub fn requested_decrements(items: &[BillLineItem]) -> CoreResult<Vec<StockDelta>> {
    aggregate(items, -1)
}

/// Returns the increments that undo a bill's decrements.
pub fn plan_stock_restore(items: &[BillLineItem]) -> CoreResult<Vec<StockDelta>> {
    aggregate(items, 1)
}

/// Applies `deltas` to an in-memory catalog.
///
/// All deltas are checked before any is applied, so on error the catalog is
/// left untouched.
pub fn apply_deltas(catalog: &mut [StockItem], deltas: &[StockDelta]) -> CoreResult<()> {
    let mut positions = Vec::with_capacity(deltas.len());

    for delta in deltas {
        let position = catalog
            .iter()
            .position(|item| item.id == delta.stock_id)
            .ok_or(CoreError::StockItemNotFound(delta.stock_id))?;

        let entry = &catalog[position];
        if entry.available_quantity + delta.delta < 0 {
            return Err(CoreError::InsufficientStockForItem {
                name: entry.name.clone(),
                available: entry.available_quantity,
                requested: -delta.delta,
            });
        }
        positions.push(position);
    }

    for (position, delta) in positions.into_iter().zip(deltas) {
        catalog[position].available_quantity += delta.delta;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
