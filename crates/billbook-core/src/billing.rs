//! # Bill Assembly
//!
//! Turns compositions into bill drafts and drives batch generation over
//! imported transactions.
//!
//! ## Batch Flow
//! ```text
//! transactions (date order)
//!      │
//!      ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │ for each txn:                                            │
//! │   compose(txn.amount, working catalog, previous names)   │
//! │   ├── InsufficientStock → stop, keep bills so far        │
//! │   └── ok → assemble_bill                                 │
//! │            decrement working catalog                     │
//! │            previous names ← this bill's names            │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the one immediately preceding bill feeds the exclusion set.

use std::collections::HashSet;

use chrono::NaiveDate;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::composer::{Composer, CompositionResult};
use crate::error::CoreError;
use crate::ledger::{apply_deltas, plan_stock_decrement};
use crate::money::PositiveAmount;
use crate::types::{Bill, NewBill, StockItem, Transaction};

/// Prefix of every bill number.
pub const BILL_NUMBER_PREFIX: &str = "INV";

/// Formats a sequence number as a bill number: `7` → `INV-000007`.
pub fn format_bill_number(sequence: i64) -> String {
    format!("{BILL_NUMBER_PREFIX}-{sequence:06}")
}

/// Who and when a bill is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillMeta {
    pub customer_name: Option<String>,
    pub transaction_id: Option<String>,
    pub bill_date: NaiveDate,
}

/// Folds a composition into a bill draft.
pub fn assemble_bill(composition: &CompositionResult, meta: BillMeta) -> NewBill {
    NewBill {
        customer_name: meta
            .customer_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()),
        transaction_id: meta.transaction_id,
        bill_date: meta.bill_date,
        items: composition.items.clone(),
        total_cents: composition.achieved_total_cents,
    }
}

/// Item names on `bill`: the exclusion set for the next composition.
pub fn previous_bill_names(bill: &Bill) -> HashSet<String> {
    bill.items.iter().map(|item| item.name.clone()).collect()
}

/// One bill produced by [`generate_batch`].
#[derive(Debug, Clone)]
pub struct GeneratedBill {
    pub transaction_id: String,
    pub bill: NewBill,
    pub composition: CompositionResult,
}

/// A transaction that did not get a bill.
#[derive(Debug)]
pub struct BatchIssue {
    pub transaction_id: String,
    pub error: CoreError,
}

/// What a batch run produced.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Bills in transaction order.
    pub bills: Vec<GeneratedBill>,
    /// Transactions passed over (e.g. a non-positive amount).
    pub skipped: Vec<BatchIssue>,
    /// The transaction that ended the run early, if any.
    pub stopped: Option<BatchIssue>,
    /// Catalog after all generated bills are taken out.
    pub remaining_catalog: Vec<StockItem>,
}

/// Composes one bill per transaction, in order.
///
/// Stock is decremented in a working copy of `catalog` so later bills see
/// what earlier ones consumed. Running out of stock ends the batch; bills
/// already composed are kept.
pub fn generate_batch<R: Rng + ?Sized>(
    composer: &Composer,
    transactions: &[Transaction],
    catalog: &[StockItem],
    previous_names: HashSet<String>,
    rng: &mut R,
) -> BatchOutcome {
    let mut working = catalog.to_vec();
    let mut previous = previous_names;
    let mut outcome = BatchOutcome::default();

    for txn in transactions {
        let target = match PositiveAmount::new(txn.amount()) {
            Ok(target) => target,
            Err(error) => {
                warn!(transaction_id = %txn.id, %error, "Skipping transaction");
                outcome.skipped.push(BatchIssue {
                    transaction_id: txn.id.clone(),
                    error,
                });
                continue;
            }
        };

        let composed = composer
            .compose(target, &working, &previous, rng)
            .and_then(|composition| {
                let deltas = plan_stock_decrement(&working, &composition.items)?;
                apply_deltas(&mut working, &deltas)?;
                Ok(composition)
            });

        let composition = match composed {
            Ok(composition) => composition,
            Err(error) => {
                warn!(transaction_id = %txn.id, %error, "Batch stopped");
                outcome.stopped = Some(BatchIssue {
                    transaction_id: txn.id.clone(),
                    error,
                });
                break;
            }
        };

        debug!(
            transaction_id = %txn.id,
            items = composition.items.len(),
            total = %composition.achieved_total(),
            "Batch bill composed"
        );

        previous = composition.item_names();
        let bill = assemble_bill(
            &composition,
            BillMeta {
                customer_name: txn.customer_name.clone(),
                transaction_id: Some(txn.id.clone()),
                bill_date: txn.txn_date,
            },
        );

        outcome.bills.push(GeneratedBill {
            transaction_id: txn.id.clone(),
            bill,
            composition,
        });
    }

    info!(
        transactions = transactions.len(),
        bills = outcome.bills.len(),
        skipped = outcome.skipped.len(),
        stopped = outcome.stopped.is_some(),
        "Batch generation finished"
    );

    outcome.remaining_catalog = working;
    outcome
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn stock(id: i64, name: &str, units: i64, qty: i64) -> StockItem {
        let now = Utc::now();
        StockItem {
            id,
            account_id: "default".to_string(),
            name: name.to_string(),
            hsn_code: None,
            unit_price_cents: units * 100,
            available_quantity: qty,
            created_at: now,
            updated_at: now,
        }
    }

    fn txn(id: &str, units: i64) -> Transaction {
        Transaction {
            id: id.to_string(),
            account_id: "default".to_string(),
            txn_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            customer_name: Some(format!("Customer {id}")),
            amount_cents: units * 100,
            reference: None,
            billed: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_bill_number() {
        assert_eq!(format_bill_number(1), "INV-000001");
        assert_eq!(format_bill_number(1_234_567), "INV-1234567");
    }

    #[test]
    fn test_assemble_bill_copies_lines_and_total() {
        let catalog = vec![stock(1, "Rice", 80, 10), stock(2, "Oil", 120, 10)];
        let mut rng = StdRng::seed_from_u64(1);
        let composition = Composer::default()
            .compose(
                PositiveAmount::new(Money::from_units(200)).unwrap(),
                &catalog,
                &HashSet::new(),
                &mut rng,
            )
            .unwrap();

        let bill = assemble_bill(
            &composition,
            BillMeta {
                customer_name: Some("  ".to_string()),
                transaction_id: None,
                bill_date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            },
        );

        assert_eq!(bill.items, composition.items);
        assert_eq!(bill.total_cents, 20_000);
        assert_eq!(bill.customer_name, None);
    }

    #[test]
    fn test_batch_threads_stock_and_lookback() {
        let catalog = vec![
            stock(1, "Rice", 80, 2),
            stock(2, "Oil", 120, 2),
            stock(3, "Sugar", 60, 2),
            stock(4, "Dal", 90, 2),
        ];
        let transactions = vec![txn("t1", 200), txn("t2", 200), txn("t3", 200)];
        let mut rng = StdRng::seed_from_u64(11);

        let outcome = generate_batch(
            &Composer::default(),
            &transactions,
            &catalog,
            HashSet::new(),
            &mut rng,
        );

        let total_units_before: i64 = catalog.iter().map(|s| s.available_quantity).sum();
        let total_units_after: i64 = outcome
            .remaining_catalog
            .iter()
            .map(|s| s.available_quantity)
            .sum();
        let units_billed: i64 = outcome
            .bills
            .iter()
            .flat_map(|b| b.bill.items.iter())
            .map(|line| line.quantity)
            .sum();

        assert_eq!(total_units_before - total_units_after, units_billed);
        assert!(outcome.remaining_catalog.iter().all(|s| s.available_quantity >= 0));

        for pair in outcome.bills.windows(2) {
            let previous = pair[0].composition.item_names();
            if !pair[1].composition.exclusion_dropped {
                assert!(pair[1]
                    .bill
                    .items
                    .iter()
                    .all(|line| !previous.contains(&line.name)));
            }
        }
    }

    #[test]
    fn test_batch_stops_when_stock_runs_out() {
        let catalog = vec![stock(1, "Rice", 50, 1), stock(2, "Oil", 50, 1)];
        let transactions = vec![txn("t1", 100), txn("t2", 100)];
        let mut rng = StdRng::seed_from_u64(2);

        let outcome = generate_batch(
            &Composer::default(),
            &transactions,
            &catalog,
            HashSet::new(),
            &mut rng,
        );

        assert_eq!(outcome.bills.len(), 1);
        let stopped = outcome.stopped.unwrap();
        assert_eq!(stopped.transaction_id, "t2");
        assert!(matches!(stopped.error, CoreError::InsufficientStock { .. }));
    }

    #[test]
    fn test_batch_skips_non_positive_amounts() {
        let catalog = vec![stock(1, "Rice", 50, 5), stock(2, "Oil", 50, 5)];
        let transactions = vec![txn("zero", 0), txn("ok", 100)];
        let mut rng = StdRng::seed_from_u64(3);

        let outcome = generate_batch(
            &Composer::default(),
            &transactions,
            &catalog,
            HashSet::new(),
            &mut rng,
        );

        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.bills.len(), 1);
        assert_eq!(outcome.bills[0].transaction_id, "ok");
    }
}
