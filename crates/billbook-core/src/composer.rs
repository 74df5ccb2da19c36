//! # Bill Composer
//!
//! Picks stock items and quantities whose summed cost approximates a target
//! total, then nudges one line's price so the bill lands on the target exactly.
//!
//! ## Search Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Bounded Stochastic Search                            │
//! │                                                                         │
//! │  catalog ──► sellable (qty > 0) ──► minus previous bill's names        │
//! │                                        │ (dropped if < 2 remain)        │
//! │                                        ▼                                │
//! │  ┌──────────────── repeat max_attempts ─────────────────┐              │
//! │  │  shuffle pool (Fisher–Yates)                          │              │
//! │  │  k ← random in [2, 7]                                 │              │
//! │  │  walk: take the larger of qty 1, 2 with total ≤ t+tol │              │
//! │  │        (tol doubled until 2 items are in)             │              │
//! │  │  < 2 items? add cheapest remaining at qty 1           │              │
//! │  │  |total - target| strictly better? → keep as best     │              │
//! │  └───────────────────────────────────────────────────────┘              │
//! │                                        │                                │
//! │           no trial succeeded? ──► 2 cheapest at qty 1                   │
//! │                                        │                                │
//! │                                        ▼                                │
//! │  exact-match adjustment on the largest-quantity line: shift its unit    │
//! │  price by (target - total) / quantity, never below 1 unit of currency.  │
//! │  An odd remainder over 2 units folds the line to quantity 1.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purity
//! The composer reads the catalog and never writes it. Randomness and
//! progress reporting both come in as parameters, so a seeded
//! [`rand::rngs::StdRng`] reproduces a composition exactly.
//!
//! ## Usage
//! ```rust
//! use std::collections::HashSet;
//! use rand::{rngs::StdRng, SeedableRng};
//! use billbook_core::composer::Composer;
//! use billbook_core::money::{Money, PositiveAmount};
//! # use billbook_core::StockItem;
//! # fn item(id: i64, name: &str, units: i64) -> StockItem {
//! #     let now = chrono::Utc::now();
//! #     StockItem { id, account_id: "default".into(), name: name.into(), hsn_code: None,
//! #         unit_price_cents: units * 100, available_quantity: 10, created_at: now, updated_at: now }
//! # }
//!
//! let catalog = vec![item(1, "Rice", 80), item(2, "Oil", 120), item(3, "Sugar", 60)];
//! let target = PositiveAmount::new(Money::from_units(300)).unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let result = Composer::default()
//!     .compose(target, &catalog, &HashSet::new(), &mut rng)
//!     .unwrap();
//!
//! assert_eq!(result.achieved_total(), Money::from_units(300));
//! ```

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, PositiveAmount};
use crate::types::{lines_total, BillLineItem, StockItem};
use crate::validation::ValidationResult;
use crate::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_TOLERANCE, MAX_AMOUNT_CENTS, MAX_BILL_ITEMS, MAX_LINE_QUANTITY,
    MIN_BILL_ITEMS, MIN_UNIT_PRICE,
};

// =============================================================================
// Options
// =============================================================================

/// Tunables for a composition.
///
/// Defaults match the billing policy: tolerance 30.00, 200 trials,
/// 2 to 7 lines, at most 2 units per line, no unit price below 1.00.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ComposeOptions {
    /// How far above the target a trial's running total may go.
    pub tolerance: Money,
    /// Number of independent trials.
    pub max_attempts: usize,
    /// Fewest lines a bill may have.
    pub min_items: usize,
    /// Most lines a bill may have.
    pub max_items: usize,
    /// Per-line quantity cap, independent of stock on hand.
    pub max_line_quantity: i64,
    /// Floor for the exact-match price adjustment.
    pub min_unit_price: Money,
    /// End the search at the first trial that hits the target exactly.
    pub stop_on_exact: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        ComposeOptions {
            tolerance: DEFAULT_TOLERANCE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_items: MIN_BILL_ITEMS,
            max_items: MAX_BILL_ITEMS,
            max_line_quantity: MAX_LINE_QUANTITY,
            min_unit_price: MIN_UNIT_PRICE,
            stop_on_exact: true,
        }
    }
}

impl ComposeOptions {
    /// Checks the options are internally consistent.
    pub fn validate(&self) -> ValidationResult<()> {
        if !(0..=MAX_AMOUNT_CENTS).contains(&self.tolerance.cents()) {
            return Err(ValidationError::OutOfRange {
                field: "tolerance".to_string(),
                min: 0,
                max: MAX_AMOUNT_CENTS,
            });
        }
        if self.min_items == 0 {
            return Err(ValidationError::MustBePositive {
                field: "min items".to_string(),
            });
        }
        if self.max_items < self.min_items {
            return Err(ValidationError::OutOfRange {
                field: "max items".to_string(),
                min: self.min_items as i64,
                max: i64::MAX,
            });
        }
        if self.max_line_quantity < 1 {
            return Err(ValidationError::MustBePositive {
                field: "max line quantity".to_string(),
            });
        }
        if self.min_unit_price.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "min unit price".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Result
// =============================================================================

/// Soft conditions raised while composing. None of them block a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CompositionWarning {
    /// The price adjustment would have gone below the price floor, so the
    /// bill total still differs from the target by `residual_cents`.
    #[serde(rename_all = "camelCase")]
    ExactAdjustmentClamped {
        stock_id: i64,
        requested_price_cents: i64,
        applied_price_cents: i64,
        residual_cents: i64,
    },
}

/// The outcome of one composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CompositionResult {
    /// Chosen lines in selection order.
    pub items: Vec<BillLineItem>,
    /// Sum of line totals after adjustment.
    pub achieved_total_cents: i64,
    /// The requested total.
    pub target_cents: i64,
    /// Sum of line totals at catalog prices, before adjustment.
    pub pre_adjustment_total_cents: i64,
    /// Trials actually run (fewer than the limit after an exact hit).
    pub attempts_run: usize,
    /// True when the previous-bill exclusion left too few items and was ignored.
    pub exclusion_dropped: bool,
    /// True when no trial succeeded and the cheapest-two fallback was used.
    pub used_fallback: bool,
    pub warnings: Vec<CompositionWarning>,
}

impl CompositionResult {
    /// Sum of line totals after adjustment.
    pub fn achieved_total(&self) -> Money {
        Money::from_cents(self.achieved_total_cents)
    }

    /// The requested total.
    pub fn target(&self) -> Money {
        Money::from_cents(self.target_cents)
    }

    /// `|achieved_total - target|`.
    pub fn absolute_difference(&self) -> Money {
        self.achieved_total().distance(self.target())
    }

    /// Checks whether the bill total equals the target.
    pub fn is_exact(&self) -> bool {
        self.achieved_total_cents == self.target_cents
    }

    /// Checks whether the price adjustment had to be clamped.
    pub fn was_clamped(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, CompositionWarning::ExactAdjustmentClamped { .. }))
    }

    /// Names used by this composition; the exclusion set for the next one.
    pub fn item_names(&self) -> HashSet<String> {
        self.items.iter().map(|item| item.name.clone()).collect()
    }
}

// =============================================================================
// Observer
// =============================================================================

/// What happened to a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    /// Could not reach the minimum item count.
    Discarded,
    /// Strictly closer to the target than any earlier trial.
    Improved,
    /// Valid but not better than the current best.
    NotImproved,
}

/// Per-trial progress, handed to a [`CompositionObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialReport {
    /// 1-based trial number.
    pub attempt: usize,
    /// The item count `k` drawn for this trial.
    pub target_item_count: usize,
    /// Lines the trial ended up with.
    pub item_count: usize,
    pub total: Money,
    pub difference: Money,
    pub outcome: TrialOutcome,
}

/// Receives progress at trial boundaries.
///
/// The search never depends on what an observer does.
pub trait CompositionObserver {
    /// Called once per trial, after the trial is scored.
    fn on_trial(&mut self, _report: &TrialReport) {}
}

/// Ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl CompositionObserver for NoopObserver {}

/// Emits one `trace` event per trial.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CompositionObserver for TracingObserver {
    fn on_trial(&mut self, report: &TrialReport) {
        trace!(
            attempt = report.attempt,
            k = report.target_item_count,
            items = report.item_count,
            total = %report.total,
            difference = %report.difference,
            outcome = ?report.outcome,
            "Composition trial"
        );
    }
}

// =============================================================================
// Composer
// =============================================================================

/// Runs compositions under a fixed set of [`ComposeOptions`].
#[derive(Debug, Clone, Default)]
pub struct Composer {
    options: ComposeOptions,
}

/// A selection before it is turned into bill lines: pool index + quantity.
#[derive(Debug, Clone, Copy)]
struct Pick {
    index: usize,
    quantity: i64,
}

#[derive(Debug, Clone)]
struct Trial {
    picks: Vec<Pick>,
    difference: Money,
}

impl Composer {
    /// Creates a composer with the given options.
    pub fn new(options: ComposeOptions) -> Self {
        Composer { options }
    }

    /// Returns the options in use.
    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    /// Composes a bill for `target` without progress reporting.
    pub fn compose<R: Rng + ?Sized>(
        &self,
        target: PositiveAmount,
        catalog: &[StockItem],
        excluded_names: &HashSet<String>,
        rng: &mut R,
    ) -> CoreResult<CompositionResult> {
        self.compose_observed(target, catalog, excluded_names, rng, &mut NoopObserver)
    }

    /// Composes a bill for `target`, reporting each trial to `observer`.
    ///
    /// ## Errors
    /// `CoreError::InsufficientStock` when fewer than `min_items` catalog
    /// entries have stock. The previous-bill exclusion alone never causes it.
    pub fn compose_observed<R, O>(
        &self,
        target: PositiveAmount,
        catalog: &[StockItem],
        excluded_names: &HashSet<String>,
        rng: &mut R,
        observer: &mut O,
    ) -> CoreResult<CompositionResult>
    where
        R: Rng + ?Sized,
        O: CompositionObserver + ?Sized,
    {
        let min_items = self.options.min_items.max(1);
        let max_items = self.options.max_items.max(min_items);
        let target = target.get();

        let sellable: Vec<&StockItem> = catalog
            .iter()
            .filter(|i| i.is_sellable() && (0..=MAX_AMOUNT_CENTS).contains(&i.unit_price_cents))
            .collect();
        if sellable.len() < min_items {
            return Err(CoreError::InsufficientStock {
                available_items: sellable.len(),
                required: min_items,
            });
        }

        let (pool, exclusion_dropped) = eligible_pool(&sellable, excluded_names, min_items);

        debug!(
            target = %target,
            catalog = catalog.len(),
            pool = pool.len(),
            excluded = excluded_names.len(),
            exclusion_dropped,
            "Composing bill"
        );

        let mut best: Option<Trial> = None;
        let mut attempts_run = 0;

        for attempt in 1..=self.options.max_attempts {
            attempts_run = attempt;
            let k = rng.gen_range(min_items..=max_items);

            let Some(trial) = self.run_trial(&pool, target, k, min_items, rng) else {
                observer.on_trial(&TrialReport {
                    attempt,
                    target_item_count: k,
                    item_count: 0,
                    total: Money::zero(),
                    difference: target,
                    outcome: TrialOutcome::Discarded,
                });
                continue;
            };

            // Ties keep the earlier trial.
            let improved = best
                .as_ref()
                .map_or(true, |current| trial.difference < current.difference);

            observer.on_trial(&TrialReport {
                attempt,
                target_item_count: k,
                item_count: trial.picks.len(),
                total: picks_total(&pool, &trial.picks),
                difference: trial.difference,
                outcome: if improved {
                    TrialOutcome::Improved
                } else {
                    TrialOutcome::NotImproved
                },
            });

            if improved {
                let exact = trial.difference.is_zero();
                best = Some(trial);
                if exact && self.options.stop_on_exact {
                    break;
                }
            }
        }

        let (picks, used_fallback) = match best {
            Some(trial) => (trial.picks, false),
            None => (cheapest_picks(&pool, min_items), true),
        };

        let mut items: Vec<BillLineItem> = picks
            .iter()
            .map(|pick| {
                let item = pool[pick.index];
                BillLineItem {
                    stock_id: item.id,
                    name: item.name.clone(),
                    hsn_code: item.hsn_code.clone(),
                    unit_price_cents: item.unit_price_cents,
                    quantity: pick.quantity,
                }
            })
            .collect();

        let pre_adjustment_total = lines_total(&items);
        let mut warnings = Vec::new();
        self.adjust_to_target(&mut items, target, &mut warnings);
        let achieved_total = lines_total(&items);

        debug!(
            items = items.len(),
            attempts = attempts_run,
            pre_adjustment = %pre_adjustment_total,
            achieved = %achieved_total,
            used_fallback,
            warnings = warnings.len(),
            "Bill composed"
        );

        Ok(CompositionResult {
            items,
            achieved_total_cents: achieved_total.cents(),
            target_cents: target.cents(),
            pre_adjustment_total_cents: pre_adjustment_total.cents(),
            attempts_run,
            exclusion_dropped,
            used_fallback,
            warnings,
        })
    }

    /// One shuffled walk over the pool. `None` when the minimum item count
    /// cannot be reached even after force-filling.
    fn run_trial<R: Rng + ?Sized>(
        &self,
        pool: &[&StockItem],
        target: Money,
        k: usize,
        min_items: usize,
        rng: &mut R,
    ) -> Option<Trial> {
        let mut order: Vec<usize> = (0..pool.len()).collect();
        order.shuffle(rng);

        let tolerance = self.options.tolerance.max(Money::zero());
        let strict_ceiling = target.saturating_add(tolerance);
        let relaxed_ceiling = strict_ceiling.saturating_add(tolerance);

        let mut taken = vec![false; pool.len()];
        let mut picks: Vec<Pick> = Vec::with_capacity(k);
        let mut total = Money::zero();

        for index in order {
            if picks.len() >= k {
                break;
            }

            let ceiling = if picks.len() < min_items {
                relaxed_ceiling
            } else {
                strict_ceiling
            };

            if let Some(quantity) = self.choose_quantity(pool[index], total, ceiling) {
                total += pool[index].unit_price() * quantity;
                taken[index] = true;
                picks.push(Pick { index, quantity });
            }
        }

        if picks.len() < min_items {
            let mut remaining: Vec<usize> = (0..pool.len()).filter(|i| !taken[*i]).collect();
            remaining.sort_by_key(|i| pool[*i].unit_price_cents);

            for index in remaining.into_iter().take(min_items - picks.len()) {
                total += pool[index].unit_price();
                picks.push(Pick { index, quantity: 1 });
            }
        }

        if picks.len() < min_items {
            return None;
        }

        Some(Trial {
            difference: total.distance(target),
            picks,
        })
    }

    /// Tries quantities 1, 2, .. up to the cap and keeps the largest one
    /// whose running total stays at or below `ceiling`.
    fn choose_quantity(&self, item: &StockItem, running: Money, ceiling: Money) -> Option<i64> {
        let cap = self.options.max_line_quantity.min(item.available_quantity);

        (1..=cap)
            .take_while(|quantity| running + item.unit_price() * *quantity <= ceiling)
            .last()
    }

    /// Moves one line's unit price so the bill total equals `target`.
    ///
    /// The line is the one with the largest quantity, first in list order on
    /// ties. When its quantity does not divide the difference (an odd number
    /// of cents over two units) the line drops to quantity 1 and carries the
    /// whole adjusted line total, so integer prices still land exactly.
    ///
    /// A price below the floor is clamped to it. The total then stays above
    /// the target but strictly closer to it, unless the line was already
    /// priced at or below the floor and kept its quantity. Such a line is
    /// left as it was and the warning still reports the residual.
    fn adjust_to_target(
        &self,
        items: &mut [BillLineItem],
        target: Money,
        warnings: &mut Vec<CompositionWarning>,
    ) {
        let difference = target - lines_total(items);
        if difference.is_zero() || items.is_empty() {
            return;
        }

        let index = adjustment_line(items);
        let line = &mut items[index];

        let wanted_line_total = line.line_total() + difference;
        let (quantity, requested) = if wanted_line_total.cents() % line.quantity == 0 {
            (line.quantity, wanted_line_total.cents() / line.quantity)
        } else {
            (1, wanted_line_total.cents())
        };
        // Never push a price up to the floor when the bill is already too high.
        let floor = self.options.min_unit_price.cents().min(line.unit_price_cents);
        let clamped = requested < floor;
        let applied = requested.max(floor);

        debug!(
            stock_id = line.stock_id,
            from = line.unit_price_cents,
            to = applied,
            from_quantity = line.quantity,
            to_quantity = quantity,
            "Adjusting line price to hit target"
        );

        line.quantity = quantity;
        line.unit_price_cents = applied;
        let stock_id = line.stock_id;

        if clamped {
            warnings.push(CompositionWarning::ExactAdjustmentClamped {
                stock_id,
                requested_price_cents: requested,
                applied_price_cents: applied,
                residual_cents: (target - lines_total(items)).cents(),
            });
        }
    }
}

/// Composes with default options and the thread-local generator.
pub fn compose_default(
    target: PositiveAmount,
    catalog: &[StockItem],
    excluded_names: &HashSet<String>,
) -> CoreResult<CompositionResult> {
    Composer::default().compose(target, catalog, excluded_names, &mut rand::thread_rng())
}

// =============================================================================
// Helpers
// =============================================================================

/// Applies the previous-bill exclusion unless it would leave fewer than
/// `min_items` entries. Returns the pool and whether the exclusion was dropped.
fn eligible_pool<'a>(
    sellable: &[&'a StockItem],
    excluded_names: &HashSet<String>,
    min_items: usize,
) -> (Vec<&'a StockItem>, bool) {
    if excluded_names.is_empty() {
        return (sellable.to_vec(), false);
    }

    let filtered: Vec<&StockItem> = sellable
        .iter()
        .copied()
        .filter(|item| !excluded_names.contains(&item.name))
        .collect();

    if filtered.len() < min_items {
        (sellable.to_vec(), true)
    } else {
        (filtered, false)
    }
}

/// The deterministic fallback: cheapest `count` items at quantity 1.
fn cheapest_picks(pool: &[&StockItem], count: usize) -> Vec<Pick> {
    let mut order: Vec<usize> = (0..pool.len()).collect();
    order.sort_by_key(|i| pool[*i].unit_price_cents);
    order
        .into_iter()
        .take(count)
        .map(|index| Pick { index, quantity: 1 })
        .collect()
}

fn picks_total(pool: &[&StockItem], picks: &[Pick]) -> Money {
    picks
        .iter()
        .map(|pick| pool[pick.index].unit_price() * pick.quantity)
        .sum()
}

/// Chooses the line to carry the exact-match adjustment: largest quantity,
/// first in list order on ties.
fn adjustment_line(items: &[BillLineItem]) -> usize {
    let mut chosen = 0;
    for (index, line) in items.iter().enumerate() {
        if line.quantity > items[chosen].quantity {
            chosen = index;
        }
    }
    chosen
}

// =============================================================================
// Unit Tests
// =============================================================================
