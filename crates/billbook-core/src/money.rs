//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely, and
//! `PositiveAmount`, the only form a bill target can take.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  The bill composer compares totals against a target many hundreds      │
//! │  of times per request. A float drift of 0.0000001 would turn an exact  │
//! │  match into a miss and change which trial wins.                        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (cents, paise, ...)                  │
//! │    30000 minor units == 300.00 exactly, every time                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use billbook_core::money::Money;
//!
//! let price = Money::from_units(80);       // 80.00
//! let line = price * 2;                    // 160.00
//! let total = line + Money::from_cents(50); // 160.50
//! assert_eq!(total.cents(), 16050);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::MAX_AMOUNT_CENTS;

/// Minor units per unit of currency.
pub const MINOR_PER_UNIT: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: differences between a composed total and its target
///   are negative half of the time
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serializes as a bare integer** of minor units
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  StockItem.unit_price ──► BillLineItem.unit_price ──► line_total        │
/// │                                                         │               │
/// │  target (PositiveAmount) ◄── |achieved - target| ◄── achieved_total    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole units of currency.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_units(30).cents(), 3000);
    /// ```
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units * MINOR_PER_UNIT)
    }

    /// Parses a decimal string such as `"120"`, `"120.5"` or `"1,250.75"`.
    ///
    /// Thousands separators and a leading currency sign are ignored. More than
    /// two fractional digits is rejected rather than rounded.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    ///
    /// assert_eq!(Money::parse("1,250.75"), Some(Money::from_cents(125075)));
    /// assert_eq!(Money::parse("80"), Some(Money::from_units(80)));
    /// assert_eq!(Money::parse("abc"), None);
    /// ```
    pub fn parse(input: &str) -> Option<Self> {
        let cleaned: String = input
            .trim()
            .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '-' && c != '.')
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect();

        if cleaned.is_empty() {
            return None;
        }

        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if frac.len() > 2 || (whole.is_empty() && frac.is_empty()) {
            return None;
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }

        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().ok()? * 10,
            _ => frac.parse().ok()?,
        };

        let cents = whole.checked_mul(MINOR_PER_UNIT)?.checked_add(frac)?;
        Some(Money(if negative { -cents } else { cents }))
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / MINOR_PER_UNIT
    }

    /// Returns the minor-unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % MINOR_PER_UNIT).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    ///
    /// let unit_price = Money::from_units(60);
    /// assert_eq!(unit_price.multiply_quantity(2), Money::from_units(120));
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Adds without wrapping; clamps at the `i64` bounds.
    #[inline]
    pub const fn saturating_add(&self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    /// Distance between two amounts, always non-negative.
    #[inline]
    pub const fn distance(&self, other: Money) -> Money {
        Money((self.0 - other.0).abs())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering (`300.00`, `-5.50`). Currency symbols belong to
/// the document layer, which knows the account's locale.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.units().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Positive Amount
// =============================================================================

/// A strictly positive amount: the only thing a bill can be composed for.
///
/// ## Where Validation Happens
/// ```text
/// Request { target: 0 }
///      │
///      ▼
/// PositiveAmount::new(0) ← THIS TYPE
///      │
///      ├── ≤ 0 → CoreError::InvalidTarget (composer never runs)
///      ├── > MAX_AMOUNT_CENTS → CoreError::InvalidTarget
///      │
///      └── > 0 → Composer::compose(target, ...)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
#[ts(export)]
pub struct PositiveAmount(Money);

impl PositiveAmount {
    /// Wraps `amount`, rejecting zero, negative and oversized values.
    pub fn new(amount: Money) -> CoreResult<Self> {
        if !amount.is_positive() {
            return Err(CoreError::InvalidTarget {
                reason: format!("target must be positive, got {}", amount),
            });
        }
        if amount.cents() > MAX_AMOUNT_CENTS {
            return Err(CoreError::InvalidTarget {
                reason: format!(
                    "target must not exceed {}, got {}",
                    Money::from_cents(MAX_AMOUNT_CENTS),
                    amount
                ),
            });
        }
        Ok(PositiveAmount(amount))
    }

    /// Like [`PositiveAmount::new`] but also rejects a missing amount.
    pub fn from_optional(amount: Option<Money>) -> CoreResult<Self> {
        match amount {
            Some(amount) => PositiveAmount::new(amount),
            None => Err(CoreError::InvalidTarget {
                reason: "target is required".to_string(),
            }),
        }
    }

    /// Returns the wrapped amount.
    #[inline]
    pub const fn get(&self) -> Money {
        self.0
    }
}

impl fmt::Display for PositiveAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PositiveAmount {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let money = Money::deserialize(deserializer)?;
        PositiveAmount::new(money).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_units_and_cents() {
        let money = Money::from_units(300);
        assert_eq!(money.cents(), 30000);
        assert_eq!(money.units(), 300);
        assert_eq!(Money::from_cents(1099).cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_units(5).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);
        assert_eq!(b.distance(a), Money::from_cents(500));
        assert_eq!(
            Money::from_cents(i64::MAX).saturating_add(a),
            Money::from_cents(i64::MAX)
        );
    }

    #[test]
    fn test_sum() {
        let lines = [Money::from_units(80), Money::from_units(120), Money::from_units(100)];
        let total: Money = lines.iter().sum();
        assert_eq!(total, Money::from_units(300));
    }

    #[test]
    fn test_parse() {
        assert_eq!(Money::parse("120"), Some(Money::from_units(120)));
        assert_eq!(Money::parse(" 120.5 "), Some(Money::from_cents(12050)));
        assert_eq!(Money::parse("₹1,250.75"), Some(Money::from_cents(125075)));
        assert_eq!(Money::parse("-3.25"), Some(Money::from_cents(-325)));
        assert_eq!(Money::parse(".5"), Some(Money::from_cents(50)));
        assert_eq!(Money::parse("1.234"), None);
        assert_eq!(Money::parse(""), None);
        assert_eq!(Money::parse("twelve"), None);
    }

    #[test]
    fn test_positive_amount_rejects_zero_and_negative() {
        assert!(PositiveAmount::new(Money::from_units(300)).is_ok());
        assert!(matches!(
            PositiveAmount::new(Money::zero()),
            Err(CoreError::InvalidTarget { .. })
        ));
        assert!(matches!(
            PositiveAmount::new(Money::from_cents(-1)),
            Err(CoreError::InvalidTarget { .. })
        ));
        assert!(matches!(
            PositiveAmount::from_optional(None),
            Err(CoreError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_positive_amount_upper_bound() {
        assert!(PositiveAmount::new(Money::from_cents(MAX_AMOUNT_CENTS)).is_ok());
        assert!(matches!(
            PositiveAmount::new(Money::from_cents(MAX_AMOUNT_CENTS + 1)),
            Err(CoreError::InvalidTarget { .. })
        ));
        assert!(matches!(
            PositiveAmount::new(Money::from_cents(i64::MAX)),
            Err(CoreError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_positive_amount_deserialize_validates() {
        let ok: PositiveAmount = serde_json::from_str("30000").unwrap();
        assert_eq!(ok.get(), Money::from_units(300));
        assert!(serde_json::from_str::<PositiveAmount>("0").is_err());
    }
}
