//! # Money Module
//!
//! Provides the `Money` type and the rounding policy shared by every
//! calculation in Comanda.
//!
//! ## Whole Currency Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ROUNDING POLICY                                                        │
//! │                                                                         │
//! │  The restaurant bills in whole currency units (no minor unit).         │
//! │  Every derived amount is rounded half AWAY from zero:                  │
//! │                                                                         │
//! │     2.5 →  3        -2.5 → -3                                          │
//! │     2.4 →  2        -2.4 → -2                                          │
//! │                                                                         │
//! │  All intermediate math is integer (i128), never floating point.        │
//! │  The single exception is `Money::round_f64`, kept for callers that     │
//! │  still send raw numeric tips.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use comanda_core::money::Money;
//! use comanda_core::types::TaxRate;
//!
//! let subtotal = Money::from_units(10_800);
//! let base = subtotal.base_from_inclusive(TaxRate::from_bps(800));
//! assert_eq!(base.units(), 10_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use crate::types::TaxRate;

/// Basis points in one whole (100%).
pub const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Rounding
// =============================================================================

/// Divides `numerator` by `denominator`, rounding half away from zero.
///
/// ## Example
/// ```rust
/// use comanda_core::money::round_half_away;
///
/// assert_eq!(round_half_away(5, 2), 3);
/// assert_eq!(round_half_away(-5, 2), -3);
/// assert_eq!(round_half_away(7, 3), 2);
/// ```
///
/// # Panics
/// Panics if `denominator` is zero, like integer division.
pub fn round_half_away(numerator: i128, denominator: i128) -> i64 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;

    if remainder.abs() * 2 >= denominator.abs() {
        let step = if (numerator < 0) == (denominator < 0) { 1 } else { -1 };
        (quotient + step) as i64
    } else {
        quotient as i64
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole currency units.
///
/// ## Design Decisions
/// - **i64 (signed)**: discrepancies and shortfalls are negative amounts
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serialized transparently** as a plain number
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole currency units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units)
    }

    /// Rounds a raw numeric amount to whole units, half away from zero.
    ///
    /// Returns `None` for NaN or infinite input.
    ///
    /// ## Example
    /// ```rust
    /// use comanda_core::money::Money;
    ///
    /// assert_eq!(Money::round_f64(1500.5), Some(Money::from_units(1501)));
    /// assert_eq!(Money::round_f64(f64::NAN), None);
    /// ```
    pub fn round_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value.abs() > i64::MAX as f64 {
            return None;
        }
        Some(Money(value.round() as i64))
    }

    /// Returns the value in whole units.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0
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

    /// Applies a percentage given in basis points.
    ///
    /// ## Example
    /// ```rust
    /// use comanda_core::money::Money;
    ///
    /// // 10% of 10,000 = 1,000
    /// assert_eq!(Money::from_units(10_000).percentage(1000).units(), 1000);
    /// // 10% of 15 = 1.5 → 2
    /// assert_eq!(Money::from_units(15).percentage(1000).units(), 2);
    /// ```
    pub fn percentage(&self, bps: u32) -> Money {
        Money(round_half_away(self.0 as i128 * bps as i128, BPS_SCALE))
    }

    /// Extracts the pre-tax base from a tax-inclusive amount.
    ///
    /// `base = round(amount / (1 + rate))`, computed as
    /// `amount * 10000 / (10000 + bps)`.
    ///
    /// ## User Workflow
    /// ```text
    /// Subtotal (tax included): 10,800
    ///      │
    ///      ▼
    /// base_from_inclusive(8%) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Base tax: 10,000
    /// ```
    pub fn base_from_inclusive(&self, rate: TaxRate) -> Money {
        Money(round_half_away(
            self.0 as i128 * BPS_SCALE,
            BPS_SCALE + rate.bps() as i128,
        ))
    }

    /// Splits this amount over `weights` proportionally.
    ///
    /// Uses the largest-remainder method so the shares always sum to `self`.
    /// Ties go to the earlier weight. When every weight is zero the amount is
    /// spread evenly by position.
    ///
    /// ## Example
    /// ```rust
    /// use comanda_core::money::Money;
    ///
    /// let shares = Money::from_units(100).apportion(&[
    ///     Money::from_units(1),
    ///     Money::from_units(1),
    ///     Money::from_units(1),
    /// ]);
    /// let units: Vec<i64> = shares.iter().map(|m| m.units()).collect();
    /// assert_eq!(units, vec![34, 33, 33]);
    /// ```
    pub fn apportion(&self, weights: &[Money]) -> Vec<Money> {
        if weights.is_empty() {
            return Vec::new();
        }

        let sign: i128 = if self.0 < 0 { -1 } else { 1 };
        let total = (self.0 as i128).abs();

        let clamped: Vec<i128> = weights.iter().map(|w| w.0.max(0) as i128).collect();
        let weight_sum: i128 = clamped.iter().sum();
        let (weights, weight_sum) = if weight_sum == 0 {
            (vec![1_i128; clamped.len()], clamped.len() as i128)
        } else {
            (clamped, weight_sum)
        };

        let mut shares: Vec<i128> = Vec::with_capacity(weights.len());
        let mut remainders: Vec<(usize, i128)> = Vec::with_capacity(weights.len());
        for (idx, weight) in weights.iter().enumerate() {
            let scaled = total * weight;
            shares.push(scaled / weight_sum);
            remainders.push((idx, scaled % weight_sum));
        }

        let mut leftover = total - shares.iter().sum::<i128>();
        remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        for (idx, _) in remainders {
            if leftover == 0 {
                break;
            }
            if let Some(share) = shares.get_mut(idx) {
                *share += 1;
                leftover -= 1;
            }
        }

        shares
            .into_iter()
            .map(|share| Money((share * sign) as i64))
            .collect()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}", sign, self.0.unsigned_abs())
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
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
