//! # Money Module
//!
//! Provides the `Money` type for monetary values and `Percent` for rates.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every order total, line discount and unit price is an i64 of cents. │
//! │    "Two decimal places" is exactly "whole cents".                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::money::{Money, Percent};
//!
//! let line = Money::from_cents(1000).multiply_quantity(3); // $30.00
//! let off = line.percentage(Percent::from_bps(1000));       // 10%
//! assert_eq!(off.cents(), 300);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate results such as `subtotal - discount`
///   may dip below zero before they are clamped
/// - **Single field tuple struct**: Zero-cost abstraction over i64
///
/// ## Where Money is Used
/// ```text
/// Product.unit_price ──► OrderLine.unit_price (snapshot)
///                               │
///                               ├──► base = unit_price × quantity
///                               │
///                               └──► line_discount ──► line_total
///
/// Σ base ──► Order.subtotal      Σ line_discount ──► Order.discount_total
///                    │                    │
///                    └──────► grand_total ◄┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    /// `from_major_minor(-5, 50)` = -$5.50, not -$4.50
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
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

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299); // $2.99
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Computes `self × rate`, rounded to the nearest cent.
    ///
    /// ## Bankers Rounding (round half to even)
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  Exact halves go to the even cent:                                 │
    /// │    $0.125 → $0.12      $0.135 → $0.14      $0.126 → $0.13          │
    /// │                                                                     │
    /// │  This is the behavior of decimal `Round(x, 2)` in the back office, │
    /// │  so percent discounts match the amounts shown on old receipts.     │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::{Money, Percent};
    ///
    /// let base = Money::from_cents(125);
    /// assert_eq!(base.percentage(Percent::from_bps(1000)).cents(), 12); // 12.5 → 12
    /// let base = Money::from_cents(135);
    /// assert_eq!(base.percentage(Percent::from_bps(1000)).cents(), 14); // 13.5 → 14
    /// ```
    pub fn percentage(&self, rate: Percent) -> Money {
        // i128 keeps cents × bps from overflowing on large baskets
        let numerator = self.0 as i128 * rate.bps() as i128;
        Money::from_cents(round_half_even(numerator, 10_000) as i64)
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if self <= other {
            self
        } else {
            other
        }
    }

    /// Returns the larger of two amounts.
    #[inline]
    pub fn max(self, other: Money) -> Money {
        if self >= other {
            self
        } else {
            other
        }
    }

    /// Restricts the amount to `[low, high]`.
    ///
    /// `high` wins if the bounds are inverted, so a zero base always clamps to zero.
    #[inline]
    pub fn clamp_to(self, low: Money, high: Money) -> Money {
        self.max(low).min(high)
    }
}

/// Integer division rounding exact halves to the even neighbour.
fn round_half_even(numerator: i128, denominator: i128) -> i128 {
    let negative = (numerator < 0) != (denominator < 0);
    let (n, d) = (numerator.abs(), denominator.abs());
    let quotient = n / d;
    let twice_remainder = (n % d) * 2;

    let rounded = if twice_remainder > d || (twice_remainder == d && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    };

    if negative {
        -rounded
    } else {
        rounded
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs. The POS screen formats amounts itself.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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

// =============================================================================
// Percent
// =============================================================================

/// A rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10.00%, 1250 bps = 12.50%
///
/// Discount values are entered with two decimals ("12.50"), so basis points
/// hold them exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percent(i64);

impl Percent {
    /// One hundred percent.
    pub const FULL: Percent = Percent(10_000);

    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: i64) -> Self {
        Percent(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> i64 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn as_percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, (self.0 % 100).abs())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_percentage_exact() {
        // 3 × $10.00 at 10% = $3.00
        let base = Money::from_cents(3000);
        assert_eq!(base.percentage(Percent::from_bps(1000)).cents(), 300);
        assert_eq!(base.percentage(Percent::FULL).cents(), 3000);
        assert_eq!(base.percentage(Percent::zero()).cents(), 0);
    }

    #[test]
    fn test_percentage_rounds_half_to_even() {
        let ten = Percent::from_bps(1000);
        assert_eq!(Money::from_cents(125).percentage(ten).cents(), 12);
        assert_eq!(Money::from_cents(135).percentage(ten).cents(), 14);
        assert_eq!(Money::from_cents(126).percentage(ten).cents(), 13);
        assert_eq!(Money::from_cents(124).percentage(ten).cents(), 12);
        // 33.33% of $10.00 = 333.3 cents
        assert_eq!(Money::from_cents(1000).percentage(Percent::from_bps(3333)).cents(), 333);
    }

    #[test]
    fn test_percentage_negative_amount_is_symmetric() {
        let ten = Percent::from_bps(1000);
        assert_eq!(Money::from_cents(-125).percentage(ten).cents(), -12);
        assert_eq!(Money::from_cents(-135).percentage(ten).cents(), -14);
    }

    #[test]
    fn test_min_max_clamp() {
        let five = Money::from_cents(500);
        let forty = Money::from_cents(4000);
        assert_eq!(five.min(forty), five);
        assert_eq!(five.max(forty), forty);
        assert_eq!(Money::from_cents(5000).clamp_to(Money::zero(), forty), forty);
        assert_eq!(Money::from_cents(-1).clamp_to(Money::zero(), forty), Money::zero());
        assert_eq!(five.clamp_to(Money::zero(), Money::zero()), Money::zero());
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());
        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
    }

    #[test]
    fn test_percent_display() {
        assert_eq!(Percent::from_bps(1250).to_string(), "12.50%");
        assert_eq!(Percent::FULL.to_string(), "100.00%");
        assert!((Percent::from_bps(825).as_percentage() - 8.25).abs() < 0.001);
    }
}
