//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  0.1 + 0.2 = 0.30000000000000004                                        │
//! │                                                                         │
//! │  A day close sums hundreds of abonos; float drift shows up as a         │
//! │  one-cent mismatch between the corte and the cash drawer.               │
//! │                                                                         │
//! │  OUR SOLUTION: Integer centavos                                         │
//! │    $1,000.00 = 100000 cents                                            │
//! │    Card netting rounds ONCE per bucket, explicitly                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use quilate_core::money::Money;
//!
//! let abono = Money::from_pesos(200);
//! assert_eq!(abono.cents(), 20000);
//!
//! // 3% card fee: $200.00 -> $194.00 net
//! assert_eq!(abono.net_of_fee(300).cents(), 19400);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos.
///
/// Signed: returns are stored as negative mirror rows and keep their sign
/// through every aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use quilate_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole pesos.
    #[inline]
    pub const fn from_pesos(pesos: i64) -> Self {
        Money(pesos * 100)
    }

    /// Creates a Money value from major and minor units.
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

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-peso portion.
    #[inline]
    pub const fn pesos(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavo portion (always 0-99).
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

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies by a basis-point ratio, rounding half away from zero.
    ///
    /// `Money::from_cents(1000).scale_bps(9700)` is 97% of $10.00.
    ///
    /// i128 keeps large period totals from overflowing.
    pub fn scale_bps(&self, bps: u32) -> Money {
        let product = self.0 as i128 * bps as i128;
        let rounded = if product >= 0 {
            (product + 5000) / 10000
        } else {
            (product - 5000) / 10000
        };
        Money(rounded as i64)
    }

    /// Returns the amount left after an acquirer fee expressed in bps.
    ///
    /// ## Card Netting
    /// ```text
    /// Gross card total: $200.00
    ///      │
    ///      ▼
    /// net_of_fee(300)  ← 3% acquirer fee
    ///      │
    ///      ▼
    /// Net: $194.00
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use quilate_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(33333).net_of_fee(300).cents(), 32333);
    /// ```
    pub fn net_of_fee(&self, fee_bps: u32) -> Money {
        self.scale_bps(10000u32.saturating_sub(fee_bps))
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Arguments
    /// * `discount_bps` - Discount in basis points (1000 = 10%)
    pub fn apply_percentage_discount(&self, discount_bps: u32) -> Money {
        *self - self.scale_bps(discount_bps)
    }

    /// Rounds to the nearest whole peso, half away from zero.
    pub fn round_to_pesos(&self) -> Money {
        let rem = self.0 % 100;
        let base = self.0 - rem;
        if rem >= 50 {
            Money(base + 100)
        } else if rem <= -50 {
            Money(base - 100)
        } else {
            Money(base)
        }
    }

    /// True when both amounts agree within one centavo.
    ///
    /// Layaway and order balances are captured by hand; the invariants
    /// `anticipo + saldo = total` tolerate a cent of drift.
    pub fn approx_eq(&self, other: Money) -> bool {
        (self.0 - other.0).abs() <= 1
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.pesos().abs(), self.cents_part())
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
