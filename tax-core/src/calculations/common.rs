//! Common utility functions for tax calculations.
//!
//! This module provides shared functionality used across the engine,
//! including rounding and the monetary presentation format.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};
use serde_json::value::RawValue;

/// Number of fractional digits every presented amount carries.
pub const DISPLAY_DECIMAL_PLACES: u32 = 1;

/// Rounds a decimal value to `dp` decimal places using half-to-even
/// ("banker's") rounding.
///
/// Values exactly halfway between two candidates round towards the one with
/// an even last digit, which avoids a systematic upward bias across many
/// rounded amounts.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::round_half_even;
///
/// assert_eq!(round_half_even(dec!(0.25), 1), dec!(0.2));
/// assert_eq!(round_half_even(dec!(0.35), 1), dec!(0.4));
/// assert_eq!(round_half_even(dec!(2.5), 0), dec!(2));
/// assert_eq!(round_half_even(dec!(3.5), 0), dec!(4));
/// ```
pub fn round_half_even(
    value: Decimal,
    dp: u32,
) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven)
}

/// Returns the maximum of two decimal values.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::max;
///
/// assert_eq!(max(dec!(100.00), dec!(200.00)), dec!(200.00));
/// assert_eq!(max(dec!(-100.00), dec!(-200.00)), dec!(-100.00));
/// ```
pub fn max(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a > b { a } else { b }
}

/// Renders an amount with exactly one fractional digit, rounding half to even.
///
/// This is a presentation step only; the returned string is never fed back
/// into further computation.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::format_amount;
///
/// assert_eq!(format_amount(dec!(29000)), "29000.0");
/// assert_eq!(format_amount(dec!(1.25)), "1.2");
/// assert_eq!(format_amount(dec!(1.35)), "1.4");
/// ```
pub fn format_amount(value: Decimal) -> String {
    let mut rounded = round_half_even(value, DISPLAY_DECIMAL_PLACES);
    if rounded.is_zero() {
        // -0.04 rounds to a signed zero; present it as plain zero.
        rounded = Decimal::ZERO;
    }
    rounded.rescale(DISPLAY_DECIMAL_PLACES);
    rounded.to_string()
}

/// A monetary amount at the presentation boundary.
///
/// `Money` displays through [`format_amount`] and serializes as a bare JSON
/// number carrying exactly one fractional digit (`29000.0`, never `29000` or
/// `"29000.0"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Money(pub Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn amount(self) -> Decimal {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// `serde` predicate used to omit zero-valued optional amounts.
    pub fn is_not_positive(money: &Money) -> bool {
        !money.is_positive()
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money(value)
    }
}

impl fmt::Display for Money {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&format_amount(self.0))
    }
}

impl Serialize for Money {
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let raw = RawValue::from_string(format_amount(self.0)).map_err(serde::ser::Error::custom)?;
        raw.serialize(serializer)
    }
}
