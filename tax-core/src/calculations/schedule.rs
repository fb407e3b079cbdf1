//! Progressive bracket schedule and the marginal tax function.
//!
//! A [`TaxSchedule`] is an ordered sequence of [`TaxBracket`]s that covers
//! `[0, ∞)` with no gaps and no overlaps. It is validated once on
//! construction and immutable afterwards.
//!
//! # Default schedule
//!
//! | Level                 | Range                     | Rate |
//! |-----------------------|---------------------------|------|
//! | `0-150,000`           | 0 – 150,000               | 0%   |
//! | `150,001-500,000`     | 150,000 – 500,000         | 10%  |
//! | `500,001-1,000,000`   | 500,000 – 1,000,000       | 15%  |
//! | `1,000,001-2,000,000` | 1,000,000 – 2,000,000     | 20%  |
//! | `2,000,001 ขึ้นไป`      | 2,000,000 and above       | 35%  |
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::calculations::TaxSchedule;
//!
//! let schedule = TaxSchedule::default();
//! let tax = schedule.progressive_tax(dec!(440000));
//!
//! assert_eq!(tax.gross_tax, dec!(29000));
//! assert_eq!(tax.breakdown.len(), 5);
//! assert_eq!(tax.breakdown[1].tax, dec!(29000));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TaxBracket;
use crate::calculations::common::max;

/// Errors raised when a bracket list does not form a valid schedule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxScheduleError {
    /// No tax brackets were provided.
    #[error("no tax brackets provided")]
    NoTaxBrackets,

    /// The first bracket must start at zero.
    #[error("first bracket must start at 0, got {0}")]
    FirstBracketNotAtZero(Decimal),

    /// A bracket does not start where the previous one ended.
    #[error("bracket {index} starts at {found} but the previous bracket ends at {expected}")]
    NotContiguous {
        index: usize,
        expected: Decimal,
        found: Decimal,
    },

    /// A bracket's upper bound is not above its lower bound.
    #[error("bracket {index} has upper bound {max} not above lower bound {min}")]
    EmptyBracket {
        index: usize,
        min: Decimal,
        max: Decimal,
    },

    /// Only the last bracket may be unbounded.
    #[error("bracket {0} is unbounded but is not the last bracket")]
    UnboundedBeforeEnd(usize),

    /// The last bracket must be unbounded so every income is covered.
    #[error("last bracket must be unbounded")]
    BoundedTopBracket,

    /// Marginal rates are fractions between 0 and 1.
    #[error("bracket {index} rate must be between 0 and 1, got {rate}")]
    InvalidRate { index: usize, rate: Decimal },
}

/// Tax computed for one bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketTax {
    pub level: String,
    pub tax: Decimal,
}

/// Result of applying the schedule to a taxable income.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressiveTax {
    /// Sum of every bracket contribution.
    pub gross_tax: Decimal,

    /// One entry per bracket, in schedule order, zero contributions included.
    pub breakdown: Vec<BracketTax>,
}

/// A validated, ordered bracket schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxSchedule {
    brackets: Vec<TaxBracket>,
}

impl TaxSchedule {
    /// Validates `brackets` and builds a schedule from them.
    ///
    /// # Errors
    ///
    /// Returns [`TaxScheduleError`] if the list is empty, does not start at
    /// zero, has a gap or overlap, contains an empty range, is bounded at the
    /// top, or carries a rate outside `[0, 1]`.
    pub fn new(brackets: Vec<TaxBracket>) -> Result<Self, TaxScheduleError> {
        let first = brackets.first().ok_or(TaxScheduleError::NoTaxBrackets)?;
        if !first.min_income.is_zero() {
            return Err(TaxScheduleError::FirstBracketNotAtZero(first.min_income));
        }

        let last_index = brackets.len() - 1;
        let mut expected_min = Decimal::ZERO;
        for (index, bracket) in brackets.iter().enumerate() {
            if bracket.min_income != expected_min {
                return Err(TaxScheduleError::NotContiguous {
                    index,
                    expected: expected_min,
                    found: bracket.min_income,
                });
            }
            if bracket.tax_rate < Decimal::ZERO || bracket.tax_rate > Decimal::ONE {
                return Err(TaxScheduleError::InvalidRate {
                    index,
                    rate: bracket.tax_rate,
                });
            }
            match bracket.max_income {
                Some(max) if max <= bracket.min_income => {
                    return Err(TaxScheduleError::EmptyBracket {
                        index,
                        min: bracket.min_income,
                        max,
                    });
                }
                Some(_) if index == last_index => {
                    return Err(TaxScheduleError::BoundedTopBracket);
                }
                Some(max) => expected_min = max,
                None if index != last_index => {
                    return Err(TaxScheduleError::UnboundedBeforeEnd(index));
                }
                None => {}
            }
        }

        Ok(Self { brackets })
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    /// Applies the marginal rates to `taxable_income`.
    ///
    /// Each bracket taxes the part of the income inside `[min, max)` (or
    /// `[min, ∞)` for the top bracket). Contributions are not rounded, so the
    /// breakdown sums to `gross_tax` exactly.
    pub fn progressive_tax(
        &self,
        taxable_income: Decimal,
    ) -> ProgressiveTax {
        let breakdown: Vec<BracketTax> = self
            .brackets
            .iter()
            .map(|bracket| BracketTax {
                level: bracket.level.clone(),
                tax: Self::income_in_bracket(bracket, taxable_income) * bracket.tax_rate,
            })
            .collect();
        let gross_tax = breakdown.iter().map(|b| b.tax).sum();

        ProgressiveTax {
            gross_tax,
            breakdown,
        }
    }

    fn income_in_bracket(
        bracket: &TaxBracket,
        taxable_income: Decimal,
    ) -> Decimal {
        let ceiling = match bracket.max_income {
            Some(max) => taxable_income.min(max),
            None => taxable_income,
        };
        max(ceiling - bracket.min_income, Decimal::ZERO)
    }
}

impl Default for TaxSchedule {
    fn default() -> Self {
        let bound = |v: i64| Decimal::from(v);
        let rate = |pct: i64| Decimal::new(pct, 2);

        Self {
            brackets: vec![
                TaxBracket::new(bound(0), Some(bound(150_000)), rate(0)),
                TaxBracket::new(bound(150_000), Some(bound(500_000)), rate(10)),
                TaxBracket::new(bound(500_000), Some(bound(1_000_000)), rate(15)),
                TaxBracket::new(bound(1_000_000), Some(bound(2_000_000)), rate(20)),
                TaxBracket::new(bound(2_000_000), None, rate(35)),
            ],
        }
    }
}
