//! Personal income tax computation.
//!
//! Given total income, withholding and normalized allowance totals, this
//! module derives taxable income, applies the progressive schedule and nets
//! the result against withholding.
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Total deductions = personal exemption + donations + k-receipts |
//! | 2    | Taxable income = total income − total deductions (minimum 0) |
//! | 3    | Gross tax = progressive schedule applied to taxable income |
//! | 4    | Payable = gross tax − withholding (minimum 0) |
//! | 5    | Refund = withholding − gross tax (minimum 0) |
//!
//! Nothing is rounded here; rounding happens once when amounts are presented.
//! Sums and differences are checked, so amounts near `Decimal::MAX` yield
//! [`TaxRequestError::Overflow`].
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::calculations::{AllowanceTotals, TaxSchedule, compute_tax};
//! use tax_core::DeductionConfig;
//!
//! let totals = AllowanceTotals::defaults(&DeductionConfig::default());
//! let result = compute_tax(dec!(400000), dec!(80000), &totals, &TaxSchedule::default()).unwrap();
//!
//! assert_eq!(result.taxable_income, dec!(340000));
//! assert_eq!(result.gross_tax, dec!(19000));
//! assert_eq!(result.tax_payable, dec!(0));
//! assert_eq!(result.tax_refund, dec!(61000));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::allowances::AllowanceTotals;
use crate::calculations::common::max;
use crate::calculations::schedule::{BracketTax, TaxSchedule};

/// Range violations on the income and withholding of a request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxRequestError {
    #[error("totalIncome must not be negative, got {0}")]
    NegativeIncome(Decimal),

    #[error("wht must not be negative, got {0}")]
    NegativeWithholding(Decimal),

    #[error("wht ({withholding}) must not exceed totalIncome ({total_income})")]
    WithholdingExceedsIncome {
        withholding: Decimal,
        total_income: Decimal,
    },

    #[error("amounts are too large to compute tax")]
    Overflow,
}

/// Checks the preconditions the engine relies on.
///
/// # Errors
///
/// Returns [`TaxRequestError`] if either amount is negative or withholding
/// exceeds total income.
pub fn validate_amounts(
    total_income: Decimal,
    withholding: Decimal,
) -> Result<(), TaxRequestError> {
    if total_income < Decimal::ZERO {
        return Err(TaxRequestError::NegativeIncome(total_income));
    }
    if withholding < Decimal::ZERO {
        return Err(TaxRequestError::NegativeWithholding(withholding));
    }
    if withholding > total_income {
        return Err(TaxRequestError::WithholdingExceedsIncome {
            withholding,
            total_income,
        });
    }
    Ok(())
}

/// Result of a full income tax computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeTaxResult {
    pub taxable_income: Decimal,

    /// Tax from the schedule before withholding is applied.
    pub gross_tax: Decimal,

    /// Tax still owed after withholding. Zero when `tax_refund` is positive.
    pub tax_payable: Decimal,

    /// Withholding in excess of gross tax. Zero when `tax_payable` is positive.
    pub tax_refund: Decimal,

    /// Contribution of every bracket, in schedule order.
    pub breakdown: Vec<BracketTax>,
}

/// Taxable income after every deduction, never negative.
///
/// # Errors
///
/// Returns [`TaxRequestError::Overflow`] if the deductions or the difference
/// do not fit in a `Decimal`.
pub fn taxable_income(
    total_income: Decimal,
    personal_exemption: Decimal,
    donations: Decimal,
    k_receipts: Decimal,
) -> Result<Decimal, TaxRequestError> {
    let deductions = personal_exemption
        .checked_add(donations)
        .and_then(|sum| sum.checked_add(k_receipts))
        .ok_or(TaxRequestError::Overflow)?;
    let remaining = total_income
        .checked_sub(deductions)
        .ok_or(TaxRequestError::Overflow)?;
    Ok(max(remaining, Decimal::ZERO))
}

/// Nets gross tax against withholding.
///
/// At most one of the returned `(payable, refund)` values is positive; both
/// are zero at break-even.
pub fn payable_and_refund(
    gross_tax: Decimal,
    withholding: Decimal,
) -> Result<(Decimal, Decimal), TaxRequestError> {
    let net = gross_tax
        .checked_sub(withholding)
        .ok_or(TaxRequestError::Overflow)?;
    if net > Decimal::ZERO {
        Ok((net, Decimal::ZERO))
    } else if net < Decimal::ZERO {
        Ok((Decimal::ZERO, -net))
    } else {
        Ok((Decimal::ZERO, Decimal::ZERO))
    }
}

/// Runs the complete computation.
///
/// This is the single entry point shared by the interactive and batch paths,
/// so both always apply the same business rules.
pub fn compute_tax(
    total_income: Decimal,
    withholding: Decimal,
    totals: &AllowanceTotals,
    schedule: &TaxSchedule,
) -> Result<IncomeTaxResult, TaxRequestError> {
    let taxable_income = taxable_income(
        total_income,
        totals.personal_exemption,
        totals.donations,
        totals.k_receipts,
    )?;
    let progressive = schedule.progressive_tax(taxable_income);
    let (tax_payable, tax_refund) = payable_and_refund(progressive.gross_tax, withholding)?;

    debug!(
        %total_income,
        %taxable_income,
        gross_tax = %progressive.gross_tax,
        %tax_payable,
        %tax_refund,
        "computed income tax"
    );

    Ok(IncomeTaxResult {
        taxable_income,
        gross_tax: progressive.gross_tax,
        tax_payable,
        tax_refund,
        breakdown: progressive.breakdown,
    })
}
