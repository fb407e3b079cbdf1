//! Tax calculation modules.
//!
//! This module provides the computation engine: allowance normalization,
//! the progressive bracket schedule, taxable income and payable/refund
//! resolution, and the shared rounding and formatting helpers.

pub mod allowances;
pub mod common;
pub mod income_tax;
pub mod schedule;

pub use allowances::{AllowanceError, AllowanceTotals, normalize_allowances};
pub use common::{Money, format_amount};
pub use income_tax::{
    IncomeTaxResult, TaxRequestError, compute_tax, payable_and_refund, taxable_income,
    validate_amounts,
};
pub use schedule::{BracketTax, ProgressiveTax, TaxSchedule, TaxScheduleError};
