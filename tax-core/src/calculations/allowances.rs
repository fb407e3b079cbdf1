//! Allowance normalization.
//!
//! Turns the submitted allowance list into the three deduction totals the
//! engine consumes, applying the per-category floors and ceilings from the
//! current [`DeductionConfig`].
//!
//! | Category    | Accepted amount | Effect                                              |
//! |-------------|-----------------|-----------------------------------------------------|
//! | `personal`  | > 10,000        | exemption becomes the upper limit if amount exceeds it |
//! | `donation`  | ≥ 0             | added to donations, capped at the donation limit    |
//! | `k-receipt` | > 0             | added to k-receipts, capped at the k-receipt limit  |
//!
//! Processing is left to right and stops at the first violation. Each
//! category may appear at most once per request.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{AllowanceEntry, AllowanceKind, DeductionConfig, PERSONAL_EXEMPTION_FLOOR};

/// Errors raised while normalizing an allowance list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllowanceError {
    #[error(
        "The personal exemption must be more than 10,000 THB, got {0}. Please update the amount and try again."
    )]
    PersonalBelowFloor(Decimal),

    #[error("The donation must not be negative, got {0}. Please enter a positive amount and try again.")]
    NegativeDonation(Decimal),

    #[error("The k-receipt must be more than 0 THB, got {0}. Please enter a positive amount and try again.")]
    NonPositiveKReceipt(Decimal),

    #[error("invalid allowance type '{0}'. Please ensure the type is personal, donation, or k-receipt")]
    InvalidType(String),

    #[error("allowanceType {0} is redundant, please check and fill again")]
    Redundant(AllowanceKind),
}

/// Deduction totals fed into the taxable income computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceTotals {
    pub personal_exemption: Decimal,
    pub donations: Decimal,
    pub k_receipts: Decimal,
}

impl AllowanceTotals {
    /// The starting point before any entry is applied: the configured
    /// personal exemption and nothing else.
    pub fn defaults(config: &DeductionConfig) -> Self {
        Self {
            personal_exemption: config.personal_exemption,
            donations: Decimal::ZERO,
            k_receipts: Decimal::ZERO,
        }
    }

    /// Replaces the donation total with `amount` as given, bypassing the
    /// category rules. Used where the category is implicit in the input
    /// format.
    pub fn with_donation(
        self,
        amount: Decimal,
    ) -> Self {
        Self {
            donations: amount,
            ..self
        }
    }

    pub fn total(&self) -> Decimal {
        self.personal_exemption + self.donations + self.k_receipts
    }
}

/// Applies every entry in order and returns the resulting totals.
///
/// # Errors
///
/// Returns the first [`AllowanceError`] encountered; later entries are not
/// inspected.
///
/// # Example
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::normalize_allowances;
/// use tax_core::{AllowanceEntry, DeductionConfig};
///
/// let entries = vec![
///     AllowanceEntry::new("donation", dec!(200000)),
///     AllowanceEntry::new("k-receipt", dec!(5000)),
/// ];
///
/// let totals = normalize_allowances(&entries, &DeductionConfig::default()).unwrap();
///
/// assert_eq!(totals.personal_exemption, dec!(60000));
/// assert_eq!(totals.donations, dec!(100000));
/// assert_eq!(totals.k_receipts, dec!(5000));
/// ```
pub fn normalize_allowances(
    entries: &[AllowanceEntry],
    config: &DeductionConfig,
) -> Result<AllowanceTotals, AllowanceError> {
    let mut totals = AllowanceTotals::defaults(config);
    let mut seen = HashSet::new();

    for entry in entries {
        let kind = entry.kind().ok_or_else(|| {
            warn!(allowance_type = %entry.allowance_type, "rejected unknown allowance type");
            AllowanceError::InvalidType(entry.allowance_type.clone())
        })?;

        if !seen.insert(kind) {
            warn!(%kind, "rejected redundant allowance");
            return Err(AllowanceError::Redundant(kind));
        }

        match kind {
            AllowanceKind::Personal => {
                if entry.amount <= PERSONAL_EXEMPTION_FLOOR {
                    return Err(AllowanceError::PersonalBelowFloor(entry.amount));
                }
                // Only the cap overrides the configured base.
                if entry.amount > config.personal_upper_limit {
                    totals.personal_exemption = config.personal_upper_limit;
                }
            }
            AllowanceKind::Donation => {
                if entry.amount < Decimal::ZERO {
                    return Err(AllowanceError::NegativeDonation(entry.amount));
                }
                totals.donations = (totals.donations + entry.amount).min(config.donation_upper_limit);
            }
            AllowanceKind::KReceipt => {
                if entry.amount <= Decimal::ZERO {
                    return Err(AllowanceError::NonPositiveKReceipt(entry.amount));
                }
                totals.k_receipts =
                    (totals.k_receipts + entry.amount).min(config.k_receipt_upper_limit);
            }
        }
    }

    debug!(
        personal_exemption = %totals.personal_exemption,
        donations = %totals.donations,
        k_receipts = %totals.k_receipts,
        "normalized allowances"
    );
    Ok(totals)
}
