use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lowest personal exemption a taxpayer or administrator may submit (exclusive).
pub const PERSONAL_EXEMPTION_FLOOR: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Highest value an administrator may set for either adjustable deduction.
pub const ADMIN_DEDUCTION_CEILING: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);

/// Process-wide deduction parameters read by every computation.
///
/// This is a plain copyable snapshot; the shared, mutable holder is
/// [`crate::settings::DeductionSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeductionConfig {
    /// Personal exemption applied when the request does not cap it.
    pub personal_exemption: Decimal,
    pub personal_upper_limit: Decimal,
    pub donation_upper_limit: Decimal,
    pub k_receipt_upper_limit: Decimal,
}

impl Default for DeductionConfig {
    fn default() -> Self {
        Self {
            personal_exemption: Decimal::from(60_000),
            personal_upper_limit: Decimal::from(100_000),
            donation_upper_limit: Decimal::from(100_000),
            k_receipt_upper_limit: Decimal::from(50_000),
        }
    }
}
