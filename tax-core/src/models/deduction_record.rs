use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::DeductionConfig;

/// The persisted row holding the administrator-adjustable deductions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionRecord {
    pub id: i64,
    pub personal_deduction: Decimal,
    pub k_receipt_deduction: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl DeductionRecord {
    /// Overlays the stored values on `config`; the limits that are not
    /// persisted keep their configured values.
    pub fn apply_to(
        &self,
        config: DeductionConfig,
    ) -> DeductionConfig {
        DeductionConfig {
            personal_exemption: self.personal_deduction,
            k_receipt_upper_limit: self.k_receipt_deduction,
            ..config
        }
    }
}

/// For seeding the row on first start (no id or timestamp).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDeductionRecord {
    pub personal_deduction: Decimal,
    pub k_receipt_deduction: Decimal,
}

impl From<&DeductionConfig> for NewDeductionRecord {
    fn from(config: &DeductionConfig) -> Self {
        Self {
            personal_deduction: config.personal_exemption,
            k_receipt_deduction: config.k_receipt_upper_limit,
        }
    }
}
