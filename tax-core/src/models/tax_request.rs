use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::AllowanceEntry;

/// A flat JSON object shape whose field count is checked against the raw
/// payload before it is accepted.
pub trait FlatShape {
    /// Wire names of every recognised field, in their required order.
    const FIELDS: &'static [&'static str];
}

/// A single taxpayer record submitted for calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRequest {
    #[serde(rename = "totalIncome")]
    pub total_income: Decimal,
    #[serde(rename = "wht")]
    pub withholding: Decimal,
    pub allowances: Vec<AllowanceEntry>,
}

impl TaxRequest {
    /// Top-level keys in the order the payload must present them.
    pub const KEYS: [&'static str; 3] = ["totalIncome", "wht", "allowances"];
}

/// The administrator payload for adjusting a configured deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionUpdate {
    pub amount: Decimal,
}

impl FlatShape for DeductionUpdate {
    const FIELDS: &'static [&'static str] = &["amount"];
}
