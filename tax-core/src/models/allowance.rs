use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The closed set of deduction categories a taxpayer may claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllowanceKind {
    #[serde(rename = "personal")]
    Personal,
    #[serde(rename = "donation")]
    Donation,
    #[serde(rename = "k-receipt")]
    KReceipt,
}

impl AllowanceKind {
    pub const ALL: [AllowanceKind; 3] = [Self::Personal, Self::Donation, Self::KReceipt];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Donation => "donation",
            Self::KReceipt => "k-receipt",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "personal" => Some(Self::Personal),
            "donation" => Some(Self::Donation),
            "k-receipt" => Some(Self::KReceipt),
            _ => None,
        }
    }
}

impl fmt::Display for AllowanceKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `{allowanceType, amount}` entry as submitted.
///
/// The type stays a raw string here so that an unrecognised tag surfaces as a
/// validation error from the normalizer rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceEntry {
    #[serde(rename = "allowanceType")]
    pub allowance_type: String,
    pub amount: Decimal,
}

impl AllowanceEntry {
    pub fn new(
        allowance_type: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            allowance_type: allowance_type.into(),
            amount,
        }
    }

    pub fn kind(&self) -> Option<AllowanceKind> {
        AllowanceKind::parse(&self.allowance_type)
    }
}
