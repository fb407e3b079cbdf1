use rust_decimal::Decimal;
use serde::Serialize;

use crate::calculations::common::Money;
use crate::calculations::income_tax::IncomeTaxResult;

/// Tax contributed by one bracket of the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxLevel {
    pub level: String,
    pub tax: Money,
}

/// Response to a single calculation request.
///
/// `taxRefund` is omitted unless positive and `taxLevel` is omitted unless
/// tax is payable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxResponse {
    pub tax: Money,
    #[serde(rename = "taxRefund", skip_serializing_if = "Money::is_not_positive")]
    pub tax_refund: Money,
    #[serde(rename = "taxLevel", skip_serializing_if = "Vec::is_empty")]
    pub tax_level: Vec<TaxLevel>,
}

impl From<IncomeTaxResult> for TaxResponse {
    fn from(result: IncomeTaxResult) -> Self {
        let tax_level = if result.tax_payable > Decimal::ZERO {
            result
                .breakdown
                .into_iter()
                .map(|bracket| TaxLevel {
                    level: bracket.level,
                    tax: Money(bracket.tax),
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            tax: Money(result.tax_payable),
            tax_refund: Money(result.tax_refund),
            tax_level,
        }
    }
}

/// One row of a batch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncomeTaxRecord {
    #[serde(rename = "totalIncome")]
    pub total_income: Money,
    pub tax: Money,
    #[serde(rename = "taxRefund", skip_serializing_if = "Money::is_not_positive")]
    pub tax_refund: Money,
}

impl IncomeTaxRecord {
    pub fn new(
        total_income: Decimal,
        result: &IncomeTaxResult,
    ) -> Self {
        Self {
            total_income: Money(total_income),
            tax: Money(result.tax_payable),
            tax_refund: Money(result.tax_refund),
        }
    }
}

/// Response to a batch submission, rows in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchTaxResponse {
    pub taxes: Vec<IncomeTaxRecord>,
}

/// Echo of an accepted personal exemption update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PersonalDeductionResponse {
    #[serde(rename = "personalDeduction")]
    pub personal_deduction: Money,
}

/// Echo of an accepted k-receipt upper limit update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KReceiptResponse {
    #[serde(rename = "kReceipt")]
    pub k_receipt: Money,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calculations::schedule::BracketTax;

    #[test]
    fn refund_and_levels_are_omitted_when_empty() {
        let response = TaxResponse {
            tax: Money::ZERO,
            tax_refund: Money::ZERO,
            tax_level: Vec::new(),
        };

        assert_eq!(serde_json::to_string(&response).unwrap(), r#"{"tax":0.0}"#);
    }

    #[test]
    fn levels_are_listed_only_when_tax_is_payable() {
        let result = IncomeTaxResult {
            taxable_income: dec!(380000),
            gross_tax: dec!(23000),
            tax_payable: dec!(23000),
            tax_refund: dec!(0),
            breakdown: vec![
                BracketTax {
                    level: "0-150,000".to_string(),
                    tax: dec!(0),
                },
                BracketTax {
                    level: "150,001-500,000".to_string(),
                    tax: dec!(23000),
                },
            ],
        };

        let response = TaxResponse::from(result);

        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"tax":23000.0,"taxLevel":[{"level":"0-150,000","tax":0.0},{"level":"150,001-500,000","tax":23000.0}]}"#
        );
    }

    #[test]
    fn refund_only_response_has_no_levels() {
        let result = IncomeTaxResult {
            taxable_income: dec!(340000),
            gross_tax: dec!(19000),
            tax_payable: dec!(0),
            tax_refund: dec!(61000),
            breakdown: Vec::new(),
        };

        let response = TaxResponse::from(result);

        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"tax":0.0,"taxRefund":61000.0}"#
        );
    }

    #[test]
    fn batch_record_keeps_wire_names() {
        let response = BatchTaxResponse {
            taxes: vec![IncomeTaxRecord {
                total_income: Money(dec!(500000)),
                tax: Money::ZERO,
                tax_refund: Money(dec!(1000)),
            }],
        };

        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"taxes":[{"totalIncome":500000.0,"tax":0.0,"taxRefund":1000.0}]}"#
        );
    }
}
