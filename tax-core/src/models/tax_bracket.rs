use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Suffix used for the label of the unbounded top bracket ("and above").
const OPEN_ENDED_SUFFIX: &str = "ขึ้นไป";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Human-readable income range, e.g. `150,001-500,000`.
    pub level: String,
    pub min_income: Decimal,
    pub max_income: Option<Decimal>,
    pub tax_rate: Decimal,
}

impl TaxBracket {
    /// Builds a bracket covering `[min_income, max_income)` and derives its
    /// level label from the bounds.
    pub fn new(
        min_income: Decimal,
        max_income: Option<Decimal>,
        tax_rate: Decimal,
    ) -> Self {
        Self {
            level: level_label(min_income, max_income),
            min_income,
            max_income,
            tax_rate,
        }
    }
}

/// Labels are written the way income ranges appear on the tax form: the
/// first whole unit above the lower bound, up to and including the upper one.
fn level_label(
    min_income: Decimal,
    max_income: Option<Decimal>,
) -> String {
    let from = if min_income.is_zero() {
        min_income
    } else {
        min_income + Decimal::ONE
    };

    match max_income {
        Some(max) => format!("{}-{}", group_thousands(from), group_thousands(max)),
        None => format!("{} {OPEN_ENDED_SUFFIX}", group_thousands(from)),
    }
}

fn group_thousands(value: Decimal) -> String {
    let text = value.normalize().to_string();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn first_bracket_label_starts_at_zero() {
        let bracket = TaxBracket::new(dec!(0), Some(dec!(150000)), dec!(0));

        assert_eq!(bracket.level, "0-150,000");
    }

    #[test]
    fn middle_bracket_label_starts_one_above_lower_bound() {
        let bracket = TaxBracket::new(dec!(500000), Some(dec!(1000000)), dec!(0.15));

        assert_eq!(bracket.level, "500,001-1,000,000");
    }

    #[test]
    fn open_ended_bracket_label_uses_suffix() {
        let bracket = TaxBracket::new(dec!(2000000), None, dec!(0.35));

        assert_eq!(bracket.level, "2,000,001 ขึ้นไป");
    }

    #[test]
    fn group_thousands_handles_short_and_fractional_values() {
        assert_eq!(group_thousands(dec!(999)), "999");
        assert_eq!(group_thousands(dec!(1000)), "1,000");
        assert_eq!(group_thousands(dec!(1234567.50)), "1,234,567.5");
    }
}
