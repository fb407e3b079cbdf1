//! Batch tax computation from CSV.
//!
//! ## CSV Format
//!
//! The header must be exactly the three columns below, in this order.
//!
//! | Column        | Type    | Notes                                   |
//! |---------------|---------|-----------------------------------------|
//! | `totalIncome` | decimal | e.g. `500000.0`                         |
//! | `wht`         | decimal | tax already withheld                    |
//! | `donation`    | decimal | used as the donation total as is        |
//!
//! Every row gets the configured personal exemption and no k-receipt
//! allowance. Any bad row fails the whole batch.
//!
//! Amounts are plain decimals: an optional sign, digits and an optional
//! fraction. No amount may be negative and `wht` may not exceed
//! `totalIncome`.
//!
//! ```csv
//! totalIncome,wht,donation
//! 500000.0,0.0,0.0
//! 600000.0,40000.0,20000.0
//! ```

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use tax_core::calculations::{
    AllowanceTotals, TaxRequestError, TaxSchedule, compute_tax, validate_amounts,
};
use tax_core::{BatchTaxResponse, DeductionConfig, IncomeTaxRecord};
use thiserror::Error;
use tracing::{info, warn};

/// Required header, in order.
pub const HEADER: [&str; 3] = ["totalIncome", "wht", "donation"];

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing header, expected '{}'", HEADER.join(","))]
    MissingHeader,

    #[error("invalid header '{found}', expected '{}'", HEADER.join(","))]
    HeaderMismatch { found: String },

    /// `row` is 1-based and counts data rows only.
    #[error("data row {row}: expected {expected} fields, found {found}")]
    FieldCount {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("data row {row}: invalid {column} value '{value}'")]
    InvalidField {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("data row {row}: {column} must not be negative, got {value}")]
    NegativeField {
        row: usize,
        column: &'static str,
        value: Decimal,
    },

    #[error("data row {row}: {source}")]
    Amounts {
        row: usize,
        #[source]
        source: TaxRequestError,
    },

    #[error("'{0}' is not a .csv file")]
    NotCsv(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One parsed data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRow {
    pub total_income: Decimal,
    pub withholding: Decimal,
    pub donation: Decimal,
}

/// Reads and validates every row of `reader`.
///
/// # Errors
///
/// Returns the first [`BatchError`]; no rows are returned on failure.
pub fn parse<R: Read>(reader: R) -> Result<Vec<BatchRow>, BatchError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true) // field counts are checked per row below
        .from_reader(reader);

    check_header(csv_reader.headers()?)?;

    csv_reader
        .records()
        .enumerate()
        .map(|(idx, record)| convert_record(&record?, idx + 1))
        .collect()
}

/// Parses `reader` and computes tax for every row, in input order.
pub fn process<R: Read>(
    reader: R,
    config: &DeductionConfig,
    schedule: &TaxSchedule,
) -> Result<BatchTaxResponse, BatchError> {
    let rows = parse(reader)?;

    let taxes = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let totals = AllowanceTotals::defaults(config).with_donation(row.donation);
            let result = compute_tax(row.total_income, row.withholding, &totals, schedule)
                .map_err(|source| BatchError::Amounts {
                    row: idx + 1,
                    source,
                })?;
            Ok(IncomeTaxRecord::new(row.total_income, &result))
        })
        .collect::<Result<Vec<IncomeTaxRecord>, BatchError>>()?;

    info!(rows = taxes.len(), "processed tax batch");
    Ok(BatchTaxResponse { taxes })
}

/// Opens `path` and delegates to [`process`]. The file must have a `.csv`
/// extension.
pub fn process_file(
    path: &Path,
    config: &DeductionConfig,
    schedule: &TaxSchedule,
) -> Result<BatchTaxResponse, BatchError> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        warn!(path = %path.display(), "rejected batch file without .csv extension");
        return Err(BatchError::NotCsv(path.to_path_buf()));
    }

    let file = File::open(path)?;
    process(file, config, schedule)
}

fn check_header(headers: &csv::StringRecord) -> Result<(), BatchError> {
    if headers.is_empty() {
        return Err(BatchError::MissingHeader);
    }
    if headers.len() != HEADER.len() || headers.iter().zip(HEADER).any(|(found, want)| found != want) {
        let found = headers.iter().collect::<Vec<_>>().join(",");
        warn!(%found, "rejected batch header");
        return Err(BatchError::HeaderMismatch { found });
    }
    Ok(())
}

fn convert_record(
    record: &csv::StringRecord,
    row: usize,
) -> Result<BatchRow, BatchError> {
    if record.len() != HEADER.len() {
        return Err(BatchError::FieldCount {
            row,
            expected: HEADER.len(),
            found: record.len(),
        });
    }

    let field = |index: usize| -> Result<Decimal, BatchError> {
        let column = HEADER[index];
        let value = &record[index];
        let amount = if is_plain_decimal(value) {
            value.parse::<Decimal>().ok()
        } else {
            None
        };
        match amount {
            Some(amount) if amount < Decimal::ZERO => {
                warn!(row, column, %amount, "rejected negative batch field");
                Err(BatchError::NegativeField {
                    row,
                    column,
                    value: amount,
                })
            }
            Some(amount) => Ok(amount),
            None => {
                warn!(row, column, %value, "rejected batch field");
                Err(BatchError::InvalidField {
                    row,
                    column,
                    value: value.to_string(),
                })
            }
        }
    };

    let parsed = BatchRow {
        total_income: field(0)?,
        withholding: field(1)?,
        donation: field(2)?,
    };
    validate_amounts(parsed.total_income, parsed.withholding)
        .map_err(|source| BatchError::Amounts { row, source })?;
    Ok(parsed)
}

/// Optional sign, digits, optional `.` and fraction digits.
fn is_plain_decimal(value: &str) -> bool {
    let unsigned = value.strip_prefix(&['+', '-'][..]).unwrap_or(value);
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    (!whole.is_empty() || !fraction.is_empty())
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const VALID_CSV: &str = "\
totalIncome,wht,donation
500000.0,0.0,0.0
600000.0,40000.0,20000.0
750000.0,50000.0,15000.0
";

    fn run(input: &str) -> Result<BatchTaxResponse, BatchError> {
        process(input.as_bytes(), &DeductionConfig::default(), &TaxSchedule::default())
    }

    // =========================================================================
    // parse tests
    // =========================================================================

    #[test]
    fn parse_reads_rows_in_order() {
        let rows = parse(VALID_CSV.as_bytes()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[1],
            BatchRow {
                total_income: dec!(600000),
                withholding: dec!(40000),
                donation: dec!(20000),
            }
        );
    }

    #[test]
    fn parse_trims_whitespace() {
        let rows = parse("totalIncome,wht,donation\n 1000 , 0 , 5 \n".as_bytes()).unwrap();

        assert_eq!(rows[0].donation, dec!(5));
    }

    #[test]
    fn header_only_yields_no_rows() {
        let rows = parse("totalIncome,wht,donation\n".as_bytes()).unwrap();

        assert!(rows.is_empty());
    }

    #[test]
    fn empty_input_is_missing_header() {
        assert!(matches!(parse("".as_bytes()), Err(BatchError::MissingHeader)));
    }

    #[test]
    fn reordered_header_is_rejected() {
        let result = parse("wht,totalIncome,donation\n0,1,0\n".as_bytes());

        assert!(matches!(
            result,
            Err(BatchError::HeaderMismatch { found }) if found == "wht,totalIncome,donation"
        ));
    }

    #[test]
    fn extra_header_column_is_rejected() {
        let result = parse("totalIncome,wht,donation,kReceipt\n".as_bytes());

        assert!(matches!(result, Err(BatchError::HeaderMismatch { .. })));
    }

    #[test]
    fn short_row_reports_one_based_index() {
        let result = parse("totalIncome,wht,donation\n1,0,0\n2,0\n".as_bytes());

        assert!(matches!(
            result,
            Err(BatchError::FieldCount { row: 2, expected: 3, found: 2 })
        ));
    }

    #[test]
    fn non_numeric_field_names_row_and_column() {
        let result = parse("totalIncome,wht,donation\n500000.0,abc,0.0\n".as_bytes());

        match result {
            Err(err @ BatchError::InvalidField { .. }) => {
                assert_eq!(err.to_string(), "data row 1: invalid wht value 'abc'");
            }
            other => panic!("expected InvalidField, got {other:?}"),
        }
    }

    #[test]
    fn digit_separators_are_rejected() {
        let result = parse("totalIncome,wht,donation\n1_000,0,0\n".as_bytes());

        assert!(matches!(
            result,
            Err(BatchError::InvalidField { row: 1, column: "totalIncome", value }) if value == "1_000"
        ));
    }

    #[test]
    fn plain_decimal_grammar() {
        for accepted in ["0", "500000.0", "+12", "-3.5", ".5", "5."] {
            assert!(is_plain_decimal(accepted), "{accepted} should be accepted");
        }
        for rejected in ["", ".", "-", "1_000", "1e5", "inf", "NaN", "0x10", "1.2.3", "1,000"] {
            assert!(!is_plain_decimal(rejected), "{rejected} should be rejected");
        }
    }

    #[test]
    fn negative_fields_name_row_and_column() {
        let cases = [
            ("-500000,0,0", "totalIncome"),
            ("500000,-1000,0", "wht"),
            ("500000,0,-300000", "donation"),
        ];

        for (line, expected_column) in cases {
            let input = format!("totalIncome,wht,donation\n500000,0,0\n{line}\n");
            match parse(input.as_bytes()) {
                Err(BatchError::NegativeField { row, column, .. }) => {
                    assert_eq!((row, column), (2, expected_column));
                }
                other => panic!("expected NegativeField for {line}, got {other:?}"),
            }
        }
    }

    #[test]
    fn all_negative_row_is_rejected_on_first_column() {
        let result = run("totalIncome,wht,donation\n-500000,-1000,-300000\n");

        match result {
            Err(err @ BatchError::NegativeField { .. }) => {
                assert_eq!(
                    err.to_string(),
                    "data row 1: totalIncome must not be negative, got -500000"
                );
            }
            other => panic!("expected NegativeField, got {other:?}"),
        }
    }

    #[test]
    fn withholding_above_income_is_rejected() {
        let result = parse("totalIncome,wht,donation\n1000,2000,0\n".as_bytes());

        assert!(matches!(
            result,
            Err(BatchError::Amounts {
                row: 1,
                source: TaxRequestError::WithholdingExceedsIncome { .. },
            })
        ));
    }

    #[test]
    fn extreme_amounts_are_errors_not_panics() {
        let min = Decimal::MIN.to_string();
        let max = Decimal::MAX.to_string();
        let rows = [
            format!("{min},0,0"),
            format!("500000,{min},0"),
            format!("500000,0,{min}"),
            format!("500000,0,{max}"),
            format!("{max},{max},{max}"),
        ];

        for line in rows {
            let input = format!("totalIncome,wht,donation\n{line}\n");
            let result = run(&input);
            assert!(result.is_err(), "{line} should be rejected, got {result:?}");
        }
    }

    #[test]
    fn overflowing_donation_reports_row() {
        let input = format!("totalIncome,wht,donation\n500000,0,0\n500000,0,{}\n", Decimal::MAX);

        let result = run(&input);

        assert!(matches!(
            result,
            Err(BatchError::Amounts { row: 2, source: TaxRequestError::Overflow })
        ));
    }

    #[test]
    fn maximum_income_is_computed() {
        let input = format!("totalIncome,wht,donation\n{},0,0\n", Decimal::MAX);

        let response = run(&input).unwrap();

        assert_eq!(response.taxes[0].total_income.amount(), Decimal::MAX);
    }

    // =========================================================================
    // process tests
    // =========================================================================

    #[test]
    fn process_computes_every_row() {
        let response = run(VALID_CSV).unwrap();

        let taxes: Vec<_> = response
            .taxes
            .iter()
            .map(|t| (t.total_income.amount(), t.tax.amount(), t.tax_refund.amount()))
            .collect();
        assert_eq!(
            taxes,
            vec![
                (dec!(500000), dec!(29000), dec!(0)),
                (dec!(600000), dec!(0), dec!(2000)),
                (dec!(750000), dec!(11250), dec!(0)),
            ]
        );
    }

    #[test]
    fn process_does_not_cap_donation() {
        let response = run("totalIncome,wht,donation\n500000,0,300000\n").unwrap();

        // 500000 - 60000 - 300000 = 140000, inside the zero-rate bracket
        assert_eq!(response.taxes[0].tax.amount(), dec!(0));
    }

    #[test]
    fn process_uses_configured_personal_exemption() {
        let config = DeductionConfig {
            personal_exemption: dec!(100000),
            ..DeductionConfig::default()
        };

        let response = process(
            "totalIncome,wht,donation\n500000,0,0\n".as_bytes(),
            &config,
            &TaxSchedule::default(),
        )
        .unwrap();

        assert_eq!(response.taxes[0].tax.amount(), dec!(25000));
    }

    #[test]
    fn process_is_all_or_nothing() {
        let result = run("totalIncome,wht,donation\n500000,0,0\n600000,x,0\n");

        assert!(matches!(result, Err(BatchError::InvalidField { row: 2, .. })));
    }

    #[test]
    fn process_file_requires_csv_extension() {
        let result = process_file(
            Path::new("taxes.txt"),
            &DeductionConfig::default(),
            &TaxSchedule::default(),
        );

        assert!(matches!(result, Err(BatchError::NotCsv(path)) if path == Path::new("taxes.txt")));
    }

    #[test]
    fn process_file_reports_missing_file() {
        let result = process_file(
            Path::new("does-not-exist.csv"),
            &DeductionConfig::default(),
            &TaxSchedule::default(),
        );

        assert!(matches!(result, Err(BatchError::Io(_))));
    }
}
