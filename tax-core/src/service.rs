//! Request handling on top of the calculation engine.
//!
//! [`TaxService`] takes raw JSON bodies, runs the structural checks, the
//! typed parse and the range checks in a fixed order, and returns the
//! response model ready for serialization.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::calculations::{
    AllowanceError, Money, TaxRequestError, TaxSchedule, compute_tax, normalize_allowances,
    validate_amounts,
};
use crate::models::{
    DeductionConfig, DeductionUpdate, FlatShape, KReceiptResponse, PersonalDeductionResponse, TaxRequest,
    TaxResponse,
};
use crate::settings::{ConfigError, DeductionSettings};
use crate::validation::{self, StructuralError};

/// Keys that may appear at most once within one object of a tax request.
pub const DUPLICATE_MARKERS: [&str; 2] = ["allowanceType", "amount"];

/// Every way a request can be rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("invalid request format: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    Request(#[from] TaxRequestError),

    #[error(transparent)]
    Allowance(#[from] AllowanceError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Entry point for single requests and administrator updates.
#[derive(Debug, Default)]
pub struct TaxService {
    schedule: TaxSchedule,
    settings: DeductionSettings,
}

impl TaxService {
    pub fn new(
        schedule: TaxSchedule,
        settings: DeductionSettings,
    ) -> Self {
        Self { schedule, settings }
    }

    pub fn schedule(&self) -> &TaxSchedule {
        &self.schedule
    }

    pub fn settings(&self) -> &DeductionSettings {
        &self.settings
    }

    /// Computes tax for one JSON request body.
    ///
    /// Checks run in this order and the first failure is returned:
    /// duplicate markers, duplicate keys, key count, key order, typed parse,
    /// amount ranges, allowances.
    pub fn calculate(
        &self,
        raw: &str,
    ) -> Result<TaxResponse, TaxError> {
        let keys = validation::scan_keys(raw)?;
        keys.check_no_duplicate_marker(&DUPLICATE_MARKERS)?;
        keys.check_no_duplicate_keys()?;
        keys.check_key_count(TaxRequest::KEYS.len())?;
        keys.check_order(&TaxRequest::KEYS)?;

        let request: TaxRequest = parse_typed(raw)?;
        validate_amounts(request.total_income, request.withholding)?;

        let config = self.settings.snapshot();
        let totals = normalize_allowances(&request.allowances, &config)?;
        let result = compute_tax(
            request.total_income,
            request.withholding,
            &totals,
            &self.schedule,
        )?;

        Ok(TaxResponse::from(result))
    }

    /// Validates an `{"amount": n}` body and makes it the personal exemption.
    pub fn update_personal_deduction(
        &self,
        raw: &str,
    ) -> Result<PersonalDeductionResponse, TaxError> {
        let amount = parse_deduction_update(raw)?;
        let updated = self.settings.set_personal_exemption(amount)?;

        Ok(PersonalDeductionResponse {
            personal_deduction: Money(updated.personal_exemption),
        })
    }

    /// Validates an `{"amount": n}` body and makes it the k-receipt limit.
    pub fn update_k_receipt_limit(
        &self,
        raw: &str,
    ) -> Result<KReceiptResponse, TaxError> {
        let amount = parse_deduction_update(raw)?;
        let updated = self.settings.set_k_receipt_limit(amount)?;

        Ok(KReceiptResponse {
            k_receipt: Money(updated.k_receipt_upper_limit),
        })
    }

    /// Validates an `{"amount": n}` body and returns the configuration with
    /// that personal exemption, leaving the settings unchanged.
    pub fn propose_personal_deduction(
        &self,
        raw: &str,
    ) -> Result<DeductionConfig, TaxError> {
        let amount = parse_deduction_update(raw)?;
        Ok(self.settings.propose_personal_exemption(amount)?)
    }

    /// As [`propose_personal_deduction`](Self::propose_personal_deduction),
    /// for the k-receipt limit.
    pub fn propose_k_receipt_limit(
        &self,
        raw: &str,
    ) -> Result<DeductionConfig, TaxError> {
        let amount = parse_deduction_update(raw)?;
        Ok(self.settings.propose_k_receipt_limit(amount)?)
    }
}

/// Structural checks and typed parse of an administrator body.
///
/// The range is not checked here; each setting applies its own.
pub fn parse_deduction_update(raw: &str) -> Result<Decimal, TaxError> {
    validation::check_not_empty(raw)?;
    let keys = validation::scan_keys(raw)?;
    keys.check_key_count(DeductionUpdate::FIELDS.len())?;
    keys.check_order(DeductionUpdate::FIELDS)?;

    let update: DeductionUpdate = parse_typed(raw)?;
    keys.match_field_count::<DeductionUpdate>()?;

    debug!(amount = %update.amount, "parsed deduction update");
    Ok(update.amount)
}

fn parse_typed<T: DeserializeOwned>(raw: &str) -> Result<T, TaxError> {
    serde_json::from_str(raw).map_err(|e| TaxError::InvalidFormat(e.to_string()))
}
