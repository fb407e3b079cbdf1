//! Shared, adjustable deduction settings.

use std::sync::{PoisonError, RwLock};

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{ADMIN_DEDUCTION_CEILING, DeductionConfig, PERSONAL_EXEMPTION_FLOOR};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("personal deduction must be more than 10,000 and at most 100,000, got {0}")]
    PersonalExemptionOutOfRange(Decimal),

    #[error("k-receipt deduction must be more than 0 and at most 100,000, got {0}")]
    KReceiptLimitOutOfRange(Decimal),
}

/// Holder for the process-wide [`DeductionConfig`].
///
/// Readers take a [`snapshot`](Self::snapshot) once per computation; writers
/// validate first and replace the value under the write lock, so a reader
/// never observes a half-applied update.
#[derive(Debug, Default)]
pub struct DeductionSettings {
    current: RwLock<DeductionConfig>,
}

impl DeductionSettings {
    pub fn new(config: DeductionConfig) -> Self {
        Self {
            current: RwLock::new(config),
        }
    }

    pub fn snapshot(&self) -> DeductionConfig {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the personal exemption applied by default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PersonalExemptionOutOfRange`] unless
    /// `10,000 < amount <= 100,000`. The stored value is unchanged on error.
    pub fn set_personal_exemption(
        &self,
        amount: Decimal,
    ) -> Result<DeductionConfig, ConfigError> {
        check_personal_exemption(amount)?;
        Ok(self.update(|config| config.personal_exemption = amount))
    }

    /// The configuration [`set_personal_exemption`](Self::set_personal_exemption)
    /// would produce, without storing it.
    pub fn propose_personal_exemption(
        &self,
        amount: Decimal,
    ) -> Result<DeductionConfig, ConfigError> {
        check_personal_exemption(amount)?;
        Ok(DeductionConfig {
            personal_exemption: amount,
            ..self.snapshot()
        })
    }

    /// Sets the upper limit applied to k-receipt allowances.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::KReceiptLimitOutOfRange`] unless
    /// `0 < amount <= 100,000`.
    pub fn set_k_receipt_limit(
        &self,
        amount: Decimal,
    ) -> Result<DeductionConfig, ConfigError> {
        check_k_receipt_limit(amount)?;
        Ok(self.update(|config| config.k_receipt_upper_limit = amount))
    }

    /// The configuration [`set_k_receipt_limit`](Self::set_k_receipt_limit)
    /// would produce, without storing it.
    pub fn propose_k_receipt_limit(
        &self,
        amount: Decimal,
    ) -> Result<DeductionConfig, ConfigError> {
        check_k_receipt_limit(amount)?;
        Ok(DeductionConfig {
            k_receipt_upper_limit: amount,
            ..self.snapshot()
        })
    }

    /// Replaces the whole configuration, e.g. with values loaded from storage.
    pub fn replace(
        &self,
        config: DeductionConfig,
    ) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = config;
        info!(?config, "deduction settings replaced");
    }

    fn update(
        &self,
        apply: impl FnOnce(&mut DeductionConfig),
    ) -> DeductionConfig {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut *guard);
        let updated = *guard;
        drop(guard);

        info!(
            personal_exemption = %updated.personal_exemption,
            k_receipt_upper_limit = %updated.k_receipt_upper_limit,
            "deduction settings updated"
        );
        updated
    }
}

fn check_personal_exemption(amount: Decimal) -> Result<(), ConfigError> {
    if amount <= PERSONAL_EXEMPTION_FLOOR || amount > ADMIN_DEDUCTION_CEILING {
        warn!(%amount, "rejected personal deduction update");
        return Err(ConfigError::PersonalExemptionOutOfRange(amount));
    }
    Ok(())
}

fn check_k_receipt_limit(amount: Decimal) -> Result<(), ConfigError> {
    if amount <= Decimal::ZERO || amount > ADMIN_DEDUCTION_CEILING {
        warn!(%amount, "rejected k-receipt limit update");
        return Err(ConfigError::KReceiptLimitOutOfRange(amount));
    }
    Ok(())
}
