//! Command handling shared by the binary and the integration tests.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tax_core::calculations::{Money, TaxSchedule};
use tax_core::{
    DeductionRepository, DeductionSettings, KReceiptResponse, NewDeductionRecord,
    PersonalDeductionResponse, TaxService,
};
use tax_db_sqlite::SqliteRepository;
use tracing::{info, warn};

use crate::settings::AppSettings;

/// Result of one command: the JSON body to print and whether it is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Rejected(String),
}

impl Outcome {
    fn success<T: Serialize>(body: &T) -> Result<Self> {
        let json = serde_json::to_string(body).context("Failed to serialize response")?;
        Ok(Outcome::Success(json))
    }

    fn rejected(message: impl std::fmt::Display) -> Self {
        let message = message.to_string();
        warn!(%message, "request rejected");
        Outcome::Rejected(serde_json::json!({ "error": message }).to_string())
    }

    pub fn body(&self) -> &str {
        match self {
            Outcome::Success(body) | Outcome::Rejected(body) => body,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Success(_) => 0,
            Outcome::Rejected(_) => 1,
        }
    }
}

/// The running application: the service plus the store backing its settings.
pub struct App {
    service: TaxService,
    repo: Box<dyn DeductionRepository>,
}

impl App {
    /// Opens the configured store, seeds it on first run and loads the
    /// stored deductions into the settings.
    pub async fn start(settings: &AppSettings) -> Result<Self> {
        let repo = SqliteRepository::open(&settings.database)
            .await
            .with_context(|| {
                format!("Failed to open database '{}'", settings.database.connection_string)
            })?;

        let record = repo
            .ensure_deductions(NewDeductionRecord::from(&settings.deductions))
            .await
            .context("Failed to load stored deductions")?;
        let config = record.apply_to(settings.deductions);
        info!(
            personal_exemption = %config.personal_exemption,
            k_receipt_upper_limit = %config.k_receipt_upper_limit,
            "loaded deductions"
        );

        Ok(Self::new(
            TaxService::new(TaxSchedule::default(), DeductionSettings::new(config)),
            Box::new(repo),
        ))
    }

    pub fn new(
        service: TaxService,
        repo: Box<dyn DeductionRepository>,
    ) -> Self {
        Self { service, repo }
    }

    pub fn service(&self) -> &TaxService {
        &self.service
    }

    pub fn calculate(
        &self,
        raw: &str,
    ) -> Result<Outcome> {
        match self.service.calculate(raw) {
            Ok(response) => Outcome::success(&response),
            Err(e) => Ok(Outcome::rejected(e)),
        }
    }

    pub fn batch(
        &self,
        path: &Path,
    ) -> Result<Outcome> {
        let config = self.service.settings().snapshot();
        match tax_data::process_file(path, &config, self.service.schedule()) {
            Ok(response) => Outcome::success(&response),
            Err(e) => Ok(Outcome::rejected(e)),
        }
    }

    /// Validates and stores a new personal exemption, then applies it.
    ///
    /// The settings are left unchanged if the store fails.
    pub async fn update_personal_deduction(
        &self,
        raw: &str,
    ) -> Result<Outcome> {
        let proposed = match self.service.propose_personal_deduction(raw) {
            Ok(proposed) => proposed,
            Err(e) => return Ok(Outcome::rejected(e)),
        };

        let record = self
            .repo
            .update_personal_deduction(proposed.personal_exemption)
            .await
            .context("Failed to store personal deduction")?;
        let applied = record.apply_to(proposed);
        self.service.settings().replace(applied);

        Outcome::success(&PersonalDeductionResponse {
            personal_deduction: Money(applied.personal_exemption),
        })
    }

    /// Validates and stores a new k-receipt upper limit, then applies it.
    pub async fn update_k_receipt_limit(
        &self,
        raw: &str,
    ) -> Result<Outcome> {
        let proposed = match self.service.propose_k_receipt_limit(raw) {
            Ok(proposed) => proposed,
            Err(e) => return Ok(Outcome::rejected(e)),
        };

        let record = self
            .repo
            .update_k_receipt_deduction(proposed.k_receipt_upper_limit)
            .await
            .context("Failed to store k-receipt deduction")?;
        let applied = record.apply_to(proposed);
        self.service.settings().replace(applied);

        Outcome::success(&KReceiptResponse {
            k_receipt: Money(applied.k_receipt_upper_limit),
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tax_core::{DeductionConfig, DeductionRecord, RepositoryError};

    use super::*;

    /// Reads succeed with the default row; every write fails.
    struct ReadOnlyRepository;

    #[async_trait]
    impl DeductionRepository for ReadOnlyRepository {
        async fn ensure_deductions(
            &self,
            _defaults: NewDeductionRecord,
        ) -> Result<DeductionRecord, RepositoryError> {
            self.get_deductions().await
        }

        async fn get_deductions(&self) -> Result<DeductionRecord, RepositoryError> {
            Ok(DeductionRecord {
                id: 1,
                personal_deduction: dec!(60000),
                k_receipt_deduction: dec!(50000),
                updated_at: chrono::Utc::now(),
            })
        }

        async fn update_personal_deduction(
            &self,
            _amount: Decimal,
        ) -> Result<DeductionRecord, RepositoryError> {
            Err(RepositoryError::Database("attempt to write a readonly database".to_string()))
        }

        async fn update_k_receipt_deduction(
            &self,
            _amount: Decimal,
        ) -> Result<DeductionRecord, RepositoryError> {
            Err(RepositoryError::Database("attempt to write a readonly database".to_string()))
        }
    }

    fn read_only_app() -> App {
        App::new(TaxService::default(), Box::new(ReadOnlyRepository))
    }

    #[test]
    fn rejected_outcome_wraps_message() {
        let outcome = Outcome::rejected("wht must not be negative, got -1");

        assert_eq!(outcome.body(), r#"{"error":"wht must not be negative, got -1"}"#);
        assert_eq!(outcome.exit_code(), 1);
    }

    #[test]
    fn success_outcome_exits_zero() {
        let outcome = Outcome::success(&serde_json::json!({ "tax": 0 })).unwrap();

        assert_eq!(outcome.exit_code(), 0);
    }

    #[tokio::test]
    async fn failed_store_leaves_settings_unchanged() {
        let app = read_only_app();

        let personal = app.update_personal_deduction(r#"{"amount": 90000.0}"#).await;
        let k_receipt = app.update_k_receipt_limit(r#"{"amount": 90000.0}"#).await;

        assert!(personal.is_err());
        assert!(k_receipt.is_err());
        assert_eq!(app.service().settings().snapshot(), DeductionConfig::default());
    }

    #[tokio::test]
    async fn invalid_update_never_reaches_the_store() {
        let app = read_only_app();

        let outcome = app
            .update_personal_deduction(r#"{"amount": 10000.0}"#)
            .await
            .unwrap();

        assert_eq!(outcome.exit_code(), 1);
    }
}
