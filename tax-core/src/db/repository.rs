use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{DeductionRecord, NewDeductionRecord};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Persistent storage for the adjustable deduction values.
///
/// Storage holds a single logical row. Implementations always read and
/// write the row with the lowest id.
#[async_trait]
pub trait DeductionRepository: Send + Sync {
    /// Returns the stored row, inserting `defaults` first if the table is empty.
    async fn ensure_deductions(
        &self,
        defaults: NewDeductionRecord,
    ) -> Result<DeductionRecord, RepositoryError>;

    async fn get_deductions(&self) -> Result<DeductionRecord, RepositoryError>;

    async fn update_personal_deduction(
        &self,
        amount: Decimal,
    ) -> Result<DeductionRecord, RepositoryError>;

    async fn update_k_receipt_deduction(
        &self,
        amount: Decimal,
    ) -> Result<DeductionRecord, RepositoryError>;
}
