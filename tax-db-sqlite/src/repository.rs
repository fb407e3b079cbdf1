use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use tax_core::db::DbConfig;
use tax_core::{DeductionRecord, DeductionRepository, NewDeductionRecord, RepositoryError};
use tracing::{debug, info};

use crate::decimal::{decimal_to_f64, get_decimal};

const IN_MEMORY: &str = ":memory:";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Opens `connection_string`, either a file path (created if missing),
    /// a `sqlite:` URL or `:memory:`.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(connection_string)
            .with_context(|| format!("Invalid SQLite connection string: {}", connection_string))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new();
        if is_in_memory(connection_string) {
            // Every connection to :memory: is its own database.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", connection_string))?;
        info!(%connection_string, "connected to SQLite");
        Ok(Self { pool })
    }

    /// Opens the store named by `config` and brings its schema up to date.
    pub async fn open(config: &DbConfig) -> Result<Self, RepositoryError> {
        let connection_string = config.require_sqlite()?;
        let repo = Self::connect(connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        Ok(repo)
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn lowest_id(&self) -> Result<i64, RepositoryError> {
        let id: Option<i64> = sqlx::query_scalar("SELECT MIN(id) FROM deductions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        id.ok_or(RepositoryError::NotFound)
    }

    async fn update_column(
        &self,
        column: DeductionColumn,
        amount: Decimal,
    ) -> Result<DeductionRecord, RepositoryError> {
        let id = self.lowest_id().await?;
        let sql = format!(
            "UPDATE deductions SET {} = ?, updated_at = ? WHERE id = ?",
            column.name()
        );

        let result = sqlx::query(&sql)
            .bind(decimal_to_f64(amount)?)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        debug!(id, column = column.name(), %amount, "updated deduction");
        self.get_deductions().await
    }
}

/// The adjustable columns. Never built from user input.
#[derive(Debug, Clone, Copy)]
enum DeductionColumn {
    Personal,
    KReceipt,
}

impl DeductionColumn {
    fn name(self) -> &'static str {
        match self {
            DeductionColumn::Personal => "personal_deduction",
            DeductionColumn::KReceipt => "k_receipt_deduction",
        }
    }
}

fn is_in_memory(connection_string: &str) -> bool {
    let trimmed = connection_string
        .strip_prefix("sqlite://")
        .or_else(|| connection_string.strip_prefix("sqlite:"))
        .unwrap_or(connection_string);
    trimmed == IN_MEMORY || trimmed.starts_with(":memory:?") || trimmed.contains("mode=memory")
}

fn row_to_deduction_record(row: &SqliteRow) -> Result<DeductionRecord, RepositoryError> {
    Ok(DeductionRecord {
        id: row
            .try_get("id")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        personal_deduction: get_decimal(row, "personal_deduction")?,
        k_receipt_deduction: get_decimal(row, "k_receipt_deduction")?,
        updated_at: row
            .try_get::<DateTime<Utc>, _>("updated_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get updated_at: {}", e)))?,
    })
}

#[async_trait]
impl DeductionRepository for SqliteRepository {
    async fn ensure_deductions(
        &self,
        defaults: NewDeductionRecord,
    ) -> Result<DeductionRecord, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM deductions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if count == 0 {
            let result = sqlx::query(
                "INSERT INTO deductions (personal_deduction, k_receipt_deduction, updated_at)
                 VALUES (?, ?, ?)",
            )
            .bind(decimal_to_f64(defaults.personal_deduction)?)
            .bind(decimal_to_f64(defaults.k_receipt_deduction)?)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

            info!(
                id = result.last_insert_rowid(),
                personal_deduction = %defaults.personal_deduction,
                k_receipt_deduction = %defaults.k_receipt_deduction,
                "seeded deductions row"
            );
        }

        self.get_deductions().await
    }

    async fn get_deductions(&self) -> Result<DeductionRecord, RepositoryError> {
        let id = self.lowest_id().await?;
        let row = sqlx::query(
            "SELECT id, personal_deduction, k_receipt_deduction, updated_at
             FROM deductions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?
        .ok_or(RepositoryError::NotFound)?;

        row_to_deduction_record(&row)
    }

    async fn update_personal_deduction(
        &self,
        amount: Decimal,
    ) -> Result<DeductionRecord, RepositoryError> {
        self.update_column(DeductionColumn::Personal, amount).await
    }

    async fn update_k_receipt_deduction(
        &self,
        amount: Decimal,
    ) -> Result<DeductionRecord, RepositoryError> {
        self.update_column(DeductionColumn::KReceipt, amount).await
    }
}
