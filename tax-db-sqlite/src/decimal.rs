use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};
use tax_core::RepositoryError;

/// Reads a decimal column, accepting the INTEGER, REAL and TEXT storage
/// classes SQLite may have used for it.
pub fn get_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Decimal, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{}' not found: {}", column, e)))?;

    if value_ref.is_null() {
        return Err(RepositoryError::Database(format!(
            "Unexpected NULL in column '{}'",
            column
        )));
    }

    let type_name = value_ref.type_info().name().to_string();
    match type_name.as_str() {
        "INTEGER" => {
            let val: i64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!(
                    "Failed to get INTEGER from '{}': {}",
                    column, e
                ))
            })?;
            Ok(Decimal::from(val))
        }
        "REAL" => {
            let val: f64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get REAL from '{}': {}", column, e))
            })?;
            Decimal::try_from(val).map_err(|e| {
                RepositoryError::Database(format!("Failed to convert {} to Decimal: {}", val, e))
            })
        }
        "TEXT" => {
            let val: String = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get TEXT from '{}': {}", column, e))
            })?;
            val.trim().parse::<Decimal>().map_err(|e| {
                RepositoryError::Database(format!("Failed to parse '{}' as Decimal: {}", val, e))
            })
        }
        _ => Err(RepositoryError::Database(format!(
            "Unexpected type '{}' for column '{}'",
            type_name, column
        ))),
    }
}

/// Converts a Decimal to f64 for REAL storage.
pub fn decimal_to_f64(d: Decimal) -> Result<f64, RepositoryError> {
    d.to_f64()
        .ok_or_else(|| RepositoryError::Database(format!("{} does not fit in a REAL column", d)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

    use super::*;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        sqlx::query(
            "CREATE TABLE test_decimals (
                id INTEGER PRIMARY KEY,
                value
            )",
        )
        .execute(&pool)
        .await
        .expect("Failed to create test table");
        pool
    }

    async fn fetch_value(sql_literal: &str) -> Result<Decimal, RepositoryError> {
        let pool = setup_test_db().await;
        sqlx::query(&format!(
            "INSERT INTO test_decimals (id, value) VALUES (1, {})",
            sql_literal
        ))
        .execute(&pool)
        .await
        .expect("Failed to insert test data");

        let row = sqlx::query("SELECT value FROM test_decimals WHERE id = 1")
            .fetch_one(&pool)
            .await
            .expect("Failed to fetch row");

        get_decimal(&row, "value")
    }

    // get_decimal tests

    #[tokio::test]
    async fn test_get_decimal_from_integer() {
        assert_eq!(fetch_value("60000").await, Ok(dec!(60000)));
    }

    #[tokio::test]
    async fn test_get_decimal_from_real() {
        assert_eq!(fetch_value("70000.5").await, Ok(dec!(70000.5)));
    }

    #[tokio::test]
    async fn test_get_decimal_from_text() {
        assert_eq!(fetch_value("'50000.25'").await, Ok(dec!(50000.25)));
    }

    #[tokio::test]
    async fn test_get_decimal_from_unparseable_text() {
        assert!(matches!(
            fetch_value("'abc'").await,
            Err(RepositoryError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_get_decimal_from_null_is_an_error() {
        match fetch_value("NULL").await {
            Err(RepositoryError::Database(msg)) => assert!(msg.contains("NULL")),
            other => panic!("expected Database error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_decimal_unexpected_type() {
        match fetch_value("X'DEADBEEF'").await {
            Err(RepositoryError::Database(msg)) => assert!(msg.contains("Unexpected type")),
            other => panic!("expected Database error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_decimal_column_not_found() {
        let pool = setup_test_db().await;
        sqlx::query("INSERT INTO test_decimals (id, value) VALUES (1, 1)")
            .execute(&pool)
            .await
            .expect("Failed to insert test data");
        let row = sqlx::query("SELECT value FROM test_decimals WHERE id = 1")
            .fetch_one(&pool)
            .await
            .expect("Failed to fetch row");

        let result = get_decimal(&row, "missing");

        assert!(matches!(result, Err(RepositoryError::Database(msg)) if msg.contains("missing")));
    }

    // decimal_to_f64 tests

    #[test]
    fn test_decimal_to_f64_whole_amount() {
        assert_eq!(decimal_to_f64(dec!(100000)), Ok(100000.0));
    }

    #[test]
    fn test_decimal_to_f64_fraction() {
        assert_eq!(decimal_to_f64(dec!(0.5)), Ok(0.5));
    }
}
