//! End-to-end tests of the command layer against an in-memory or temporary
//! SQLite store.

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use tax_cli::app::App;
use tax_cli::settings::AppSettings;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../tax-data/test-data")
        .join(name)
}

fn file_settings(name: &str) -> (AppSettings, PathBuf) {
    let path = std::env::temp_dir().join(format!("tax-cli-{}-{}.db", name, std::process::id()));
    let _ = std::fs::remove_file(&path);
    let mut settings = AppSettings::default();
    settings.database.connection_string = path.display().to_string();
    (settings, path)
}

#[tokio::test]
async fn calculate_prints_levels_for_payable_tax() {
    let app = App::start(&AppSettings::default()).await.unwrap();

    let outcome = app
        .calculate(
            r#"{"totalIncome": 500000.0, "wht": 0.0, "allowances": [
                {"allowanceType": "k-receipt", "amount": 5000.0}
            ]}"#,
        )
        .unwrap();

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(
        outcome.body(),
        concat!(
            r#"{"tax":28500.0,"taxLevel":["#,
            r#"{"level":"0-150,000","tax":0.0},"#,
            r#"{"level":"150,001-500,000","tax":28500.0},"#,
            r#"{"level":"500,001-1,000,000","tax":0.0},"#,
            r#"{"level":"1,000,001-2,000,000","tax":0.0},"#,
            r#"{"level":"2,000,001 ขึ้นไป","tax":0.0}"#,
            r#"]}"#
        )
    );
}

#[tokio::test]
async fn calculate_rejects_withholding_above_income() {
    let app = App::start(&AppSettings::default()).await.unwrap();

    let outcome = app
        .calculate(r#"{"totalIncome": 1000.0, "wht": 2000.0, "allowances": []}"#)
        .unwrap();

    assert_eq!(outcome.exit_code(), 1);
    assert!(outcome.body().starts_with(r#"{"error":"#));
}

#[tokio::test]
async fn batch_renders_every_row() {
    let app = App::start(&AppSettings::default()).await.unwrap();

    let outcome = app.batch(&fixture("taxes.csv")).unwrap();

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(
        outcome.body(),
        concat!(
            r#"{"taxes":["#,
            r#"{"totalIncome":500000.0,"tax":29000.0},"#,
            r#"{"totalIncome":600000.0,"tax":0.0,"taxRefund":2000.0},"#,
            r#"{"totalIncome":750000.0,"tax":11250.0}"#,
            r#"]}"#
        )
    );
}

#[tokio::test]
async fn batch_with_bad_row_is_rejected() {
    let app = App::start(&AppSettings::default()).await.unwrap();

    let outcome = app.batch(&fixture("bad_wht.csv")).unwrap();

    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn personal_deduction_update_changes_later_calculations() {
    let app = App::start(&AppSettings::default()).await.unwrap();

    let update = app
        .update_personal_deduction(r#"{"amount": 100000.0}"#)
        .await
        .unwrap();
    let outcome = app
        .calculate(r#"{"totalIncome": 500000.0, "wht": 0.0, "allowances": []}"#)
        .unwrap();

    assert_eq!(update.body(), r#"{"personalDeduction":100000.0}"#);
    assert!(outcome.body().starts_with(r#"{"tax":25000.0,"#));
}

#[tokio::test]
async fn out_of_range_update_is_rejected_and_not_applied() {
    let app = App::start(&AppSettings::default()).await.unwrap();

    let outcome = app
        .update_personal_deduction(r#"{"amount": 10000.0}"#)
        .await
        .unwrap();

    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(
        app.service().settings().snapshot().personal_exemption,
        dec!(60000)
    );
}

#[tokio::test]
async fn updates_survive_restart() {
    let (settings, path) = file_settings("restart");

    {
        let app = App::start(&settings).await.unwrap();
        let outcome = app
            .update_k_receipt_limit(r#"{"amount": 70000.0}"#)
            .await
            .unwrap();
        assert_eq!(outcome.body(), r#"{"kReceipt":70000.0}"#);
    }

    let app = App::start(&settings).await.unwrap();
    let config = app.service().settings().snapshot();

    assert_eq!(config.k_receipt_upper_limit, dec!(70000));
    assert_eq!(config.personal_exemption, dec!(60000));
    let _ = std::fs::remove_file(&path);
}
