//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;

use kosh_core::models::SubscriptionStatus;
use kosh_core::{CoreConfig, CsvColumnMap, Database};

use crate::commands::{self, resolve_account, truncate};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

/// Write a statement CSV to a temp file and import it
fn import_fixture(db: &Database, account: &str, csv: &str) {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(csv.as_bytes()).unwrap();

    commands::cmd_import(
        db,
        &CoreConfig::default(),
        file.path(),
        account,
        "auto",
        false,
        CsvColumnMap::default(),
    )
    .unwrap();
}

const MONTHLY_NETFLIX: &str = "Date,Description,Amount\n\
    2024-01-05,NETFLIX.COM,-15.99\n\
    2024-02-05,NETFLIX.COM,-15.99\n\
    2024-03-05,NETFLIX.COM,-15.99\n\
    2024-04-05,NETFLIX.COM,-15.99\n";

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a very long merchant name", 10), "a very ...");
}

#[test]
fn test_truncate_multibyte() {
    // Devanagari merchant names must cut on a char boundary, not a byte one
    assert_eq!(truncate("स्विगी इंस्टामार्ट बेंगलुरु", 10), "स्विगी ...");
    assert_eq!(truncate("कोष", 10), "कोष");
}

#[test]
fn test_cmd_import_csv() {
    let db = setup_test_db();
    import_fixture(&db, "hdfc", MONTHLY_NETFLIX);

    let account = resolve_account(&db, "hdfc").unwrap();
    assert_eq!(db.count_transactions(Some(account)).unwrap(), 4);
}

#[test]
fn test_cmd_import_skips_duplicates_on_reimport() {
    let db = setup_test_db();
    import_fixture(&db, "hdfc", MONTHLY_NETFLIX);
    import_fixture(&db, "hdfc", MONTHLY_NETFLIX);

    let account = resolve_account(&db, "hdfc").unwrap();
    assert_eq!(db.count_transactions(Some(account)).unwrap(), 4);
}

#[test]
fn test_resolve_account_is_case_insensitive() {
    let db = setup_test_db();
    let id = db.upsert_account("HDFC Savings", None, None).unwrap();

    assert_eq!(resolve_account(&db, "hdfc savings").unwrap(), id);
    assert!(resolve_account(&db, "missing").is_err());
}

#[test]
fn test_cmd_detect_saves_subscriptions() {
    let db = setup_test_db();
    import_fixture(&db, "hdfc", MONTHLY_NETFLIX);

    commands::cmd_detect(&db, &CoreConfig::default(), Some("hdfc"), false).unwrap();

    let subs = db.list_subscriptions(None).unwrap();
    assert_eq!(subs.len(), 1);
    let name = db
        .get_merchant(subs[0].merchant_id)
        .unwrap()
        .unwrap()
        .normalized_name;
    assert_eq!(name, "Netflix");
}

#[test]
fn test_cmd_detect_dry_run_saves_nothing() {
    let db = setup_test_db();
    import_fixture(&db, "hdfc", MONTHLY_NETFLIX);

    commands::cmd_detect(&db, &CoreConfig::default(), None, true).unwrap();
    assert!(db.list_subscriptions(None).unwrap().is_empty());
}

#[test]
fn test_cmd_subscriptions_lifecycle() {
    let db = setup_test_db();
    import_fixture(&db, "hdfc", MONTHLY_NETFLIX);
    commands::cmd_detect(&db, &CoreConfig::default(), None, false).unwrap();

    let sub_id = db.list_subscriptions(None).unwrap()[0].id;

    commands::cmd_subscriptions_confirm(&db, sub_id).unwrap();
    commands::cmd_subscriptions_set_status(&db, sub_id, SubscriptionStatus::Paused).unwrap();

    let sub = db.get_subscription(sub_id).unwrap().unwrap();
    assert!(sub.is_confirmed);
    assert_eq!(sub.status, SubscriptionStatus::Paused);

    commands::cmd_subscriptions_delete(&db, sub_id).unwrap();
    assert!(db.get_subscription(sub_id).unwrap().is_none());
}

#[test]
fn test_cmd_merchants_merge_rejects_empty_sources() {
    let db = setup_test_db();
    let id = db.resolve_or_create_merchant("AMAZON.COM", None).unwrap();
    assert!(commands::cmd_merchants_merge(&db, id, &[]).is_err());
}

#[test]
fn test_cmd_export_writes_csv() {
    let db = setup_test_db();
    import_fixture(&db, "hdfc", MONTHLY_NETFLIX);

    let out = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    commands::cmd_export(&db, Some(out.path()), Some("2024-02-01"), None, Some("hdfc")).unwrap();

    let content = std::fs::read_to_string(out.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "date,merchant,amount,type,recurring,source_file");
    // Rows before --from are excluded
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("2024-02-05,Netflix"));
}

#[test]
fn test_cmd_export_rejects_bad_dates() {
    let db = setup_test_db();
    assert!(commands::cmd_export(&db, None, Some("02/01/2024"), None, None).is_err());
}
