//! CLI command tests
//!
//! Exercise the command functions end to end against a scratch warehouse.

use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::commands;
use revcast_core::Warehouse;

fn scratch() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("revcast.db");
    (dir, db)
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

/// Deal CSV with wins spread across ten weeks
fn deals_csv() -> String {
    let mut csv = String::from(
        "deal_id,company_name,mrr,stage,close_date,created_date,region,is_at_risk,days_in_pipeline\n",
    );
    let first_close = chrono::NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
    for week in 0..10 {
        let close = first_close + chrono::Duration::weeks(week);
        csv.push_str(&format!(
            "w{w},Company {w},{mrr},closed_won,{close},2026-01-05,EMEA,false,{days}\n",
            w = week,
            mrr = 2000 + (week % 4) * 500,
            close = close.format("%Y-%m-%d"),
            days = 10 + week,
        ));
    }
    csv.push_str("open1,Open Co,3000,negotiation,,2026-02-10,AMER,true,45\n");
    csv
}

#[test]
fn test_init_creates_warehouse() {
    let (_dir, db) = scratch();
    commands::cmd_init(&db).unwrap();
    assert!(db.exists());
}

#[test]
fn test_import_then_run_pipeline() {
    let (dir, db) = scratch();
    commands::cmd_init(&db).unwrap();

    let deals = write_file(&dir, "deals.csv", &deals_csv());
    commands::cmd_import(&db, &deals, false).unwrap();

    let actions = write_file(
        &dir,
        "actions.csv",
        "company_name,mrr,action_type,priority,velocity_days,region\n\
         Globex,8000,WIN,1,12,AMER\n\
         Acme,3000,SAVE,2,40,EMEA\n",
    );
    commands::cmd_import(&db, &actions, true).unwrap();

    commands::cmd_run(&db, Some(42), None).unwrap();

    // run persisted both output tables
    let warehouse = commands::open_warehouse(&db).unwrap();
    assert_eq!(warehouse.latest_predictions().unwrap().len(), 4);
    assert_eq!(warehouse.latest_importances().unwrap().len(), 8);
}

#[test]
fn test_run_without_seed_fails() {
    let (dir, db) = scratch();
    commands::cmd_init(&db).unwrap();
    let deals = write_file(&dir, "deals.csv", &deals_csv());
    commands::cmd_import(&db, &deals, false).unwrap();

    let err = commands::cmd_run(&db, None, None).unwrap_err();
    assert!(err.to_string().contains("seed"));
}

#[test]
fn test_run_with_config_file() {
    let (dir, db) = scratch();
    commands::cmd_init(&db).unwrap();
    let deals = write_file(&dir, "deals.csv", &deals_csv());
    commands::cmd_import(&db, &deals, false).unwrap();

    let config = write_file(
        &dir,
        "revcast.toml",
        "random_seed = 42\nforecast_horizon = 2\n",
    );
    commands::cmd_run(&db, None, Some(&config)).unwrap();

    let warehouse = commands::open_warehouse(&db).unwrap();
    assert_eq!(warehouse.latest_predictions().unwrap().len(), 2);
}

#[test]
fn test_forecast_without_seed() {
    let (dir, db) = scratch();
    commands::cmd_init(&db).unwrap();
    let deals = write_file(&dir, "deals.csv", &deals_csv());
    commands::cmd_import(&db, &deals, false).unwrap();

    // trend-only path needs no randomness
    commands::cmd_forecast(&db, 3, 4).unwrap();
}

#[test]
fn test_report_before_any_run_is_graceful() {
    let (_dir, db) = scratch();
    commands::cmd_init(&db).unwrap();
    commands::cmd_report(&db).unwrap();
}

#[test]
fn test_import_rejects_schema_mismatch() {
    let (dir, db) = scratch();
    commands::cmd_init(&db).unwrap();
    let bad = write_file(&dir, "bad.csv", "deal_id,mrr\nd1,100\n");
    assert!(commands::cmd_import(&db, &bad, false).is_err());
}

#[test]
fn test_resolve_config_seed_overrides_file() {
    let (dir, _db) = scratch();
    let config = write_file(&dir, "revcast.toml", "random_seed = 1\n");
    let resolved = commands::resolve_config(Some(99), Some(&config)).unwrap();
    assert_eq!(resolved.random_seed, 99);
}
