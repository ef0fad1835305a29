use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

const CALLS_CSV: &str = "\
date,incoming,orders,note,kg
2025-01-10,600,30,x,300
2025-02-10,400,20,x,200
";

const PROMO_CSV: &str = "\
Дата,Кто,Сумма,Кол-во,Граммы
2025-01-10,Анна,1000,2,250
2025-01-20,Олег,500,1,500
2025-02-03,,250,3,250
";

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn salesdash(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("salesdash").unwrap();
    cmd.env("HOME", home).env_remove("SALESDASH_LOG");
    cmd
}

#[test]
fn test_kpi_report_models_revenue() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "calls.csv", CALLS_CSV);
    salesdash(dir.path())
        .args(["report", "kpi"])
        .arg(&file)
        .args(["--traffic", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("35,000,000 ₽"))
        .stdout(predicate::str::contains("1000.0 кг"));
}

#[test]
fn test_manager_filter_narrows_expenses() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "promo.csv", PROMO_CSV);
    salesdash(dir.path())
        .args(["report", "kpi"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("1,750 ₽"));
    salesdash(dir.path())
        .args(["report", "kpi"])
        .arg(&file)
        .args(["--manager", "Олег"])
        .assert()
        .success()
        .stdout(predicate::str::contains("managers: Олег"))
        .stdout(predicate::str::contains("1,750 ₽").not());
}

#[test]
fn test_all_report_lists_every_view() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "promo.csv", PROMO_CSV);
    salesdash(dir.path())
        .args(["report", "all"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Monthly Trend"))
        .stdout(predicate::str::contains("2025-02"))
        .stdout(predicate::str::contains("250 г"))
        .stdout(predicate::str::contains("Expenses by Manager"));
}

#[test]
fn test_weights_report_without_weight_column() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "calls.csv", CALLS_CSV);
    salesdash(dir.path())
        .args(["report", "weights"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("No product weight data."));
}

#[test]
fn test_sheets_report() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "promo.csv", PROMO_CSV);
    salesdash(dir.path())
        .args(["report", "sheets"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("promo"))
        .stdout(predicate::str::contains("3 rows (header row 1)"));
}

#[test]
fn test_unrecognized_file_warns() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "stock.csv", "sku,qty\nA,1\n");
    salesdash(dir.path())
        .args(["report", "kpi"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("no data was recognized"));
}

#[test]
fn test_unsupported_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "notes.txt", "hello");
    salesdash(dir.path())
        .args(["report", "kpi"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file type"));
}

#[test]
fn test_out_of_range_parameter_fails() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "calls.csv", CALLS_CSV);
    salesdash(dir.path())
        .args(["report", "kpi"])
        .arg(&file)
        .args(["--price", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("avg_price must be between"));
}

#[test]
fn test_config_set_and_show() {
    let dir = tempfile::tempdir().unwrap();
    salesdash(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("built-in defaults"));
    salesdash(dir.path())
        .args(["config", "set", "--price", "40000", "--conv", "-1.5"])
        .assert()
        .success();
    salesdash(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("40,000 ₽"))
        .stdout(predicate::str::contains("-1.5 pp"));
    salesdash(dir.path())
        .args(["config", "set", "--traffic", "9"])
        .assert()
        .failure();
    salesdash(dir.path())
        .args(["config", "reset"])
        .assert()
        .success();
}

#[test]
fn test_saved_price_feeds_reports() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "calls.csv", CALLS_CSV);
    salesdash(dir.path())
        .args(["config", "set", "--price", "20000"])
        .assert()
        .success();
    salesdash(dir.path())
        .args(["report", "kpi"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("10,000,000 ₽"));
}

#[test]
fn test_dashboard_needs_terminal() {
    let dir = tempfile::tempdir().unwrap();
    salesdash(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("interactive terminal"));
}

#[test]
fn test_completions() {
    let dir = tempfile::tempdir().unwrap();
    salesdash(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("salesdash"));
}
