use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn rentcycle_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("rentcycle"))
}

/// Run `init` in a fresh temp dir and return (guard, config path).
fn initialized() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("rentcycle-config");

    rentcycle_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success();

    (temp_dir, config_path)
}

fn run_at(config_path: &Path, now: &str, args: &[&str]) -> assert_cmd::assert::Assert {
    rentcycle_cmd()
        .args(["-C", config_path.to_str().unwrap(), "--now", now])
        .args(args)
        .assert()
}

fn generate_first_rent(config_path: &Path) {
    run_at(
        config_path,
        "2024-01-01T08:00:00Z",
        &["generate", "--tenant", "example-tenant", "--kind", "rent"],
    )
    .success();
}

#[test]
fn test_help() {
    rentcycle_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rent and utility billing-cycle engine"));
}

#[test]
fn test_version() {
    rentcycle_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rentcycle"));
}

#[test]
fn test_init_creates_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("rentcycle-config");

    rentcycle_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized rentcycle config"));

    assert!(config_path.join("config.toml").exists());
    assert!(config_path.join("tenants.toml").exists());
    assert!(config_path.join("rates.toml").exists());
}

#[test]
fn test_init_fails_if_exists() {
    let (_temp_dir, config_path) = initialized();

    rentcycle_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_status_without_init() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nonexistent");

    rentcycle_cmd()
        .args(["-C", config_path.to_str().unwrap(), "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_tenants_list() {
    let (_temp_dir, config_path) = initialized();

    rentcycle_cmd()
        .args(["-C", config_path.to_str().unwrap(), "tenants"])
        .assert()
        .success()
        .stdout(predicate::str::contains("example-tenant"))
        .stdout(predicate::str::contains("30 days"))
        .stdout(predicate::str::contains("electricity, water"));
}

#[test]
fn test_rates_list() {
    let (_temp_dir, config_path) = initialized();

    rentcycle_cmd()
        .args(["-C", config_path.to_str().unwrap(), "rates"])
        .assert()
        .success()
        .stdout(predicate::str::contains("main-building"))
        .stdout(predicate::str::contains("$5.00"));
}

#[test]
fn test_generate_first_rent_bill() {
    let (_temp_dir, config_path) = initialized();

    run_at(
        &config_path,
        "2024-01-01T08:00:00Z",
        &["generate", "--tenant", "example-tenant", "--kind", "rent"],
    )
    .success()
    .stdout(predicate::str::contains("Generated BILL-2024-0001"))
    .stdout(predicate::str::contains("Due:      2024-01-31 23:59:59 UTC"))
    .stdout(predicate::str::contains("Amount:   $1,000.00"));

    assert!(config_path.join("state.toml").exists());
}

#[test]
fn test_generate_twice_reports_current_bill() {
    let (_temp_dir, config_path) = initialized();
    generate_first_rent(&config_path);

    run_at(
        &config_path,
        "2024-01-02",
        &["generate", "--tenant", "example-tenant", "--kind", "rent"],
    )
    .success()
    .stdout(predicate::str::contains("already has a current rent bill: BILL-2024-0001"));

    run_at(&config_path, "2024-01-02", &["list"])
        .success()
        .stdout(predicate::str::contains("Showing 1 of 1 bills"));
}

#[test]
fn test_generate_before_lease_start_is_not_an_error() {
    let (_temp_dir, config_path) = initialized();

    run_at(
        &config_path,
        "2023-12-01",
        &["generate", "--tenant", "example-tenant", "--kind", "rent"],
    )
    .success()
    .stdout(predicate::str::contains("starts 2024-01-01"));
}

#[test]
fn test_generate_unknown_kind() {
    let (_temp_dir, config_path) = initialized();

    run_at(
        &config_path,
        "2024-01-01",
        &["generate", "--tenant", "example-tenant", "--kind", "gas"],
    )
    .failure()
    .stderr(predicate::str::contains("Unknown billing kind 'gas'"));
}

#[test]
fn test_generate_unknown_tenant() {
    let (_temp_dir, config_path) = initialized();

    run_at(
        &config_path,
        "2024-01-01",
        &["generate", "--tenant", "nobody", "--kind", "rent"],
    )
    .failure()
    .stderr(predicate::str::contains("Tenant 'nobody' not found"));
}

#[test]
fn test_generate_first_utility_bill() {
    let (_temp_dir, config_path) = initialized();

    run_at(
        &config_path,
        "2024-01-31",
        &[
            "generate",
            "--tenant",
            "example-tenant",
            "--kind",
            "electricity",
            "--reading",
            "150",
            "--previous",
            "100",
        ],
    )
    .success()
    .stdout(predicate::str::contains("Billed:   2024-01-31"))
    .stdout(predicate::str::contains("Due:      2024-03-06 23:59:59 UTC"))
    .stdout(predicate::str::contains("Amount:   $250.00"));
}

#[test]
fn test_late_payment_flow() {
    let (_temp_dir, config_path) = initialized();
    generate_first_rent(&config_path);

    run_at(&config_path, "2024-02-10", &["sweep"])
        .success()
        .stdout(predicate::str::contains("1 updated"));

    let output = rentcycle_cmd()
        .args(["-C", config_path.to_str().unwrap(), "show", "1", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let bill: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(bill["penalty"], 100.0);
    assert_eq!(bill["total_due"], 1100.0);
    assert_eq!(bill["payment_status"], "pending");

    run_at(&config_path, "2024-02-10", &["list"])
        .success()
        .stdout(predicate::str::contains("OVERDUE"))
        .stdout(predicate::str::contains("$1,100.00"));

    run_at(
        &config_path,
        "2024-02-10",
        &[
            "submit-proof",
            "--tenant",
            "example-tenant",
            "--kind",
            "rent",
            "--proof",
            "https://receipts.example/feb.png",
        ],
    )
    .success()
    .stdout(predicate::str::contains("Submitted proof for BILL-2024-0001"));

    run_at(&config_path, "2024-02-10", &["approve", "BILL-2024-0001"])
        .success()
        .stdout(predicate::str::contains("Paid:       $1,100.00"))
        .stdout(predicate::str::contains("due 2024-03-02"));

    run_at(
        &config_path,
        "2024-02-10T01:00:00Z",
        &["generate", "--tenant", "example-tenant", "--kind", "rent"],
    )
    .success()
    .stdout(predicate::str::contains("Generated BILL-2024-0002"))
    .stdout(predicate::str::contains("Due:      2024-03-02 23:59:59 UTC"));
}

#[test]
fn test_approve_pending_bill_fails() {
    let (_temp_dir, config_path) = initialized();
    generate_first_rent(&config_path);

    run_at(&config_path, "2024-01-10", &["approve", "1"])
        .failure()
        .stderr(predicate::str::contains(
            "Cannot approve bill BILL-2024-0001: status is pending",
        ));

    run_at(&config_path, "2024-01-10", &["show", "1"])
        .success()
        .stdout(predicate::str::contains("Status:   PENDING"));
}

#[test]
fn test_submit_proof_without_bill_fails() {
    let (_temp_dir, config_path) = initialized();

    run_at(
        &config_path,
        "2024-01-10",
        &[
            "submit-proof",
            "--tenant",
            "example-tenant",
            "--kind",
            "rent",
            "--proof",
            "https://receipts.example/jan.png",
        ],
    )
    .failure()
    .stderr(predicate::str::contains("No rent bill has been generated"));

    assert!(!config_path.join("state.toml").exists());
}

#[test]
fn test_reject_utility_proof() {
    let (_temp_dir, config_path) = initialized();

    run_at(
        &config_path,
        "2024-01-31",
        &[
            "generate",
            "--tenant",
            "example-tenant",
            "--kind",
            "water",
            "--reading",
            "20",
            "--previous",
            "10",
        ],
    )
    .success();
    run_at(
        &config_path,
        "2024-02-01",
        &["submit-proof", "--bill", "1", "--proof", "receipt-001"],
    )
    .success();

    run_at(&config_path, "2024-02-01", &["reject", "1", "--reason", "blurry photo"])
        .success()
        .stdout(predicate::str::contains("Rejected BILL-2024-0001"));

    run_at(&config_path, "2024-02-01", &["show", "1"])
        .success()
        .stdout(predicate::str::contains("Status:   REJECTED"))
        .stdout(predicate::str::contains("Rejected: blurry photo"));
}

#[test]
fn test_renew_waits_for_lead_window() {
    let (_temp_dir, config_path) = initialized();

    run_at(&config_path, "2024-01-01", &["renew"])
        .success()
        .stdout(predicate::str::contains("Renewal: 1 generated"));

    run_at(
        &config_path,
        "2024-01-20",
        &["submit-proof", "--bill", "1", "--proof", "receipt-jan"],
    )
    .success();
    run_at(&config_path, "2024-01-20", &["approve", "1"]).success();

    run_at(&config_path, "2024-02-01", &["renew"])
        .success()
        .stdout(predicate::str::contains("Renewal: 0 generated, 1 not due yet"));

    run_at(&config_path, "2024-02-10", &["renew"])
        .success()
        .stdout(predicate::str::contains("Generated BILL-2024-0002"))
        .stdout(predicate::str::contains("due 2024-02-19"));
}

#[test]
fn test_pay_without_gateway() {
    let (_temp_dir, config_path) = initialized();
    generate_first_rent(&config_path);

    run_at(&config_path, "2024-01-05", &["pay", "1"])
        .failure()
        .stderr(predicate::str::contains("Payment gateway is not configured"));
}

#[test]
fn test_list_empty() {
    let (_temp_dir, config_path) = initialized();

    rentcycle_cmd()
        .args(["-C", config_path.to_str().unwrap(), "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No bills found."));
}

#[test]
fn test_show_unknown_bill() {
    let (_temp_dir, config_path) = initialized();

    rentcycle_cmd()
        .args(["-C", config_path.to_str().unwrap(), "show", "BILL-2099-0001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Bill 'BILL-2099-0001' not found"));
}

#[test]
fn test_status_shows_upcoming_rent() {
    let (_temp_dir, config_path) = initialized();

    run_at(&config_path, "2024-01-01", &["status"])
        .success()
        .stdout(predicate::str::contains("Next bill id:     BILL-2024-0001"))
        .stdout(predicate::str::contains("example-tenant - due 2024-01-31"));
}

#[test]
fn test_status_does_not_count_submitted_bills_as_overdue() {
    let (_temp_dir, config_path) = initialized();
    generate_first_rent(&config_path);

    run_at(&config_path, "2024-02-10", &["status"])
        .success()
        .stdout(predicate::str::contains("(1 overdue"));

    run_at(
        &config_path,
        "2024-02-10",
        &["submit-proof", "--bill", "1", "--proof", "receipt-001"],
    )
    .success();

    run_at(&config_path, "2024-02-10", &["status"])
        .success()
        .stdout(predicate::str::contains("(0 overdue"));
}

#[test]
fn test_status_next_bill_id_uses_the_bill_date_year() {
    let (_temp_dir, config_path) = initialized();

    run_at(&config_path, "2025-03-01", &["status"])
        .success()
        .stdout(predicate::str::contains("Next bill id:     BILL-2024-0001"));

    run_at(
        &config_path,
        "2025-03-01",
        &["generate", "--tenant", "example-tenant", "--kind", "rent"],
    )
    .success()
    .stdout(predicate::str::contains("BILL-2024-0001"));
}

#[test]
fn test_invalid_now() {
    let (_temp_dir, config_path) = initialized();

    run_at(&config_path, "yesterday", &["status"])
        .failure()
        .stderr(predicate::str::contains("Invalid date 'yesterday'"));
}

#[test]
fn test_custom_tenant_file() {
    let (_temp_dir, config_path) = initialized();
    fs::write(
        config_path.join("tenants.toml"),
        r#"
[shop-2]
name = "Corner Shop"
building_id = "main-building"
payment_term = 90
rent_start_date = "2024-03-01"
monthly_rent = 600.0
"#,
    )
    .unwrap();

    run_at(
        &config_path,
        "2024-03-01",
        &["generate", "--tenant", "shop-2", "--kind", "rent"],
    )
    .success()
    .stdout(predicate::str::contains("Amount:   $1,800.00"))
    .stdout(predicate::str::contains("Due:      2024-05-30 23:59:59 UTC"));

    run_at(
        &config_path,
        "2024-03-01",
        &["generate", "--tenant", "shop-2", "--kind", "water", "--reading", "5"],
    )
    .success()
    .stdout(predicate::str::contains("does not pay water directly"));
}
