//! Command-line tests for the `riskcalc` binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const CONFIG: &str = r#"
[concentration]
medium_from = "1500"
high_from = "2500"

[retry]
initial_delay_ms = 1
max_delay_ms = 5
"#;

const EXPOSURES: &str = r#"{
    "bank_info": { "bank_name": "Banca Esempio", "abi_code": "08081" },
    "exposures": [
        { "exposure_id": "E1", "client_name": "Acme SpA", "original_amount": "600",
          "original_currency": "EUR", "country": "IT", "sector": "CORPORATE" },
        { "exposure_id": "E2", "client_name": "Bank AG", "original_amount": "500",
          "original_currency": "USD", "country": "DE", "sector": "BANKING" }
    ]
}"#;

fn riskcalc() -> Command {
    Command::cargo_bin("riskcalc").unwrap()
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.display().to_string()
}

#[test]
fn test_config_check_accepts_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(dir.path(), "riskcalc.toml", CONFIG);

    riskcalc()
        .args(["config", "check", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn test_config_check_reports_every_problem() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(
        dir.path(),
        "bad.toml",
        r#"
        [concentration]
        medium_from = "3000"
        high_from = "2000"

        [retry]
        max_attempts = 0
        "#,
    );

    riskcalc()
        .args(["--format", "json", "config", "check", &config])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"valid\": false"))
        .stdout(predicate::str::contains("concentration.high_from"))
        .stdout(predicate::str::contains("retry.max_attempts"));
}

#[test]
fn test_process_writes_results_and_prints_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(dir.path(), "riskcalc.toml", CONFIG);
    let rates = write(dir.path(), "rates.json", r#"{ "USD": "0.8" }"#);
    let exposures = write(dir.path(), "june.json", EXPOSURES);
    let output_dir = dir.path().join("out");

    let output = riskcalc()
        .args(["--quiet", "--format", "json", "process", &exposures])
        .args(["--rates", &rates, "--config", &config])
        .arg("--output-dir")
        .arg(&output_dir)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let outcomes: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let first = &outcomes[0];
    assert_eq!(first["state"], "COMPLETED");
    assert_eq!(first["exposuresCalculated"], 2);
    // 600 + 500 * 0.8
    let total: f64 = first["totalAmountEur"].as_str().unwrap().parse().unwrap();
    assert_eq!(total, 1000.0);

    let batch_id = first["batchId"].as_str().unwrap();
    assert!(batch_id.starts_with("june-"));
    assert!(output_dir
        .join(batch_id)
        .join("calculation-results.json")
        .is_file());
}

#[test]
fn test_process_fails_when_a_batch_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(dir.path(), "riskcalc.toml", CONFIG);
    let rates = write(dir.path(), "rates.csv", "currency,rate_to_eur\nUSD,0.8\n");
    let good = write(dir.path(), "good.json", EXPOSURES);
    let bad = write(dir.path(), "bad.json", r#"{ "loans": [] }"#);

    riskcalc()
        .args(["--quiet", "--format", "csv", "process", &good, &bad])
        .args(["--rates", &rates, "--config", &config])
        .arg("--output-dir")
        .arg(dir.path().join("out"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("COMPLETED"))
        .stdout(predicate::str::contains("FILE_PARSING_ERROR"))
        .stderr(predicate::str::contains("1 of 2 batch(es) failed"));
}

#[test]
fn test_process_rejects_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(dir.path(), "riskcalc.toml", CONFIG);
    let rates = write(dir.path(), "rates.json", "{}");

    riskcalc()
        .args(["process", "nope.json", "--rates", &rates, "--config", &config])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}
