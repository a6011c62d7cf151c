// typoscan/tests/performance.rs

use assert_cmd::Command;
use std::time::Instant;

#[test]
fn test_uncapped_generation_performance() {
    let start = Instant::now();

    let mut cmd = Command::cargo_bin("typoscan").unwrap();
    cmd.args([
        "internationalbusinessmachines.co.uk",
        "--dry-run",
        "--no-cap",
        "--seed",
        "9",
    ])
    .env_remove("TS_CONFIG")
    .env_remove("TS_CAP")
    .timeout(std::time::Duration::from_secs(20));

    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let count = String::from_utf8_lossy(&output.stdout).lines().count();
    assert!(count > 1000, "expected a large candidate set, got {}", count);

    let duration = start.elapsed();
    assert!(
        duration.as_secs() < 20,
        "Uncapped generation took too long: {:?}",
        duration
    );
}

#[test]
fn test_capped_generation_is_fast() {
    let start = Instant::now();

    let mut cmd = Command::cargo_bin("typoscan").unwrap();
    cmd.args(["paypal.com", "--dry-run", "--cap", "100", "--seed", "1"])
        .env_remove("TS_CONFIG")
        .env_remove("TS_CAP")
        .timeout(std::time::Duration::from_secs(10));

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).lines().count(), 101);

    assert!(
        start.elapsed().as_secs() < 10,
        "Capped generation took too long: {:?}",
        start.elapsed()
    );
}
