// typoscan/tests/cli_integration.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// A command isolated from the user's config files and TS_* variables.
fn typoscan(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("typoscan").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("RUST_LOG");
    for var in [
        "TS_BATCH_SIZE",
        "TS_TIMEOUT",
        "TS_QUERY_TIMEOUT",
        "TS_CAP",
        "TS_SEED",
        "TS_POLICY",
        "TS_DOH_URL",
        "TS_GEO_URL",
        "TS_EMIT_UNRESOLVED",
        "TS_CONFIG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn stdout_lines(output: &std::process::Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| l.to_string())
        .collect()
}

#[test]
fn test_help_shows_flags() {
    let home = TempDir::new().unwrap();
    typoscan(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--family"))
        .stdout(predicate::str::contains("--hide-unresolved"))
        .stdout(predicate::str::contains("--sse"))
        .stdout(predicate::str::contains("Candidate Generation"));
}

#[test]
fn test_list_families_without_domain() {
    let home = TempDir::new().unwrap();
    typoscan(&home)
        .arg("--list-families")
        .assert()
        .success()
        .stdout(predicate::str::contains("Available Mutation Families:"))
        .stdout(predicate::str::contains("Bitsquatting"))
        .stdout(predicate::str::contains("Keyboard-Proximity"))
        .stdout(predicate::str::contains("TLD-Swap"))
        .stdout(predicate::str::contains("Original").not());
}

#[test]
fn test_missing_domain_is_usage_error() {
    let home = TempDir::new().unwrap();
    typoscan(&home)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("DOMAIN"));
}

#[test]
fn test_invalid_domain_exits_with_error() {
    let home = TempDir::new().unwrap();
    typoscan(&home)
        .arg("bad-.com")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"));

    typoscan(&home)
        .args(["bad_domain!.com", "--dry-run"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_bare_suffix_is_rejected() {
    let home = TempDir::new().unwrap();
    typoscan(&home)
        .args(["co.uk", "--dry-run"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_dry_run_lists_original_first() {
    let home = TempDir::new().unwrap();
    let output = typoscan(&home)
        .args(["https://www.example.com/login", "--dry-run", "--family", "omission", "--seed", "1"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines[0], "example.com\tOriginal");
    assert_eq!(lines.len(), 8);
    assert!(lines.contains(&"exampl.com\tOmission".to_string()));
    assert!(String::from_utf8_lossy(&output.stderr).contains("8 candidates would be probed"));
}

#[test]
fn test_dry_run_json_respects_cap() {
    let home = TempDir::new().unwrap();
    let output = typoscan(&home)
        .args(["example.com", "--dry-run", "--json", "--cap", "5", "--seed", "42"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let candidates: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let candidates = candidates.as_array().unwrap();
    assert_eq!(candidates.len(), 6);
    assert_eq!(candidates[0]["permutation"], "example.com");
    assert_eq!(candidates[0]["permutationType"], "Original");
}

#[test]
fn test_dry_run_is_deterministic_with_seed() {
    let home = TempDir::new().unwrap();
    let run = || {
        typoscan(&home)
            .args(["paypal.com", "--dry-run", "--cap", "40", "--seed", "7"])
            .output()
            .unwrap()
            .stdout
    };

    assert_eq!(run(), run());
}

#[test]
fn test_config_file_is_applied() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("scan.toml");
    fs::write(
        &config_path,
        "[scan]\ncap = 3\nseed = 5\nfamilies = [\"omission\"]\n",
    )
    .unwrap();

    let output = typoscan(&home)
        .args(["example.com", "--dry-run", "--config"])
        .arg(&config_path)
        .output()
        .unwrap();

    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 4);
    assert!(lines[1..].iter().all(|l| l.ends_with("\tOmission")));
}

#[test]
fn test_local_config_is_discovered() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join("typoscan.toml"),
        "[scan]\ncap = 2\nfamilies = [\"transposition\"]\n",
    )
    .unwrap();

    let output = typoscan(&home)
        .args(["example.com", "--dry-run", "--seed", "3"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_lines(&output).len(), 3);
}

#[test]
fn test_cli_overrides_environment() {
    let home = TempDir::new().unwrap();
    let output = typoscan(&home)
        .env("TS_CAP", "2")
        .args(["example.com", "--dry-run", "--family", "omission", "--seed", "1"])
        .output()
        .unwrap();
    assert_eq!(stdout_lines(&output).len(), 3);

    let output = typoscan(&home)
        .env("TS_CAP", "2")
        .args(["example.com", "--dry-run", "--family", "omission", "--cap", "4"])
        .output()
        .unwrap();
    assert_eq!(stdout_lines(&output).len(), 5);
}

#[test]
fn test_invalid_config_file_fails() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("broken.toml");
    fs::write(&config_path, "[scan]\nbatch_size = 0\n").unwrap();

    typoscan(&home)
        .args(["example.com", "--dry-run", "--config"])
        .arg(&config_path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to load config file"));
}

#[test]
fn test_conflicting_flags() {
    let home = TempDir::new().unwrap();

    typoscan(&home)
        .args(["example.com", "--json", "--sse"])
        .assert()
        .failure()
        .code(2);

    typoscan(&home)
        .args(["example.com", "--sse", "--batch"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Cannot use --sse with --batch"));

    typoscan(&home)
        .args(["example.com", "--batch-size", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Batch size must be between 1 and 500"));
}

#[test]
fn test_unknown_family_fails() {
    let home = TempDir::new().unwrap();
    typoscan(&home)
        .args(["example.com", "--dry-run", "--family", "teleportation"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("teleportation"));
}

#[test]
#[ignore = "requires network access"]
fn test_live_streaming_scan() {
    let home = TempDir::new().unwrap();
    typoscan(&home)
        .args(["google.com", "--json", "--cap", "10", "--seed", "1"])
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"done\":true"));
}
