//! End-to-end drift CLI checks against a temporary store file.
#![forbid(unsafe_code)]

use std::path::Path;

use assert_cmd::Command;

fn record(store: &Path, version: &str, hash: &str, digest: &str) {
    Command::cargo_bin("cli")
        .unwrap()
        .args([
            "--store",
            store.to_str().unwrap(),
            "record",
            "--version",
            version,
            "--query-hash",
            hash,
            "--text",
            "MATCH (p:Person) RETURN p",
            "--plan-digest",
            digest,
        ])
        .assert()
        .success();
}

fn compare(store: &Path, baseline: &str, candidate: &str, threshold: &str) -> std::process::Output {
    Command::cargo_bin("cli")
        .unwrap()
        .args([
            "--store",
            store.to_str().unwrap(),
            "compare",
            "--baseline",
            baseline,
            "--candidate",
            candidate,
            "--threshold",
            threshold,
        ])
        .output()
        .unwrap()
}

#[test]
fn identical_plans_pass_the_comparison() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("drift.json");
    record(&store, "1.0", "aaaa0001", "plan-a");
    record(&store, "1.0", "aaaa0002", "plan-b");
    record(&store, "1.1", "aaaa0001", "plan-a");
    record(&store, "1.1", "aaaa0002", "plan-b");

    let output = compare(&store, "1.0", "1.1", "10");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("compared 2 queries"), "stdout: {stdout}");
    assert!(stdout.contains("0.0% of plans changed"), "stdout: {stdout}");
}

#[test]
fn changed_plans_above_the_threshold_fail_the_comparison() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("drift.json");
    record(&store, "1.0", "aaaa0001", "plan-a");
    record(&store, "1.0", "aaaa0002", "plan-b");
    record(&store, "1.1", "aaaa0001", "plan-a");
    record(&store, "1.1", "aaaa0002", "plan-changed");

    let output = compare(&store, "1.0", "1.1", "10");
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("50.0% of plans changed"), "stdout: {stdout}");
}

#[test]
fn threshold_is_strict_at_the_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("drift.json");
    record(&store, "1.0", "aaaa0001", "plan-a");
    record(&store, "1.0", "aaaa0002", "plan-b");
    record(&store, "1.1", "aaaa0001", "plan-a");
    record(&store, "1.1", "aaaa0002", "plan-changed");

    // Exactly at the threshold: not drift.
    assert!(compare(&store, "1.0", "1.1", "50").status.success());
    // Just below: drift.
    assert!(!compare(&store, "1.0", "1.1", "49.9").status.success());
}

#[test]
fn unknown_versions_are_reported_as_errors() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("drift.json");
    record(&store, "1.0", "aaaa0001", "plan-a");

    let output = compare(&store, "1.0", "9.9", "10");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no records for version '9.9'"), "stderr: {stderr}");
}

#[test]
fn plan_files_are_digested_instead_of_explicit_digests() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("drift.json");
    let plan = dir.path().join("plan.txt");
    std::fs::write(&plan, "NodeByLabelScan -> Filter -> Produce").unwrap();

    Command::cargo_bin("cli")
        .unwrap()
        .args([
            "--store",
            store.to_str().unwrap(),
            "record",
            "--version",
            "1.0",
            "--query-hash",
            "aaaa0001",
            "--text",
            "MATCH (p:Person) RETURN p",
            "--plan-file",
            plan.to_str().unwrap(),
        ])
        .assert()
        .success();

    let output = Command::cargo_bin("cli")
        .unwrap()
        .args([
            "--store",
            store.to_str().unwrap(),
            "--format",
            "json",
            "show",
            "--version",
            "1.0",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.matches("planDigest").count(),
        1,
        "stdout: {stdout}"
    );
}

#[test]
fn json_format_emits_a_machine_readable_report() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("drift.json");
    record(&store, "1.0", "aaaa0001", "plan-a");
    record(&store, "1.1", "aaaa0001", "plan-b");

    let output = Command::cargo_bin("cli")
        .unwrap()
        .args([
            "--store",
            store.to_str().unwrap(),
            "--format",
            "json",
            "compare",
            "--baseline",
            "1.0",
            "--candidate",
            "1.1",
            "--threshold",
            "10",
        ])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["compared"], 1);
    assert_eq!(report["changed"].as_array().unwrap().len(), 1);
}
