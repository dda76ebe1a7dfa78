use assert_cmd::Command;

#[test]
fn requires_a_selection() {
    Command::cargo_bin("sweeper")
        .unwrap()
        .arg("--dry-run")
        .assert()
        .code(2);
}

#[test]
fn rejects_both_selections() {
    Command::cargo_bin("sweeper")
        .unwrap()
        .args(["--cluster-name", "c1", "--all-clusters"])
        .assert()
        .code(2);
}

#[test]
fn rejects_an_empty_cluster_name() {
    // A valid selection gets past argument parsing and fails validation instead.
    let output = Command::cargo_bin("sweeper")
        .unwrap()
        .args(["--cluster-name", "", "--dry-run"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid arguments"));
}

#[test]
fn rejects_an_oversized_age_threshold() {
    let output = Command::cargo_bin("sweeper")
        .unwrap()
        .args([
            "--all-clusters",
            "--age-threshold-hours",
            "6000000000000000",
            "--dry-run",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("too large"));
}
