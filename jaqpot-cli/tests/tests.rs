//! Integration tests for the entire `jaqpot-cli` executable.

use cli_test_dir::*;

#[test]
fn help_flag() {
    let testdir = TestDir::new("jaqpot-cli", "help_flag");
    let output = testdir.cmd().arg("--help").expect_success();
    assert!(output.stdout_str().contains("jaqpot-cli"));
    assert!(output.stdout_str().contains("predict"));
}

#[test]
fn version_flag() {
    let testdir = TestDir::new("jaqpot-cli", "version_flag");
    let output = testdir.cmd().arg("--version").expect_success();
    assert!(output.stdout_str().contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn requires_a_token() {
    let testdir = TestDir::new("jaqpot-cli", "requires_a_token");
    let output = testdir
        .cmd()
        .env_remove("JAQPOT_TOKEN")
        .args(&["model", "m1"])
        .expect_failure();
    assert!(output.stderr_str().contains("JAQPOT_TOKEN"));
}

#[test]
fn rejects_malformed_inputs() {
    let testdir = TestDir::new("jaqpot-cli", "rejects_malformed_inputs");
    let output = testdir
        .cmd()
        .args(&["--token", "t", "predict", "m1", "-i", "temp"])
        .expect_failure();
    assert!(output.stderr_str().contains("name=value"));
}

#[test]
fn tag_requires_org() {
    let testdir = TestDir::new("jaqpot-cli", "tag_requires_org");
    testdir
        .cmd()
        .args(&["--token", "t", "models", "--tag", "qsar"])
        .expect_failure();
}

#[test]
fn inputs_conflict_with_stdin() {
    let testdir = TestDir::new("jaqpot-cli", "inputs_conflict_with_stdin");
    testdir
        .cmd()
        .args(&["--token", "t", "predict", "m1", "-i", "temp=20", "--stdin"])
        .expect_failure();
}

#[test]
fn predict_needs_rows() {
    let testdir = TestDir::new("jaqpot-cli", "predict_needs_rows");
    let output = testdir
        .cmd()
        .args(&["--token", "t", "predict", "m1"])
        .expect_failure();
    assert!(output.stderr_str().contains("-i"));
}

#[test]
fn rejects_bad_urls() {
    let testdir = TestDir::new("jaqpot-cli", "rejects_bad_urls");
    let output = testdir
        .cmd()
        .args(&["--token", "t", "--url", "not a url", "model", "m1"])
        .expect_failure();
    assert!(output.stderr_str().contains("not a url"));
}

#[test]
fn rejects_zero_poll_interval() {
    let testdir = TestDir::new("jaqpot-cli", "rejects_zero_poll_interval");
    let output = testdir
        .cmd()
        .args(&["--token", "t", "--poll-interval", "0", "predict", "m1", "-i", "temp=20"])
        .expect_failure();
    assert!(output.stderr_str().contains("at least 1 second"));
}

#[test]
fn help_mentions_deadline() {
    let testdir = TestDir::new("jaqpot-cli", "help_mentions_deadline");
    let output = testdir.cmd().arg("--help").expect_success();
    assert!(output.stdout_str().contains("--deadline"));
}
