#[path = "common/mod.rs"]
mod common;

use common::{path_with, skit, write_script};
use std::fs;
use tempfile::tempdir;

#[test]
fn passing_checks_report_nothing() {
    let temp = tempdir().expect("failed to create tempdir");
    let config = temp.path().join("app.conf");
    fs::write(&config, "port=8080\n").expect("write config");

    skit()
        .arg("check")
        .arg(format!("file@CONFIG:{}", config.display()))
        .arg(format!("dir@WORKDIR:{}", temp.path().display()))
        .args([
            "ipv4@HOST:192.168.1.50",
            "range@PORT:8080:1:65535",
            "bool@DEBUG:false",
            "posint@WORKERS:4",
            "command@SHELL:sh",
        ])
        .assert()
        .success()
        .stderr("");
}

#[test]
fn failures_are_reported_together_in_order() {
    let temp = tempdir().expect("failed to create tempdir");
    let missing = temp.path().join("missing.conf");

    skit()
        .arg("check")
        .arg(format!("file@CONFIG:{}", missing.display()))
        .args([
            "ipv4@HOST:256.1.1.1",
            "defined@TOKEN:",
            "ipv4@HOST:google.com",
            "contains@BRANCH:main:release",
        ])
        .assert()
        .code(1)
        .stderr(format!(
            "ERROR file does not exist: {}\n\
             ERROR invalid IPv4 address: 256.1.1.1\n\
             ERROR variable is undefined: TOKEN\n\
             ERROR invalid IPv4 address: google.com\n\
             ERROR 'main' does not contain 'release'\n",
            missing.display()
        ));
}

#[test]
fn warn_mode_still_signals_failure() {
    skit()
        .args(["check", "--report", "warn", "posint@RETRIES:0"])
        .assert()
        .code(1)
        .stderr("WARN invalid positive integer: 0\n");
}

#[test]
fn undefined_subject_skips_the_underlying_test() {
    skit()
        .args(["check", "range@PORT::1:10"])
        .assert()
        .code(1)
        .stderr("ERROR variable is undefined: PORT\n");
}

#[test]
fn malformed_check_is_a_usage_error() {
    skit()
        .args(["check", "frobnicate:1"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("unknown check kind 'frobnicate'"));
}

#[test]
fn inverted_range_is_a_usage_error() {
    skit()
        .args(["check", "range@PORT:5:10:1"])
        .assert()
        .code(2)
        .stderr(predicates::str::contains("MIN 10 greater than MAX 1"));
}

#[test]
fn omitted_value_reads_named_environment_variable() {
    skit()
        .args(["check", "ipv4@SKIT_HOST", "range@SKIT_PORT:1:65535"])
        .env("SKIT_HOST", "10.0.0.7")
        .env("SKIT_PORT", "8080")
        .assert()
        .success()
        .stderr("");

    skit()
        .args(["check", "ipv4@SKIT_HOST", "contains@SKIT_BRANCH:release"])
        .env("SKIT_HOST", "example.org")
        .env_remove("SKIT_BRANCH")
        .assert()
        .code(1)
        .stderr(
            "ERROR invalid IPv4 address: example.org\n\
             ERROR variable is undefined: SKIT_BRANCH\n",
        );
}

#[test]
fn elevated_checks_keep_the_failure_messages() {
    let bin = tempdir().expect("failed to create tempdir");
    // non-interactive flag first, then the test(1) invocation
    write_script(bin.path(), "sudo", "[ \"$1\" = -n ] || exit 64\nshift\nexec \"$@\"");

    let data = tempdir().expect("failed to create tempdir");
    let present = data.path().join("present.conf");
    fs::write(&present, "").expect("write file");
    let missing = data.path().join("missing.conf");

    skit()
        .env("PATH", path_with(bin.path()))
        .arg("check")
        .arg("--sudo")
        .arg(format!("file@F:{}", present.display()))
        .arg(format!("dir@D:{}", data.path().display()))
        .assert()
        .success()
        .stderr("");

    skit()
        .env("PATH", path_with(bin.path()))
        .arg("check")
        .arg("--sudo")
        .arg(format!("file@F:{}", missing.display()))
        .assert()
        .code(1)
        .stderr(format!("ERROR file does not exist: {}\n", missing.display()));
}

#[test]
fn refused_elevation_counts_as_a_failed_check() {
    let bin = tempdir().expect("failed to create tempdir");
    write_script(bin.path(), "sudo", "exit 1");

    let data = tempdir().expect("failed to create tempdir");
    let present = data.path().join("present.conf");
    fs::write(&present, "").expect("write file");

    skit()
        .env("PATH", path_with(bin.path()))
        .arg("check")
        .arg("--sudo")
        .arg(format!("file@F:{}", present.display()))
        .assert()
        .code(1)
        .stderr(format!("ERROR file does not exist: {}\n", present.display()));
}
