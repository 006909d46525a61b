#[path = "common/mod.rs"]
mod common;

use common::skit;
use predicates::prelude::*;

#[test]
fn log_writes_prefixed_line_to_stderr_only() {
    skit()
        .args(["log", "warn", "disk", "almost", "full"])
        .assert()
        .success()
        .stdout("")
        .stderr("WARN disk almost full\n");
}

#[test]
fn log_below_threshold_is_silent() {
    skit()
        .args(["log", "debug", "hidden"])
        .assert()
        .success()
        .stderr("");
}

#[test]
fn threshold_comes_from_environment() {
    skit()
        .env("SKIT_LOG_LEVEL", "trace")
        .args(["log", "DEBUG", "now visible"])
        .assert()
        .success()
        .stderr("DEBUG now visible\n");
}

#[test]
fn flag_overrides_environment_threshold() {
    skit()
        .env("SKIT_LOG_LEVEL", "trace")
        .args(["--log-level", "error", "log", "warn", "suppressed"])
        .assert()
        .success()
        .stderr("");
}

#[test]
fn unknown_level_fails_with_usage_status() {
    skit()
        .args(["log", "verbose", "x"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid log level 'verbose'"));
}

#[test]
fn invalid_environment_level_is_reported() {
    skit()
        .env("SKIT_LOG_LEVEL", "chatty")
        .args(["log", "info", "x"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid log level 'chatty'"));
}

#[test]
fn print_ignores_threshold_and_honours_no_newline() {
    skit()
        .args(["--log-level", "fatal", "print", "-n", "info", "Continue?"])
        .assert()
        .success()
        .stderr("Continue?");
}

#[test]
fn forced_colour_styles_output() {
    skit()
        .env_remove("NO_COLOR")
        .args(["--color", "always", "log", "error", "boom"])
        .assert()
        .success()
        .stderr("\x1b[1;31mERROR boom\x1b[0m\n");
}

#[test]
fn menu_requires_options() {
    skit().args(["menu", "Pick one:"]).assert().failure();
}
