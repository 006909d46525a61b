#![allow(dead_code)]

use assert_cmd::Command;
use std::{env, fs, os::unix::fs::PermissionsExt, path::Path};

/// `skit` with a predictable environment: default threshold, no colours,
/// no internal tracing.
pub fn skit() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("skit"));
    cmd.env_remove("SKIT_LOG_LEVEL")
        .env_remove("SKIT_COLOR")
        .env_remove("SKIT_TRACE")
        .env("NO_COLOR", "1");
    cmd
}

/// Writes an executable `sh` script named `name` into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) {
    let script = dir.join(name);
    fs::write(&script, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut perms = fs::metadata(&script).expect("script metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&script, perms).expect("chmod script");
}

/// `PATH` for a child process with `dir` searched first.
pub fn path_with(dir: &Path) -> String {
    match env::var("PATH") {
        Ok(path) if !path.is_empty() => format!("{}:{path}", dir.display()),
        _ => dir.display().to_string(),
    }
}
