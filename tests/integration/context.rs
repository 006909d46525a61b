#[path = "common/mod.rs"]
mod common;

use common::skit;
use predicates::prelude::*;

const SHELL: &str = "/bin/sh";

#[test]
fn single_frame_is_executed_as_script() {
    skit()
        .args(["context", "--interpreter", SHELL, "/opt/deploy.sh"])
        .assert()
        .success()
        .stdout("executed-as-script\n");
}

#[test]
fn nested_frames_are_sourced_by_script() {
    skit()
        .args(["context", "--interpreter", SHELL, "/opt/main.sh", "/opt/lib.sh"])
        .assert()
        .success()
        .stdout("sourced-by-script\n");
}

#[test]
fn root_equal_to_interpreter_is_interactive() {
    skit()
        .args(["context", "--interpreter", SHELL, "--json", SHELL, "/opt/env.sh"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "\"kind\":\"sourced-by-interactive-shell\"",
        ))
        .stdout(predicate::str::contains("\"source_id\":\"/opt/env.sh\""));
}

#[test]
fn current_first_stack_with_helper_offset() {
    // helper.sh is the guard's own frame; deploy.sh is the unit being judged
    skit()
        .args([
            "context",
            "--interpreter",
            SHELL,
            "--current-first",
            "--self-offset",
            "1",
            "/opt/helper.sh",
            "/opt/deploy.sh",
        ])
        .assert()
        .success()
        .stdout("executed-as-script\n");
}

#[test]
fn query_answers_through_exit_status() {
    skit()
        .args(["context", "--interpreter", SHELL, "--query", "included", "a.sh", "b.sh"])
        .assert()
        .success()
        .stdout("");

    skit()
        .args(["context", "--interpreter", SHELL, "--query", "included", "a.sh"])
        .assert()
        .code(1)
        .stderr("");
}

#[test]
fn require_included_terminates_batch_run_without_prompt() {
    skit()
        .args(["context", "--interpreter", SHELL, "--require", "included", "/opt/env.sh"])
        .write_stdin("")
        .assert()
        .code(1)
        .stderr("ERROR /opt/env.sh must be sourced, not executed\n");
}

#[test]
fn require_independent_prompts_when_root_is_interactive() {
    skit()
        .args([
            "context",
            "--interpreter",
            SHELL,
            "--require",
            "independent",
            SHELL,
            "/opt/run.sh",
        ])
        .write_stdin("\n")
        .assert()
        .code(1)
        .stderr("ERROR /opt/run.sh must be executed, not sourced\nPress Enter to continue...");
}

#[test]
fn offset_consuming_whole_chain_is_rejected() {
    skit()
        .args(["context", "--interpreter", SHELL, "--self-offset", "2", "a.sh", "b.sh"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid argument"));
}

#[test]
fn terminal_signal_leaves_inclusion_to_the_interpreter_path() {
    // stdin is a pipe here, so the root is never interactive
    skit()
        .args(["context", "--probe", "terminal", "--interpreter", SHELL, "/opt/deploy.sh"])
        .write_stdin("")
        .assert()
        .success()
        .stdout("executed-as-script\n");

    skit()
        .args(["context", "--probe", "terminal", "--interpreter", SHELL, SHELL, "/opt/env.sh"])
        .write_stdin("")
        .assert()
        .success()
        .stdout("sourced-by-script\n");

    skit()
        .args([
            "context",
            "--probe",
            "terminal",
            "--interpreter",
            SHELL,
            "--require",
            "included",
            "/opt/deploy.sh",
        ])
        .write_stdin("")
        .assert()
        .code(1)
        .stderr("ERROR /opt/deploy.sh must be sourced, not executed\n");
}
