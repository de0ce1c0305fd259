use assert_cmd::Command;
use predicates::prelude::*;

fn svcreg() -> Command {
    Command::cargo_bin("svcreg").expect("svcreg binary should build")
}

#[test]
fn help_lists_the_service_commands() {
    svcreg()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("register")
                .and(predicate::str::contains("unregister"))
                .and(predicate::str::contains("startup"))
                .and(predicate::str::contains("status")),
        );
}

#[test]
fn missing_subcommand_is_an_error() {
    svcreg().assert().failure();
}

#[test]
fn unknown_startup_policy_is_rejected() {
    svcreg()
        .args(["startup", "acme", "sometimes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sometimes"));
}

#[test]
fn invalid_log_level_is_rejected() {
    svcreg()
        .args(["--log-level", "loud", "status", "acme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loud"));
}

#[cfg(not(windows))]
#[test]
fn manager_commands_report_the_missing_platform() {
    svcreg()
        .args(["status", "acme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only available on Windows"));
}
