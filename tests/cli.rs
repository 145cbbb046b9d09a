use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn runner() -> Command {
    Command::cargo_bin("dailytopics-runner").unwrap()
}

#[test]
fn help_lists_subcommands() {
    runner()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("show-schedule"));
}

#[test]
fn show_schedule_prints_default_fire_times() {
    // An empty job file falls back to the built-in twice-daily pipeline.
    let file = tempfile::NamedTempFile::new().unwrap();

    runner()
        .arg("--config")
        .arg(file.path())
        .args(["show-schedule", "-n", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("schedule: 0 8,18 * * *"))
        .stdout(predicate::str::contains("08:00:00 UTC"))
        .stdout(predicate::str::contains("18:00:00 UTC"));
}

#[test]
fn show_schedule_honors_configured_expression() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "schedule: \"15 3 * * *\"").unwrap();

    runner()
        .arg("--config")
        .arg(file.path())
        .arg("show-schedule")
        .assert()
        .success()
        .stdout(predicate::str::contains("03:15:00 UTC"));
}

#[test]
fn invalid_job_file_is_a_clean_failure() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "schedule: \"definitely not cron\"").unwrap();

    runner()
        .arg("--config")
        .arg(file.path())
        .arg("show-schedule")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid schedule"));
}

#[test]
fn missing_explicit_config_fails() {
    runner()
        .args(["--config", "/nonexistent/dailytopics.yml", "show-schedule"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read job file"));
}
