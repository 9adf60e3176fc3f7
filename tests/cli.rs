//! Black-box CLI smoke tests: stage operations, run the batch, and
//! check the resulting filesystem state. Each test gets its own
//! `XDG_CONFIG_HOME` so staged-batch state never leaks between tests.

use assert_cmd::prelude::*;
use assert_fs::assert::PathAssert;
use assert_fs::fixture::*;
use predicates::prelude::*;
use std::process::Command;

fn cmd(config_home: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("synthfs").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path());
    cmd
}

#[test]
fn add_file_then_run_creates_it() -> Result<(), Box<dyn std::error::Error>> {
    let config_home = assert_fs::TempDir::new()?;
    let workdir = assert_fs::TempDir::new()?;

    let source = workdir.child("source.txt");
    source.write_str("hello from the cli")?;
    let target = workdir.child("out/greeting.txt");

    cmd(&config_home)
        .current_dir(&workdir)
        .arg("add-file")
        .arg("out/greeting.txt")
        .arg("--from")
        .arg("source.txt")
        .assert()
        .success();

    cmd(&config_home).current_dir(&workdir).arg("list").assert().success().stdout(predicate::str::contains("CreateFile"));

    cmd(&config_home)
        .current_dir(&workdir)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("executed 2 operations"));

    target.assert(predicate::path::is_file());
    target.assert("hello from the cli");
    Ok(())
}

#[test]
fn run_with_nothing_staged_exits_cleanly() -> Result<(), Box<dyn std::error::Error>> {
    let config_home = assert_fs::TempDir::new()?;
    let workdir = assert_fs::TempDir::new()?;

    cmd(&config_home)
        .current_dir(&workdir)
        .arg("run")
        .assert()
        .success()
        .stderr(predicate::str::contains("nothing staged"));
    Ok(())
}

#[test]
fn clear_discards_staged_batch() -> Result<(), Box<dyn std::error::Error>> {
    let config_home = assert_fs::TempDir::new()?;
    let workdir = assert_fs::TempDir::new()?;

    cmd(&config_home).current_dir(&workdir).arg("add-dir").arg("staged_dir").assert().success();
    cmd(&config_home).current_dir(&workdir).arg("clear").assert().success();
    cmd(&config_home)
        .current_dir(&workdir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    Ok(())
}

#[test]
fn no_subcommand_exits_with_usage_code() -> Result<(), Box<dyn std::error::Error>> {
    let config_home = assert_fs::TempDir::new()?;
    let workdir = assert_fs::TempDir::new()?;

    cmd(&config_home)
        .current_dir(&workdir)
        .assert()
        .code(64)
        .stderr(predicate::str::contains("requires a subcommand"));
    Ok(())
}

#[test]
fn run_json_prints_a_batch_summary() -> Result<(), Box<dyn std::error::Error>> {
    let config_home = assert_fs::TempDir::new()?;
    let workdir = assert_fs::TempDir::new()?;

    cmd(&config_home).current_dir(&workdir).arg("add-dir").arg("staged_dir").assert().success();

    cmd(&config_home)
        .current_dir(&workdir)
        .arg("run")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\": true"))
        .stdout(predicate::str::contains("\"operations\""));
    Ok(())
}

#[test]
fn config_set_persists_and_show_reflects_it() -> Result<(), Box<dyn std::error::Error>> {
    let config_home = assert_fs::TempDir::new()?;
    let workdir = assert_fs::TempDir::new()?;

    cmd(&config_home).current_dir(&workdir).arg("config").arg("set").arg("--budget-mb").arg("42").assert().success();

    cmd(&config_home)
        .current_dir(&workdir)
        .arg("config")
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("42"));
    Ok(())
}

#[test]
fn add_file_missing_source_fails() -> Result<(), Box<dyn std::error::Error>> {
    let config_home = assert_fs::TempDir::new()?;
    let workdir = assert_fs::TempDir::new()?;

    cmd(&config_home)
        .current_dir(&workdir)
        .arg("add-file")
        .arg("out.txt")
        .arg("--from")
        .arg("does-not-exist.txt")
        .assert()
        .success();

    cmd(&config_home).current_dir(&workdir).arg("run").assert().failure();
    Ok(())
}
