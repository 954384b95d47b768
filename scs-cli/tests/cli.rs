use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn scs_cmd(cwd: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("scs"));
    cmd.current_dir(cwd)
        .env_remove("SCS_API_KEY")
        .env_remove("API_KEY")
        .env_remove("apiKey")
        .env("RUST_LOG", "warn");
    cmd
}

fn init(cwd: &Path) {
    scs_cmd(cwd)
        .args(["init", "--universe", "100", "--place", "200"])
        .assert()
        .success();
}

#[test]
fn no_subcommand_prints_usage_and_succeeds() {
    let dir = TempDir::new().expect("dir");
    scs_cmd(dir.path())
        .assert()
        .success()
        .stdout(contains("Usage"))
        .stdout(contains("pull"))
        .stdout(contains("monitor"));
}

#[test]
fn init_writes_config_and_mirror_dir() {
    let dir = TempDir::new().expect("dir");
    scs_cmd(dir.path())
        .args([
            "init",
            "--universe",
            "100",
            "--place",
            "200",
            "--allow",
            "ServerScriptService",
        ])
        .assert()
        .success()
        .stdout(contains("scs.yaml"));

    let yaml = fs::read_to_string(dir.path().join("scs.yaml")).expect("config");
    assert!(yaml.contains("universe_id: '100'") || yaml.contains("universe_id: \"100\""));
    assert!(yaml.contains("ServerScriptService"));
    assert!(dir.path().join("ScriptExplorer").is_dir());
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().expect("dir");
    init(dir.path());

    scs_cmd(dir.path())
        .args(["init", "--universe", "1", "--place", "2"])
        .assert()
        .failure()
        .stderr(contains("--force"));

    scs_cmd(dir.path())
        .args(["init", "--universe", "1", "--place", "2", "--force"])
        .assert()
        .success();
    let yaml = fs::read_to_string(dir.path().join("scs.yaml")).expect("config");
    assert!(yaml.contains("place_id: '2'") || yaml.contains("place_id: \"2\""));
}

#[test]
fn pull_without_config_points_at_init() {
    let dir = TempDir::new().expect("dir");
    scs_cmd(dir.path())
        .arg("pull")
        .assert()
        .failure()
        .stderr(contains("scs init"));
}

#[test]
fn push_without_api_key_fails_before_any_request() {
    let dir = TempDir::new().expect("dir");
    init(dir.path());

    scs_cmd(dir.path())
        .arg("push")
        .assert()
        .failure()
        .stderr(contains("no API key found"));
}

#[test]
fn global_mirror_flag_is_honoured_by_init() {
    let dir = TempDir::new().expect("dir");
    scs_cmd(dir.path())
        .args(["--mirror", "scripts", "init", "--universe", "1", "--place", "2"])
        .assert()
        .success();
    assert!(dir.path().join("scripts").is_dir());
    assert!(!dir.path().join("ScriptExplorer").exists());
}
