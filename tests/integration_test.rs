mod common;

use assert_cmd::Command;
use predicates::prelude::*;

use common::{TestCommand, TestEnvironment};

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("push-gateway").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Multi-provider push notification gateway"));
}

#[test]
fn test_cli_version() {
    TestCommand::new()
        .arg("--version")
        .expect_success()
        .stdout_contains("push-gateway")
        .done();
}

#[test]
fn test_init_command() {
    let env = TestEnvironment::new();

    env.command()
        .arg("init")
        .expect_success()
        .stdout_contains("Configuration initialized successfully")
        .done();
    assert!(env.config_path.exists());

    env.command()
        .arg("init")
        .expect_success()
        .stdout_contains("Use --force to overwrite")
        .done();

    env.command().args(["init", "--force"]).expect_success().done();
}

#[test]
fn test_config_env_var() {
    let env = TestEnvironment::new();

    TestCommand::new()
        .env("PUSH_GATEWAY_CONFIG", env.config_path.to_string_lossy())
        .args(["config", "path"])
        .expect_success()
        .stdout_contains("config.toml")
        .done();
    assert!(env.config_path.exists());
}

#[test]
fn test_config_show_redacts_tokens() {
    let env = TestEnvironment::new();
    std::fs::write(
        &env.config_path,
        "[providers.huawei]\nendpoint = \"https://relay.example.com\"\nauth_token = \"s3cret\"\n",
    )
    .unwrap();

    let assertion = env
        .command()
        .args(["config", "show"])
        .expect_success()
        .stdout_contains("<redacted>");
    assert!(!assertion.stdout().contains("s3cret"));
}

#[test]
fn test_platforms_lists_enabled_providers() {
    let env = TestEnvironment::with_file_store();

    let assertion = env
        .command()
        .arg("platforms")
        .expect_success()
        .stdout_contains("ios");
    assert!(!assertion.stdout().contains("android"));
}

#[test]
fn test_send_dry_run() {
    let env = TestEnvironment::with_file_store();

    env.command()
        .args([
            "send", "--platform", "apns", "--token", "t1", "--token", "t2", "--title", "Hi",
            "--content", "There", "--dry-run",
        ])
        .expect_success()
        .stdout_contains("Dry run")
        .stdout_contains("2 token(s)")
        .done();

    env.command()
        .args(["stats", "show", "--platform", "ios", "--json"])
        .expect_success()
        .stdout_contains("\"total\": 0")
        .done();
}

#[test]
fn test_send_validation_error() {
    let env = TestEnvironment::with_file_store();

    env.command()
        .args(["send", "--platform", "ios", "--token", "t1", "--content", "Body"])
        .expect_failure()
        .stderr_contains("title")
        .done();
}

#[test]
fn test_send_to_unregistered_platform() {
    let env = TestEnvironment::with_file_store();

    env.command()
        .args([
            "send", "--platform", "android", "--token", "t1", "--title", "a", "--content", "b",
        ])
        .expect_failure()
        .stderr_contains("No provider registered")
        .done();
}

#[test]
fn test_failed_send_is_counted() {
    let env = TestEnvironment::with_file_store();

    env.command()
        .args([
            "send", "--platform", "ios", "--token", "t1", "--title", "a", "--content", "b",
        ])
        .expect_failure()
        .stdout_contains("0 sent, 1 failed")
        .done();

    env.command()
        .args(["stats", "show", "--platform", "ios", "--json"])
        .expect_success()
        .stdout_contains("\"total\": 1")
        .stdout_contains("\"failed\": 1")
        .done();
}

#[test]
fn test_stats_persist_across_processes() {
    let env = TestEnvironment::with_file_store();

    env.command()
        .args(["stats", "set", "huawei", "display", "42"])
        .expect_success()
        .done();
    assert!(env.counters_path.exists());

    env.command()
        .args(["stats", "add", "hms", "display", "8"])
        .expect_success()
        .stdout_contains("huawei display += 8")
        .done();

    env.command()
        .args(["stats", "show"])
        .expect_success()
        .stdout_contains_all(["platform", "huawei", "50"])
        .done();

    env.command().args(["stats", "reset"]).expect_success().done();
    env.command()
        .args(["stats", "show", "--platform", "huawei", "--json"])
        .expect_success()
        .stdout_contains("\"display\": 0")
        .done();
}

#[test]
fn test_stats_changes_on_memory_engine_warn() {
    let env = TestEnvironment::new();

    for args in [
        vec!["stats", "set", "ios", "total", "1"],
        vec!["stats", "add", "ios", "total", "-1"],
        vec!["stats", "reset"],
    ] {
        env.command()
            .args(args)
            .expect_success()
            .stderr_contains("dropped when the process exits")
            .done();
    }

    env.command()
        .args(["stats", "show"])
        .expect_success()
        .stderr_lacks("dropped when the process exits")
        .done();
}

#[test]
fn test_stats_on_file_engine_do_not_warn() {
    let env = TestEnvironment::with_file_store();

    env.command()
        .args(["stats", "set", "ios", "total", "1"])
        .expect_success()
        .stderr_lacks("dropped when the process exits")
        .done();
}

#[test]
fn test_send_accepts_negative_retry_interval() {
    let env = TestEnvironment::with_file_store();

    env.command()
        .args([
            "send", "--platform", "ios", "--token", "t1", "--title", "Hi", "--content", "There",
            "--dry-run", "--retry", "1", "--retry-interval", "-1",
        ])
        .expect_success()
        .done();
}

#[test]
fn test_stats_rejects_unknown_metric() {
    let env = TestEnvironment::with_file_store();

    env.command()
        .args(["stats", "set", "ios", "opens", "1"])
        .expect_failure()
        .stderr_contains("Unknown metric")
        .done();
}
