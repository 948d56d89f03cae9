use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

#[test]
fn cli_env_prints_resolved_environment_without_ansi() {
    let home = temp_home("cli-env", "ASTRIA_SEQUENCER_CHAIN_ID=sequencer-test-chain-0\n");

    let output = Command::new(env!("CARGO_BIN_EXE_devstack"))
        .arg("env")
        .arg("--set")
        .arg("ASTRIA_COMPOSER_LOG=debug")
        .env("HOME", &home)
        .env("NO_COLOR", "1")
        .env("DEVSTACK_COLOR", "always")
        .output()
        .expect("run devstack");

    assert!(
        output.status.success(),
        "stdout={}\nstderr={}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    assert!(stdout.contains("Stack Environment"));
    assert!(stdout.contains("ASTRIA_SEQUENCER_CHAIN_ID"));
    assert!(stdout.contains("sequencer-test-chain-0"));
    assert!(stdout.contains("ASTRIA_COMPOSER_LOG"));
    assert!(!stdout.contains('\u{1b}'));
}

#[test]
fn cli_processes_lists_default_fleet_in_startup_order() {
    let home = temp_home("cli-processes", "");

    let output = Command::new(env!("CARGO_BIN_EXE_devstack"))
        .arg("processes")
        .env("HOME", &home)
        .env("NO_COLOR", "1")
        .output()
        .expect("run devstack");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    let positions = ["Sequencer", "Cometbft", "Composer", "Conductor"]
        .iter()
        .map(|title| stdout.find(title).expect("process listed"))
        .collect::<Vec<usize>>();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(stdout.contains("node --home"));
    assert!(stdout.contains("<default fleet>"));
    assert!(stdout.contains("Conductor: binary not found at"));
}

#[test]
fn cli_missing_env_file_fails_with_diagnostic() {
    let home = temp_dir("cli-missing-env");
    fs::create_dir_all(&home).expect("mkdir home");

    let output = Command::new(env!("CARGO_BIN_EXE_devstack"))
        .arg("processes")
        .env("HOME", &home)
        .env("NO_COLOR", "1")
        .output()
        .expect("run devstack");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    assert!(stderr.contains("[error] devstack failed"));
    assert!(stderr.contains("failed to read environment file"));
}

#[test]
fn cli_parse_error_includes_usage_in_stderr() {
    let output = Command::new(env!("CARGO_BIN_EXE_devstack"))
        .arg("run")
        .arg("--instance")
        .env("NO_COLOR", "1")
        .output()
        .expect("run devstack");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    assert!(stderr.contains("Invalid command arguments"));
    assert!(stderr.contains("--instance requires a value"));
    assert!(stderr.contains("USAGE:"));
    assert!(!stderr.contains('\u{1b}'));
}

#[test]
fn cli_error_block_is_colorized_when_forced() {
    let output = Command::new(env!("CARGO_BIN_EXE_devstack"))
        .arg("deploy")
        .env("DEVSTACK_COLOR", "always")
        .env_remove("NO_COLOR")
        .output()
        .expect("run devstack");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    assert!(stderr.contains("unknown command: deploy"));
    assert!(stderr.contains('\u{1b}'));
}

#[test]
fn cli_help_prints_usage() {
    let output = Command::new(env!("CARGO_BIN_EXE_devstack"))
        .arg("--help")
        .output()
        .expect("run devstack");

    assert!(output.status.success());
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    assert!(stderr.contains("devstack run"));
    assert!(stderr.contains("DEVSTACK_TUI_DIAGNOSTICS"));
}

fn temp_dir(name: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    std::env::temp_dir().join(format!("devstack-cli-{name}-{ts}"))
}

fn temp_home(name: &str, env: &str) -> PathBuf {
    let home = temp_dir(name);
    let instance = home.join(".devstack").join("default");
    fs::create_dir_all(&instance).expect("mkdir instance");
    fs::write(instance.join(".env"), env).expect("write env file");
    home
}
