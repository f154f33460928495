//! Tests for running commands to completion

use anyhow::Result;
use command_executor::{Error, Runner};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;
use std::sync::Arc;
use std::time::Duration;

fn sh() -> Runner {
    let env = Arc::new(BTreeMap::from([(
        OsString::from("PATH"),
        std::env::var_os("PATH").unwrap_or_else(|| OsString::from("/usr/bin:/bin")),
    )]));
    Runner::new("sh").with_env(env)
}

#[smol_potat::test]
async fn test_captures_stdout_and_stderr() -> Result<()> {
    let runner = sh();
    let command = runner.command(["-c", "printf out; printf err >&2"]);

    let result = runner.run(&command).await?;

    assert!(result.status.success());
    assert_eq!(result.stdout_text(), "out");
    assert_eq!(result.stderr_text(), "err");

    Ok(())
}

#[smol_potat::test]
async fn test_input_is_piped_to_stdin() -> Result<()> {
    let runner = sh();
    let mut command = runner.command(["-c", "cat"]);
    command.input("hello from stdin");

    let result = runner.run(&command).await?;

    assert_eq!(result.stdout_text(), "hello from stdin");

    Ok(())
}

#[smol_potat::test]
async fn test_child_ignoring_input_is_not_an_error() -> Result<()> {
    let runner = sh();
    let mut command = runner.command(["-c", "exit 0"]);
    command.input(vec![b'x'; 1 << 20]);

    let result = runner.run(&command).await?;

    assert!(result.status.success());

    Ok(())
}

#[smol_potat::test]
async fn test_environment_is_frozen_mapping() -> Result<()> {
    let env = Arc::new(BTreeMap::from([(
        OsString::from("PEBBLE"),
        OsString::from("/tmp/pebble"),
    )]));
    let runner = Runner::new("/bin/sh").with_env(env);
    let command = runner.command(["-c", "printf '%s|%s' \"$PEBBLE\" \"${HOME:-unset}\""]);

    let result = runner.run(&command).await?;

    assert_eq!(result.stdout_text(), "/tmp/pebble|unset");

    Ok(())
}

#[smol_potat::test]
async fn test_environment_passes_non_utf8_values() -> Result<()> {
    let env = Arc::new(BTreeMap::from([(
        OsString::from("RAW"),
        OsString::from_vec(b"caf\xe9".to_vec()),
    )]));
    let runner = Runner::new("/bin/sh").with_env(env);
    let command = runner.command(["-c", "printf '%s' \"$RAW\""]);

    let result = runner.run(&command).await?;

    assert_eq!(result.stdout, b"caf\xe9");

    Ok(())
}

#[smol_potat::test]
async fn test_exit_code_propagation() -> Result<()> {
    let runner = sh();
    let command = runner.command(["-c", "exit 42"]);

    let result = runner.run(&command).await?;

    assert_eq!(result.status.code, Some(42));

    Ok(())
}

#[smol_potat::test]
async fn test_run_checked_reports_exit_failure() {
    let runner = sh();
    let command = runner.command(["-c", "echo 'error: no such service' >&2; exit 1"]);

    let err = runner.run_checked(&command).await.unwrap_err();

    match err {
        Error::ExitFailure {
            command,
            code,
            stderr,
        } => {
            assert_eq!(command[0], "sh");
            assert_eq!(code, 1);
            assert_eq!(stderr, "error: no such service\n");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[smol_potat::test]
async fn test_command_not_found() {
    let runner = Runner::new("this_command_does_not_exist_12345");
    let command = runner.command(["version"]);

    let err = runner.run(&command).await.unwrap_err();

    assert!(matches!(
        err,
        Error::CommandNotFound { ref command } if command == "this_command_does_not_exist_12345"
    ));
}

#[smol_potat::test]
async fn test_timeout_is_reported_once() {
    let runner = sh().with_default_timeout(Duration::from_millis(200));
    let command = runner.command(["-c", "sleep 30"]);

    let started = std::time::Instant::now();
    let err = runner.run(&command).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(10));
    match err {
        Error::TimedOut { command, timeout } => {
            assert_eq!(command, vec!["sh", "-c", "sleep 30"]);
            assert_eq!(timeout, Duration::from_millis(200));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[smol_potat::test]
async fn test_spawn_hands_back_live_process() -> Result<()> {
    let runner = sh();
    let command = runner.command(["-c", "exit 3"]);

    let mut child = runner.spawn(&command)?;
    assert!(child.pid() > 0);
    assert!(child.exit_status().is_none());

    let status = child.wait().await?;
    assert_eq!(status.code, Some(3));
    assert_eq!(child.exit_status(), Some(&status));

    Ok(())
}
