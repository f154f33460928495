//! Running one binary with a frozen environment

use async_process::Stdio;
use futures::future::join3;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::command::Command;
use crate::error::{Error, Result};
use crate::process::{ChildProcess, ExecutionResult, read_all, write_input};
use crate::timeout::with_timeout;

/// Runs invocations of a single binary
///
/// Every command built by the runner is prefixed with the configured binary
/// and runs with exactly the runner's environment mapping. The mapping is
/// shared read-only between all commands, so one runner can serve concurrent
/// callers.
#[derive(Debug, Clone)]
pub struct Runner {
    binary: OsString,
    env: Arc<BTreeMap<OsString, OsString>>,
    default_timeout: Option<Duration>,
}

impl Runner {
    /// Create a runner for `binary` with an empty environment and no deadline
    pub fn new<S: AsRef<OsStr>>(binary: S) -> Self {
        Self {
            binary: binary.as_ref().to_owned(),
            env: Arc::new(BTreeMap::new()),
            default_timeout: None,
        }
    }

    /// Use `env` as the complete environment of every spawned process
    pub fn with_env(mut self, env: Arc<BTreeMap<OsString, OsString>>) -> Self {
        self.env = env;
        self
    }

    /// Deadline applied to commands built by [`Runner::command`]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// The configured binary
    pub fn binary(&self) -> &OsStr {
        &self.binary
    }

    /// The environment every process is started with
    pub fn env(&self) -> &BTreeMap<OsString, OsString> {
        &self.env
    }

    /// Build a command for the binary with the given arguments
    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .environment(Arc::clone(&self.env))
            .timeout(self.default_timeout);
        command
    }

    /// Run `command` to completion and capture its output.
    ///
    /// The exit status is returned as-is; see [`Runner::run_checked`] for the
    /// variant that fails on a non-zero exit. On timeout the process is killed
    /// and reaped before [`Error::TimedOut`] is returned.
    pub async fn run(&self, command: &Command) -> Result<ExecutionResult> {
        let argv = command.command_line();
        debug!(command = ?argv, "running command");

        let started = Instant::now();
        let mut cmd = command.prepare();
        cmd.stdin(if command.get_input().is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .map_err(|e| Error::from_spawn(command.get_program().to_string_lossy(), e))?;
        let mut child = ChildProcess::new(child, argv);

        let stdin = child.take_stdin();
        let stdout = child.take_stdout();
        let stderr = child.take_stderr();

        let collected = with_timeout(command.get_timeout(), async {
            let (written, stdout, stderr) = join3(
                write_input(stdin, command.get_input()),
                read_all(stdout),
                read_all(stderr),
            )
            .await;
            written?;
            let status = child.wait().await?;
            Ok::<_, Error>((status, stdout?, stderr?))
        })
        .await;

        match collected {
            Ok(result) => {
                let (status, stdout, stderr) = result?;
                Ok(ExecutionResult {
                    status,
                    stdout,
                    stderr,
                    elapsed: started.elapsed(),
                })
            }
            Err(limit) => {
                warn!(command = ?child.command(), timeout = ?limit, "command timed out, killing");
                if let Err(e) = child.kill_and_wait().await {
                    warn!(error = %e, "failed to reap timed out command");
                }
                Err(Error::TimedOut {
                    command: child.command().to_vec(),
                    timeout: limit,
                })
            }
        }
    }

    /// Like [`Runner::run`], but a non-zero exit is an [`Error::ExitFailure`]
    /// carrying the exit code and standard error.
    pub async fn run_checked(&self, command: &Command) -> Result<ExecutionResult> {
        let result = self.run(command).await?;
        if result.status.success() {
            return Ok(result);
        }

        Err(Error::ExitFailure {
            command: command.command_line(),
            code: result.status.exit_code(),
            stderr: result.stderr_text(),
        })
    }

    /// Spawn `command` with all three standard streams piped and hand back
    /// the live process.
    ///
    /// The command's input and timeout are not applied; the caller owns the
    /// process from here on.
    pub fn spawn(&self, command: &Command) -> Result<ChildProcess> {
        let argv = command.command_line();
        debug!(command = ?argv, "spawning command");

        let mut cmd = command.prepare();
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .map_err(|e| Error::from_spawn(command.get_program().to_string_lossy(), e))?;
        Ok(ChildProcess::new(child, argv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_prefixed_with_binary() {
        let runner = Runner::new("pebble");
        let command = runner.command(["services", "--abs-time"]);
        assert_eq!(command.command_line(), vec!["pebble", "services", "--abs-time"]);
    }

    #[test]
    fn test_command_carries_frozen_env_and_timeout() {
        let env = Arc::new(BTreeMap::from([(
            OsString::from("PEBBLE"),
            OsString::from("/run/pebble"),
        )]));
        let runner = Runner::new("pebble")
            .with_env(env)
            .with_default_timeout(Duration::from_secs(5));

        let command = runner.command(["plan"]);
        assert_eq!(
            command
                .get_environment()
                .and_then(|e| e.get(OsStr::new("PEBBLE")))
                .map(OsString::as_os_str),
            Some(OsStr::new("/run/pebble"))
        );
        assert_eq!(command.get_timeout(), Some(Duration::from_secs(5)));
    }
}
