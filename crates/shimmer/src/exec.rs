//! Running commands through `pebble exec`
//!
//! An [`ExecProcess`] owns one spawned `pebble exec` process. Callers either
//! drive the standard streams themselves and call [`ExecProcess::wait`], or
//! hand everything to [`ExecProcess::wait_output`], which feeds the buffered
//! input and collects both output streams.
//!
//! The two waits escalate differently when the deadline passes: `wait`
//! sends SIGTERM and allows the same interval again before SIGKILL, while
//! `wait_output` kills at once.

use async_process::{ChildStderr, ChildStdin, ChildStdout};
use command_executor::process::{read_all, write_input};
use command_executor::{ChildProcess, ExitStatus, IntoSignal, signal_name, with_timeout};
use futures::future::{join, join3};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// How captured output is handed back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Decode as UTF-8, replacing invalid sequences
    #[default]
    Utf8,
    /// Keep the raw bytes
    Raw,
}

/// Captured output of one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamData {
    /// Output decoded as text
    Text(String),
    /// Output as raw bytes
    Bytes(Vec<u8>),
}

impl StreamData {
    /// Wrap `bytes` according to `encoding`
    pub fn decode(bytes: Vec<u8>, encoding: Encoding) -> Self {
        match encoding {
            Encoding::Utf8 => match String::from_utf8(bytes) {
                Ok(text) => Self::Text(text),
                Err(e) => Self::Text(String::from_utf8_lossy(e.as_bytes()).into_owned()),
            },
            Encoding::Raw => Self::Bytes(bytes),
        }
    }

    /// The underlying bytes
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    /// The text, for decoded output
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(_) => None,
        }
    }

    /// True when nothing was captured
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Lifecycle of an [`ExecProcess`]
///
/// Everything but `Running` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    /// The process has not been reaped yet
    Running,
    /// The process exited with this code
    Completed(i32),
    /// The deadline passed and the process was stopped
    TimedOut,
    /// The process was killed by this signal
    Killed(i32),
}

impl ExecState {
    fn from_status(status: &ExitStatus) -> Self {
        match (status.code, status.signal) {
            (Some(code), _) => Self::Completed(code),
            (None, Some(signal)) => Self::Killed(signal),
            (None, None) => Self::Completed(-1),
        }
    }

    /// True once the process has been reaped
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Exit code, or the negated signal number
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Completed(code) => Some(*code),
            Self::Killed(signal) => Some(-signal),
            Self::Running | Self::TimedOut => None,
        }
    }
}

/// A command started with `pebble exec`
///
/// Dropping the handle while the command is still running kills it.
pub struct ExecProcess {
    command: Vec<String>,
    child: ChildProcess,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    input: Option<Vec<u8>>,
    encoding: Encoding,
    combine_stderr: bool,
    timeout: Option<Duration>,
    state: ExecState,
    /// Standard error drained by `wait` when it is combined into stdout
    drained_stderr: Vec<u8>,
    output: Option<(StreamData, Option<StreamData>)>,
}

impl ExecProcess {
    /// Take over `child`, which runs `command`, and its three standard streams
    pub fn new(mut child: ChildProcess, command: Vec<String>) -> Self {
        Self {
            command,
            stdin: child.take_stdin(),
            stdout: child.take_stdout(),
            stderr: child.take_stderr(),
            child,
            input: None,
            encoding: Encoding::default(),
            combine_stderr: false,
            timeout: None,
            state: ExecState::Running,
            drained_stderr: Vec::new(),
            output: None,
        }
    }

    /// Bytes written to stdin by [`ExecProcess::wait_output`]
    pub fn with_input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// How captured output is returned
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Fold standard error into standard output
    pub fn with_combined_stderr(mut self, combine: bool) -> Self {
        self.combine_stderr = combine;
        self
    }

    /// Deadline for the waits; `None` waits forever
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The command being executed
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Process id of the local `pebble exec` process
    pub fn pid(&self) -> u32 {
        self.child.pid()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ExecState {
        self.state
    }

    /// True once the process has been reaped
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// The live stdin, unless taken or already closed
    pub fn stdin(&mut self) -> Option<&mut ChildStdin> {
        self.stdin.as_mut()
    }

    /// The live stdout, unless taken or drained
    pub fn stdout(&mut self) -> Option<&mut ChildStdout> {
        self.stdout.as_mut()
    }

    /// The live stderr; always `None` when combined into stdout
    pub fn stderr(&mut self) -> Option<&mut ChildStderr> {
        if self.combine_stderr {
            return None;
        }
        self.stderr.as_mut()
    }

    /// Move stdin out of the handle; dropping it closes the stream
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    /// Move stdout out of the handle
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Move stderr out of the handle; `None` when combined into stdout
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        if self.combine_stderr {
            return None;
        }
        self.stderr.take()
    }

    /// Deliver a signal to the running command.
    ///
    /// Does nothing once the process has finished.
    pub fn send_signal(&self, sig: impl IntoSignal) -> Result<()> {
        let sig = sig.into_signal()?;
        if self.state.is_finished() || self.child.exit_status().is_some() {
            debug!(command = ?self.command, signal = signal_name(sig), "process finished, not signalling");
            return Ok(());
        }

        debug!(pid = self.child.pid(), signal = signal_name(sig), "signalling exec process");
        self.child.signal(sig)?;
        Ok(())
    }

    /// Wait for the command to finish.
    ///
    /// Output streams the caller has not taken stay on the handle unless the
    /// command fails, in which case they are drained into the returned
    /// [`Error::ExecutionFailed`]. On timeout the process gets SIGTERM, then
    /// SIGKILL if it outlives a second interval of the same length.
    pub async fn wait(&mut self) -> Result<()> {
        if !self.state.is_finished() {
            self.reap().await?;
        }

        let failed = matches!(self.state, ExecState::Completed(code) if code != 0)
            || matches!(self.state, ExecState::Killed(_));
        if failed && self.output.is_none() {
            self.collect(false).await?;
        }
        self.outcome()
    }

    /// Feed the buffered input, wait for the command and return its output.
    ///
    /// With combined streams, standard error is appended to standard output
    /// and the second element is `None`. The result is cached; later calls
    /// return it without waiting again. On timeout the process is killed at
    /// once.
    pub async fn wait_output(&mut self) -> Result<(StreamData, Option<StreamData>)> {
        if self.output.is_none() && self.state != ExecState::TimedOut {
            let running = !self.state.is_finished();
            self.collect(running).await?;
        }

        self.outcome()?;
        self.output.clone().ok_or_else(|| self.timeout_error())
    }

    /// Wait for exit with graceful escalation on timeout
    async fn reap(&mut self) -> Result<()> {
        let drain = if self.combine_stderr {
            self.stderr.take()
        } else {
            None
        };
        let child = &mut self.child;
        let waited = with_timeout(self.timeout, async {
            let (drained, status) = join(read_all(drain), child.wait()).await;
            Ok::<_, command_executor::Error>((status?, drained?))
        })
        .await;

        match waited {
            Ok(result) => {
                let (status, drained) = result?;
                self.drained_stderr = drained;
                self.finish(&status);
                Ok(())
            }
            Err(limit) => {
                warn!(command = ?self.command, timeout = ?limit, "exec timed out, sending SIGTERM");
                if let Err(e) = self.child.terminate() {
                    warn!(error = %e, "failed to terminate exec process");
                }
                if self.child.wait_timeout(limit).await?.is_none() {
                    warn!(command = ?self.command, "exec ignored SIGTERM, killing");
                    self.child.kill_and_wait().await?;
                }
                self.state = ExecState::TimedOut;
                Err(self.timeout_error())
            }
        }
    }

    /// Drain whatever streams are still owned, feeding input and reaping
    /// the process first when it is still running
    async fn collect(&mut self, running: bool) -> Result<()> {
        let stdin = if running { self.stdin.take() } else { None };
        let input = if running { self.input.take() } else { None };
        let stdout = self.stdout.take();
        let stderr = self.stderr.take();
        let child = &mut self.child;

        let limit = if running { self.timeout } else { None };
        let collected = with_timeout(limit, async {
            let (written, out, err) = join3(
                write_input(stdin, input.as_deref()),
                read_all(stdout),
                read_all(stderr),
            )
            .await;
            written?;
            let status = if running {
                Some(child.wait().await?)
            } else {
                None
            };
            Ok::<_, command_executor::Error>((status, out?, err?))
        })
        .await;

        let (status, mut stdout, mut stderr) = match collected {
            Ok(result) => result?,
            Err(limit) => {
                warn!(command = ?self.command, timeout = ?limit, "exec timed out, killing");
                self.child.kill_and_wait().await?;
                self.state = ExecState::TimedOut;
                return Err(self.timeout_error());
            }
        };

        if let Some(status) = status {
            self.finish(&status);
        }

        let mut drained = std::mem::take(&mut self.drained_stderr);
        drained.append(&mut stderr);
        let stderr = if self.combine_stderr {
            stdout.append(&mut drained);
            None
        } else {
            Some(StreamData::decode(drained, self.encoding))
        };
        self.output = Some((StreamData::decode(stdout, self.encoding), stderr));
        Ok(())
    }

    fn finish(&mut self, status: &ExitStatus) {
        self.state = ExecState::from_status(status);
        info!(command = ?self.command, state = ?self.state, "exec finished");
    }

    fn outcome(&self) -> Result<()> {
        match self.state {
            ExecState::Running | ExecState::Completed(0) => Ok(()),
            ExecState::TimedOut => Err(self.timeout_error()),
            ExecState::Completed(_) | ExecState::Killed(_) => {
                let (stdout, stderr) = self.output.clone().unwrap_or_else(|| {
                    let empty = StreamData::decode(Vec::new(), self.encoding);
                    let stderr = (!self.combine_stderr).then(|| empty.clone());
                    (empty, stderr)
                });
                Err(Error::ExecutionFailed {
                    command: self.command.clone(),
                    exit_code: self.state.exit_code().unwrap_or(-1),
                    stdout,
                    stderr,
                })
            }
        }
    }

    fn timeout_error(&self) -> Error {
        Error::Timeout {
            command: self.command.clone(),
            timeout: self.timeout.unwrap_or_default(),
        }
    }
}

impl std::fmt::Debug for ExecProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecProcess")
            .field("command", &self.command)
            .field("pid", &self.child.pid())
            .field("state", &self.state)
            .field("encoding", &self.encoding)
            .field("combine_stderr", &self.combine_stderr)
            .field("timeout", &self.timeout)
            .finish()
    }
}
