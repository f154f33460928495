//! Child processes and their results

use async_process::{Child, ChildStderr, ChildStdin, ChildStdout};
use futures_lite::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::io;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::timeout::with_timeout;

/// Process exit status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code if the process exited normally
    pub code: Option<i32>,
    /// Signal that terminated the process (Unix only)
    pub signal: Option<i32>,
}

impl ExitStatus {
    /// Returns true if the process exited successfully (code 0)
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Returns true if the process was terminated by a signal
    pub fn terminated_by_signal(&self) -> bool {
        self.signal.is_some()
    }

    /// Single integer view of the status: the exit code, or the negated
    /// signal number when the process was killed by a signal.
    pub fn exit_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => -signal,
            (None, None) => -1,
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;
        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }
}

/// Output of a command that ran to completion
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// How the process exited
    pub status: ExitStatus,
    /// Everything written to standard output
    pub stdout: Vec<u8>,
    /// Everything written to standard error
    pub stderr: Vec<u8>,
    /// Wall-clock time between spawn and exit
    pub elapsed: Duration,
}

impl ExecutionResult {
    /// Standard output decoded as UTF-8 (lossy)
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Standard error decoded as UTF-8 (lossy)
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// A handle to control a running local process
///
/// The standard streams stay on the handle until taken. The process is killed
/// when the handle is dropped before it has been reaped.
pub struct ChildProcess {
    /// The underlying child process
    child: Child,
    /// Command line used to start it, for diagnostics
    command: Vec<String>,
    /// Exit status once observed
    status: Option<ExitStatus>,
}

impl ChildProcess {
    pub(crate) fn new(child: Child, command: Vec<String>) -> Self {
        Self {
            child,
            command,
            status: None,
        }
    }

    /// Get the process ID
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// The command line this process was started with
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Exit status, if the process has already been reaped
    pub fn exit_status(&self) -> Option<&ExitStatus> {
        self.status.as_ref()
    }

    /// Take ownership of the stdin pipe
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    /// Take ownership of the stdout pipe
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take ownership of the stderr pipe
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Wait for the process to complete and return its exit status
    ///
    /// Once observed, the status is cached and returned by later calls.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = &self.status {
            return Ok(status.clone());
        }

        let status = ExitStatus::from(self.child.status().await?);
        debug!(pid = self.child.id(), code = ?status.code, signal = ?status.signal, "process exited");
        self.status = Some(status.clone());
        Ok(status)
    }

    /// Wait for the process to exit for at most `limit`.
    ///
    /// Returns `Ok(None)` when the deadline passes first; the process is left
    /// running so the caller can choose how to escalate.
    pub async fn wait_timeout(&mut self, limit: Duration) -> Result<Option<ExitStatus>> {
        match with_timeout(Some(limit), self.wait()).await {
            Ok(status) => status.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Deliver `sig` to the process
    pub fn signal(&self, sig: Signal) -> Result<()> {
        let pid = Pid::from_raw(self.child.id() as i32);
        signal::kill(pid, sig).map_err(|e| Error::signal_failed(sig as i32, e.to_string()))
    }

    /// Send SIGTERM for graceful shutdown
    pub fn terminate(&self) -> Result<()> {
        self.signal(Signal::SIGTERM)
    }

    /// Send SIGKILL to forcefully stop the process
    pub fn kill(&mut self) -> Result<()> {
        self.child
            .kill()
            .map_err(|e| Error::signal_failed(Signal::SIGKILL as i32, e.to_string()))
    }

    /// Kill the process and reap it, so no running process is left behind
    pub async fn kill_and_wait(&mut self) -> Result<ExitStatus> {
        if self.status.is_none() {
            if let Err(e) = self.kill() {
                warn!(pid = self.child.id(), error = %e, "failed to kill process");
            }
        }
        self.wait().await
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if self.status.is_none() {
            // Still running as far as we know; make sure it dies with the handle
            let _ = self.child.kill();
        }
    }
}

/// Write `input` to `stdin` and close it.
///
/// A child that exits without reading its input is not an error.
pub async fn write_input(stdin: Option<ChildStdin>, input: Option<&[u8]>) -> io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };

    if let Some(input) = input {
        match stdin.write_all(input).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
            Err(e) => return Err(e),
        }
    }

    match stdin.close().await {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
        _ => Ok(()),
    }
}

/// Read a stream to its end; an absent stream reads as empty.
pub async fn read_all<R>(reader: Option<R>) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_prefers_code() {
        let status = ExitStatus {
            code: Some(3),
            signal: None,
        };
        assert_eq!(status.exit_code(), 3);
        assert!(!status.success());
    }

    #[test]
    fn test_exit_code_negates_signal() {
        let status = ExitStatus {
            code: None,
            signal: Some(9),
        };
        assert_eq!(status.exit_code(), -9);
        assert!(status.terminated_by_signal());
    }

    #[test]
    fn test_read_all_absent_stream_is_empty() {
        let data = futures_lite::future::block_on(read_all(None::<&[u8]>)).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_read_all_reads_to_end() {
        let data = futures_lite::future::block_on(read_all(Some(&b"hello"[..]))).unwrap();
        assert_eq!(data, b"hello");
    }
}
