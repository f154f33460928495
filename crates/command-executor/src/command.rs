//! One invocation of an external program

use async_process::Command as AsyncCommand;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::sync::Arc;
use std::time::Duration;

/// Everything needed to start a process once: program, arguments, the
/// complete environment, optional standard input and a deadline.
///
/// Cheap to clone; the environment is shared, not copied.
#[derive(Debug, Clone)]
pub struct Command {
    program: OsString,
    args: Vec<OsString>,
    /// Complete environment of the process; `None` inherits ours
    environment: Option<Arc<BTreeMap<OsString, OsString>>>,
    input: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

impl Command {
    /// A command running `program` with no arguments
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            environment: None,
            input: None,
            timeout: None,
        }
    }

    /// Append one argument
    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_owned()));
        self
    }

    /// Run with exactly `environment`; nothing is inherited
    pub fn environment(&mut self, environment: Arc<BTreeMap<OsString, OsString>>) -> &mut Self {
        self.environment = Some(environment);
        self
    }

    /// Bytes written to standard input once the process starts
    pub fn input(&mut self, input: impl Into<Vec<u8>>) -> &mut Self {
        self.input = Some(input.into());
        self
    }

    /// Deadline for the process to exit; `None` waits forever
    pub fn timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// The program to run
    pub fn get_program(&self) -> &OsStr {
        &self.program
    }

    /// The arguments, without the program
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// The complete environment, when one was set
    pub fn get_environment(&self) -> Option<&BTreeMap<OsString, OsString>> {
        self.environment.as_deref()
    }

    /// The standard input payload
    pub fn get_input(&self) -> Option<&[u8]> {
        self.input.as_deref()
    }

    /// The deadline
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Program followed by arguments, lossily converted for logs and errors
    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|part| part.to_string_lossy().into_owned())
            .collect()
    }

    /// Build the `async_process::Command` for this invocation.
    ///
    /// Standard streams are left for the caller to configure.
    pub fn prepare(&self) -> AsyncCommand {
        let mut cmd = AsyncCommand::new(&self.program);
        cmd.args(&self.args);

        if let Some(environment) = &self.environment {
            cmd.env_clear();
            cmd.envs(environment.iter());
        }

        cmd
    }
}
