//! Runtime-agnostic process runner
//!
//! This crate provides the process layer used by the Pebble CLI shim: a
//! [`Runner`] bound to one binary and a frozen environment, which either runs
//! an invocation to completion (capturing output under a timeout) or spawns a
//! live [`ChildProcess`] for callers that want to drive the standard streams
//! themselves.

#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod process;
pub mod runner;
pub mod signal;
pub mod timeout;

pub use command::Command;
pub use error::{Error, Result};
pub use process::{ChildProcess, ExecutionResult, ExitStatus};
pub use runner::Runner;
pub use signal::{IntoSignal, Signal, parse_signal, signal_name};
pub use timeout::with_timeout;
