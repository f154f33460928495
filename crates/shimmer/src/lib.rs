//! Pebble client over the `pebble` command line
//!
//! `shimmer` offers the operations of a Pebble API client, but instead of
//! talking to the daemon's socket it runs the `pebble` binary and decodes the
//! tables it prints. This is useful where only the CLI is available, or to
//! exercise a workload exactly the way an operator would.
//!
//! ```no_run
//! use shimmer::{ClientConfig, PebbleCliClient};
//!
//! # smol::block_on(async {
//! let client = PebbleCliClient::new(
//!     ClientConfig::default().with_socket_path("/var/lib/pebble/default/.pebble.socket"),
//! );
//! for service in client.get_services(&[]).await? {
//!     println!("{} is {}", service.name, service.current);
//! }
//! # Ok::<(), shimmer::Error>(())
//! # });
//! ```
//!
//! The crate is layered: [`table`] splits listings into rows, [`decode`] and
//! [`records`] turn rows into typed values, [`exec`] manages commands run
//! through `pebble exec`, and [`client`] ties these to the CLI.

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod exec;
pub mod records;
pub mod table;

pub use client::{
    ChangeState, CheckLevel, ExecOptions, MakeDirOptions, NoticesQuery, NoticesUsers,
    PebbleCliClient,
};
pub use command_executor::Signal;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use exec::{Encoding, ExecProcess, ExecState, StreamData};
pub use records::{
    BasicIdentity, Change, ChangeId, CheckInfo, FileInfo, FileType, Identity, LocalIdentity,
    Notice, OwnerIds, Plan, ServiceInfo, SystemInfo,
};
