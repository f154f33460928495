//! Typed records decoded from pebble's listings
//!
//! Each submodule pairs the [`TableSpec`](crate::table::TableSpec) of one
//! listing command with the record built from its rows.

pub mod change;
pub mod file;
pub mod identity;
pub mod notice;
pub mod service;
pub mod system;

pub use change::{Change, parse_changes};
pub use file::{FileInfo, FileType, OwnerIds, parse_listing};
pub use identity::{BasicIdentity, Identity, LocalIdentity, parse_identities};
pub use notice::{Notice, parse_notices};
pub use service::{CheckInfo, ServiceInfo, parse_checks, parse_services};
pub use system::{ChangeId, Plan, SystemInfo};
