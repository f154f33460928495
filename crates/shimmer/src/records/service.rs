//! Service and health-check listings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decode;
use crate::error::Result;
use crate::table::{self, Layout, Row, TableSpec};

/// `pebble services --abs-time`
pub const SERVICES: TableSpec = TableSpec {
    columns: &["Service", "Startup", "Current", "Since"],
    layout: Layout::Whitespace,
    empty_markers: &["Plan has no services."],
};

/// `pebble checks`
pub const CHECKS: TableSpec = TableSpec {
    columns: &["Check", "Level", "Status"],
    layout: Layout::Whitespace,
    empty_markers: &["Plan has no health checks."],
};

/// Status of one service
///
/// `startup` and `current` are passed through verbatim; pebble may grow new
/// states and the shim should not reject them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service name
    pub name: String,
    /// `enabled` or `disabled`
    pub startup: String,
    /// Current state, e.g. `active`, `inactive`, `backoff`, `error`
    pub current: String,
    /// When the service entered its current state
    pub since: Option<DateTime<Utc>>,
}

impl ServiceInfo {
    /// Decode one row of the services table
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            name: row.field("Service").to_string(),
            startup: row.field("Startup").to_string(),
            current: row.field("Current").to_string(),
            since: decode::optional_timestamp(row.field("Since"))?,
        })
    }

    /// True when the service is currently running
    pub fn is_running(&self) -> bool {
        self.current == "active"
    }
}

/// Status of one health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInfo {
    /// Check name
    pub name: String,
    /// Check level (`alive`, `ready`, or `-`)
    pub level: String,
    /// Check status, e.g. `up` or `down`
    pub status: String,
}

impl CheckInfo {
    /// Decode one row of the checks table
    pub fn from_row(row: &Row) -> Self {
        Self {
            name: row.field("Check").to_string(),
            level: row.field("Level").to_string(),
            status: row.field("Status").to_string(),
        }
    }
}

/// Decode the output of `pebble services`
pub fn parse_services(text: &str) -> Result<Vec<ServiceInfo>> {
    table::parse(text, &SERVICES)?
        .rows()
        .iter()
        .map(ServiceInfo::from_row)
        .collect()
}

/// Decode the output of `pebble checks`
pub fn parse_checks(text: &str) -> Result<Vec<CheckInfo>> {
    Ok(table::parse(text, &CHECKS)?
        .rows()
        .iter()
        .map(CheckInfo::from_row)
        .collect())
}
