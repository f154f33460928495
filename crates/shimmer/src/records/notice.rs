//! Notice listings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decode;
use crate::error::Result;
use crate::table::{self, Layout, Row, TableSpec};

/// `pebble notices --abs-time`
pub const NOTICES: TableSpec = TableSpec {
    columns: &["ID", "User", "Type", "Key", "First", "Repeated", "Occurrences"],
    layout: Layout::Aligned,
    empty_markers: &["No matching notices."],
};

/// One notice as listed by `pebble notices`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Notice id
    pub id: String,
    /// Owning user; `None` for public notices
    pub user_id: Option<u32>,
    /// Notice type, e.g. `custom` or `change-update`
    #[serde(rename = "type")]
    pub notice_type: String,
    /// Notice key
    pub key: String,
    /// First occurrence
    pub first_occurred: DateTime<Utc>,
    /// Last time the notice was repeated
    pub last_repeated: DateTime<Utc>,
    /// Number of occurrences
    pub occurrences: u64,
}

impl Notice {
    /// Decode one row of the notices table
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.field("ID").to_string(),
            user_id: decode::user_id(row.field("User"))?,
            notice_type: row.field("Type").to_string(),
            key: row.field("Key").to_string(),
            first_occurred: decode::timestamp(row.field("First"))?,
            last_repeated: decode::timestamp(row.field("Repeated"))?,
            occurrences: decode::count("occurrences", row.field("Occurrences"))?,
        })
    }
}

/// Decode the output of `pebble notices`
pub fn parse_notices(text: &str) -> Result<Vec<Notice>> {
    table::parse(text, &NOTICES)?
        .rows()
        .iter()
        .map(Notice::from_row)
        .collect()
}

/// Extract the id from a `Recorded notice 38` confirmation
pub fn recorded_id(text: &str) -> Option<String> {
    text.split_whitespace().last().map(str::to_string)
}
