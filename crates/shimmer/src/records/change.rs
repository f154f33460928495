//! Change listings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::system::ChangeId;
use crate::decode;
use crate::error::Result;
use crate::table::{self, Layout, Row, TableSpec};

/// `pebble changes --abs-time`
pub const CHANGES: TableSpec = TableSpec {
    columns: &["ID", "Status", "Spawn", "Ready", "Summary"],
    layout: Layout::Aligned,
    empty_markers: &["No changes."],
};

/// Statuses after which a change will make no further progress
const READY_STATUSES: &[&str] = &["Done", "Error"];

/// One change as listed by `pebble changes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Change id
    pub id: ChangeId,
    /// Status string, passed through verbatim
    pub status: String,
    /// Whether the change has finished
    pub ready: bool,
    /// When the change was created
    pub spawn_time: DateTime<Utc>,
    /// When the change finished, if it has
    pub ready_time: Option<DateTime<Utc>>,
    /// Human readable summary
    pub summary: String,
}

impl Change {
    /// Decode one row of the changes table.
    ///
    /// Readiness is derived from the status column.
    pub fn from_row(row: &Row) -> Result<Self> {
        let status = row.field("Status").to_string();
        Ok(Self {
            id: ChangeId::new(row.field("ID")),
            ready: READY_STATUSES.contains(&status.as_str()),
            spawn_time: decode::timestamp(row.field("Spawn"))?,
            ready_time: decode::optional_timestamp(row.field("Ready"))?,
            summary: row.field("Summary").to_string(),
            status,
        })
    }
}

/// Decode the output of `pebble changes`
pub fn parse_changes(text: &str) -> Result<Vec<Change>> {
    table::parse(text, &CHANGES)?
        .rows()
        .iter()
        .map(Change::from_row)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::TimeZone;

    const TEXT: &str = "\
ID   Status  Spawn                 Ready                 Summary
1    Error   2025-07-12T06:49:22Z  2025-07-12T06:50:52Z  Perform HTTP check \"demo-health\"
2    Doing   2025-07-12T06:51:00Z  -                     Start service \"demo-server\"
3    Done    2025-07-12T06:52:10Z  2025-07-12T06:52:11Z  Replan
";

    #[test]
    fn test_changes_decode() {
        let changes = parse_changes(TEXT).unwrap();

        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].id, ChangeId::new("1"));
        assert_eq!(changes[0].status, "Error");
        assert_eq!(
            changes[0].spawn_time,
            Utc.with_ymd_and_hms(2025, 7, 12, 6, 49, 22).unwrap()
        );
        assert_eq!(
            changes[0].ready_time,
            Some(Utc.with_ymd_and_hms(2025, 7, 12, 6, 50, 52).unwrap())
        );
        assert_eq!(changes[0].summary, "Perform HTTP check \"demo-health\"");
        assert_eq!(changes[1].ready_time, None);
    }

    #[test]
    fn test_readiness_follows_status_column() {
        let changes = parse_changes(TEXT).unwrap();
        let ready: Vec<(&str, bool)> = changes
            .iter()
            .map(|c| (c.status.as_str(), c.ready))
            .collect();
        assert_eq!(ready, vec![("Error", true), ("Doing", false), ("Done", true)]);
    }

    #[test]
    fn test_id_that_looks_like_a_status_is_not_ready() {
        let text = "\
ID    Status  Spawn                 Ready  Summary
Done  Doing   2025-07-12T06:51:00Z  -      Odd id
";
        let changes = parse_changes(text).unwrap();
        assert!(!changes[0].ready);
    }

    #[test]
    fn test_no_changes() {
        assert!(parse_changes("No changes.\n").unwrap().is_empty());
    }

    #[test]
    fn test_bad_spawn_time_is_decode_error() {
        let text = "\
ID   Status  Spawn               Ready  Summary
1    Done    today at 06:49 UTC  -      Replan
";
        let err = parse_changes(text).unwrap_err();
        assert!(matches!(err, Error::Decode { ref field, .. } if field == "timestamp"));
    }

    #[test]
    fn test_missing_summary_column() {
        let err = parse_changes("ID  Status  Spawn  Ready\n").unwrap_err();
        assert!(matches!(err, Error::HeaderColumnMissing { ref column, .. } if column == "Summary"));
    }
}
