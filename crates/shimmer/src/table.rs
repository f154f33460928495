//! Columnar table parser for pebble's human-readable listings
//!
//! Pebble prints its listings as a header line followed by data lines, with
//! columns padded for reading rather than parsing:
//!
//! ```text
//! ID   Status  Spawn                 Ready                 Summary
//! 1    Error   2025-07-12T06:49:22Z  2025-07-12T06:50:52Z  Perform HTTP check "demo-health"
//! ```
//!
//! Column boundaries come from where each expected name starts in the header.
//! Tables whose values may contain spaces are sliced at those offsets
//! ([`Layout::Aligned`]); simpler tables are split on whitespace
//! ([`Layout::Whitespace`]), using the header only to check the columns exist.

use indexmap::IndexMap;
use tracing::trace;

use crate::error::{Error, Result};

/// How data lines are split into fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Slice each line at the header's column offsets; the last column runs to end of line
    Aligned,
    /// Take the first N whitespace-separated tokens of each line
    Whitespace,
}

/// The shape of one listing command's output
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    /// Expected column names, in header order
    pub columns: &'static [&'static str],
    /// How rows are split
    pub layout: Layout,
    /// Whole-output lines that mean "nothing to list"
    pub empty_markers: &'static [&'static str],
}

/// A located header column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name as printed in the header
    pub name: String,
    /// Character offset of the name in the header line
    pub start: usize,
}

/// One data line, keyed by column name in header order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    fields: IndexMap<String, String>,
}

impl Row {
    /// The trimmed value of `column`, if the table has that column
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// The trimmed value of `column`, empty when absent
    pub fn field(&self, column: &str) -> &str {
        self.get(column).unwrap_or_default()
    }

    /// Number of fields; always the table's column count
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True for a row without fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Header columns plus the rows decoded against them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl ParsedTable {
    /// Located columns; empty when the output was empty or a sentinel
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Rows in input order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consume the table, keeping the rows
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse `text` as a table shaped like `spec`
///
/// Empty output and the spec's sentinel lines yield an empty table. A header
/// lacking one of the expected columns fails with
/// [`Error::HeaderColumnMissing`]. Blank lines and lines with fewer tokens
/// than there are columns are skipped.
pub fn parse(text: &str, spec: &TableSpec) -> Result<ParsedTable> {
    let text = text.trim();
    if text.is_empty() || spec.empty_markers.contains(&text) {
        return Ok(ParsedTable::default());
    }

    let mut lines = text.lines();
    let Some(header) = lines.next() else {
        return Ok(ParsedTable::default());
    };

    let columns = locate_columns(header, spec.columns)?;
    let rows = lines
        .filter_map(|line| slice_row(line, &columns, spec.layout))
        .collect();

    Ok(ParsedTable { columns, rows })
}

/// Find each name in the header, searching after the previous one.
///
/// Offsets are therefore strictly increasing, and a name that is a substring
/// of an earlier header word cannot match inside it.
fn locate_columns(header: &str, names: &[&str]) -> Result<Vec<Column>> {
    let mut columns = Vec::with_capacity(names.len());
    let mut from = 0;

    for name in names {
        let found = header[from..].find(name).map(|offset| from + offset);
        let Some(byte_start) = found else {
            return Err(Error::HeaderColumnMissing {
                column: (*name).to_string(),
                header: header.to_string(),
            });
        };

        columns.push(Column {
            name: (*name).to_string(),
            start: header[..byte_start].chars().count(),
        });
        from = byte_start + name.len();
    }

    Ok(columns)
}

fn slice_row(line: &str, columns: &[Column], layout: Layout) -> Option<Row> {
    if line.trim().is_empty() {
        return None;
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < columns.len() {
        trace!(line, expected = columns.len(), found = tokens.len(), "skipping short row");
        return None;
    }

    let fields = match layout {
        Layout::Whitespace => columns
            .iter()
            .zip(tokens)
            .map(|(column, token)| (column.name.clone(), token.to_string()))
            .collect(),
        Layout::Aligned => {
            let chars: Vec<char> = line.chars().collect();
            columns
                .iter()
                .enumerate()
                .map(|(i, column)| {
                    let end = columns
                        .get(i + 1)
                        .map_or(chars.len(), |next| next.start.min(chars.len()));
                    let start = column.start.min(end);
                    let value: String = chars[start..end].iter().collect();
                    (column.name.clone(), value.trim().to_string())
                })
                .collect()
        }
    };

    Some(Row { fields })
}

/// Split off the first `count` whitespace-separated tokens of `line`.
///
/// Returns the tokens and the remainder with its surrounding whitespace
/// removed, or `None` when the line has fewer than `count` tokens.
pub fn split_leading(line: &str, count: usize) -> Option<(Vec<&str>, &str)> {
    let mut rest = line.trim_start();
    let mut tokens = Vec::with_capacity(count);

    for _ in 0..count {
        if rest.is_empty() {
            return None;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        tokens.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }

    Some((tokens, rest.trim_end()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANGES: TableSpec = TableSpec {
        columns: &["ID", "Status", "Spawn", "Ready", "Summary"],
        layout: Layout::Aligned,
        empty_markers: &["No changes."],
    };

    const SERVICES: TableSpec = TableSpec {
        columns: &["Service", "Startup", "Current", "Since"],
        layout: Layout::Whitespace,
        empty_markers: &["Plan has no services."],
    };

    const CHANGES_TEXT: &str = "\
ID   Status  Spawn                 Ready                 Summary
1    Error   2025-07-12T06:49:22Z  2025-07-12T06:50:52Z  Perform HTTP check \"demo-health\"
2    Done    2025-07-12T06:49:22Z  2025-07-12T06:49:22Z  Execute command \"echo\"
";

    #[test]
    fn test_aligned_slices_at_header_offsets() {
        let table = parse(CHANGES_TEXT, &CHANGES).unwrap();

        assert_eq!(table.len(), 2);
        let row = &table.rows()[0];
        assert_eq!(row.field("ID"), "1");
        assert_eq!(row.field("Status"), "Error");
        assert_eq!(row.field("Spawn"), "2025-07-12T06:49:22Z");
        assert_eq!(row.field("Summary"), "Perform HTTP check \"demo-health\"");
    }

    #[test]
    fn test_column_offsets_are_increasing() {
        let table = parse(CHANGES_TEXT, &CHANGES).unwrap();
        let starts: Vec<usize> = table.columns().iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![0, 5, 13, 35, 57]);
    }

    #[test]
    fn test_rows_have_one_field_per_column() {
        let table = parse(CHANGES_TEXT, &CHANGES).unwrap();
        for row in table.rows() {
            assert_eq!(row.len(), table.columns().len());
        }
    }

    #[test]
    fn test_parsing_is_idempotent_and_order_preserving() {
        let first = parse(CHANGES_TEXT, &CHANGES).unwrap();
        let second = parse(CHANGES_TEXT, &CHANGES).unwrap();
        assert_eq!(first, second);

        let ids: Vec<&str> = first.rows().iter().map(|r| r.field("ID")).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_whitespace_layout_takes_leading_tokens() {
        let text = "Service Startup Current Since\nsvc1 enabled active 2025-07-12T06:55:57Z";
        let table = parse(text, &SERVICES).unwrap();

        assert_eq!(table.len(), 1);
        let fields: Vec<(&str, &str)> = table.rows()[0].iter().collect();
        assert_eq!(
            fields,
            vec![
                ("Service", "svc1"),
                ("Startup", "enabled"),
                ("Current", "active"),
                ("Since", "2025-07-12T06:55:57Z"),
            ]
        );
    }

    #[test]
    fn test_sentinel_is_empty_table() {
        let table = parse("Plan has no services.\n", &SERVICES).unwrap();
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }

    #[test]
    fn test_empty_output_is_empty_table() {
        assert!(parse("", &CHANGES).unwrap().is_empty());
        assert!(parse("  \n\n", &CHANGES).unwrap().is_empty());
    }

    #[test]
    fn test_header_only_has_no_rows() {
        let table = parse("Service  Startup  Current  Since\n", &SERVICES).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 4);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let text = "ID   Status  Spawn                 Summary\n1    Done    2025-07-12T06:49:22Z  x";
        let err = parse(text, &CHANGES).unwrap_err();
        assert!(matches!(err, Error::HeaderColumnMissing { ref column, .. } if column == "Ready"));
    }

    #[test]
    fn test_columns_must_appear_in_order() {
        let text = "Startup  Service  Current  Since\nenabled  svc  active  -";
        let err = parse(text, &SERVICES).unwrap_err();
        assert!(matches!(err, Error::HeaderColumnMissing { ref column, .. } if column == "Startup"));
    }

    #[test]
    fn test_short_and_blank_rows_skipped() {
        let text = "Service Startup Current Since\n\nsvc1 enabled\nsvc2 enabled active 2025-07-12T06:55:57Z\n";
        let table = parse(text, &SERVICES).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].field("Service"), "svc2");
    }

    #[test]
    fn test_aligned_handles_multibyte_values() {
        let text = "\
ID   Status  Spawn                 Ready                 Summary
3    Done    2025-07-12T06:49:22Z  2025-07-12T06:49:22Z  Exécuter «echo»
";
        let table = parse(text, &CHANGES).unwrap();
        assert_eq!(table.rows()[0].field("Summary"), "Exécuter «echo»");
    }

    #[test]
    fn test_split_leading_keeps_remainder() {
        let (tokens, rest) =
            split_leading("-rw-r--r--  root  root  12B  2025-07-12T09:15:20Z  my file.txt", 5)
                .unwrap();
        assert_eq!(tokens, vec!["-rw-r--r--", "root", "root", "12B", "2025-07-12T09:15:20Z"]);
        assert_eq!(rest, "my file.txt");
    }

    #[test]
    fn test_split_leading_too_few_tokens() {
        assert!(split_leading("drwxr-xr-x root", 5).is_none());
    }
}
