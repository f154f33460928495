//! Identity listings

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::table::{self, Layout, Row, TableSpec};

/// `pebble identities`
pub const IDENTITIES: TableSpec = TableSpec {
    columns: &["Name", "Access", "Types"],
    layout: Layout::Whitespace,
    empty_markers: &["No identities."],
};

/// Redacted stand-in for a basic identity's password hash
pub const REDACTED: &str = "*****";

/// Username/password identity; the hash is never shown by the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicIdentity {
    /// Always [`REDACTED`]
    pub password: String,
}

/// Identity matched by the peer uid of a local connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalIdentity {
    /// The CLI does not print the uid, so this is `None`
    pub user_id: Option<u32>,
}

/// An identity and the ways it can authenticate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Access level, e.g. `admin`, `read`, `untrusted`
    pub access: String,
    /// Present when the identity has a `basic` credential
    pub basic: Option<BasicIdentity>,
    /// Present when the identity has a `local` credential
    pub local: Option<LocalIdentity>,
}

impl Identity {
    /// Decode one row into the identity's name and value
    pub fn from_row(row: &Row) -> (String, Self) {
        let types: Vec<&str> = row.field("Types").split(',').map(str::trim).collect();
        let identity = Self {
            access: row.field("Access").to_string(),
            basic: types.contains(&"basic").then(|| BasicIdentity {
                password: REDACTED.to_string(),
            }),
            local: types
                .contains(&"local")
                .then_some(LocalIdentity { user_id: None }),
        };
        (row.field("Name").to_string(), identity)
    }
}

/// Decode the output of `pebble identities`, keeping listing order
pub fn parse_identities(text: &str) -> Result<IndexMap<String, Identity>> {
    Ok(table::parse(text, &IDENTITIES)?
        .rows()
        .iter()
        .map(Identity::from_row)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_identities() {
        let text = "\
Name   Access  Types
alice  admin   local
bob    read    basic
carol  admin   basic,local
";
        let identities = parse_identities(text).unwrap();

        let names: Vec<&str> = identities.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);

        let alice = &identities["alice"];
        assert_eq!(alice.access, "admin");
        assert_eq!(alice.local, Some(LocalIdentity { user_id: None }));
        assert!(alice.basic.is_none());

        let bob = &identities["bob"];
        assert_eq!(bob.basic.as_ref().map(|b| b.password.as_str()), Some(REDACTED));
        assert!(bob.local.is_none());

        let carol = &identities["carol"];
        assert!(carol.basic.is_some() && carol.local.is_some());
    }

    #[test]
    fn test_no_identities() {
        assert!(parse_identities("No identities.\n").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_type_ignored() {
        let identities = parse_identities("Name Access Types\nsvc read cert").unwrap();
        let svc = &identities["svc"];
        assert!(svc.basic.is_none() && svc.local.is_none());
    }

    #[test]
    fn test_identities_missing_column() {
        let err = parse_identities("Name Types\nalice local").unwrap_err();
        assert!(matches!(err, Error::HeaderColumnMissing { ref column, .. } if column == "Access"));
    }
}
