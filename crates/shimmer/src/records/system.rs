//! Version, plan and change-id records

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Identifier of a pebble change
///
/// Commands that wait for their change to finish do not print its id; those
/// return [`ChangeId::unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(pub String);

impl ChangeId {
    /// Placeholder for a change whose id was not reported
    pub const UNKNOWN: &'static str = "?";

    /// Wrap a change id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The placeholder id
    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    /// True for the placeholder id
    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    /// The id as text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChangeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Output of `pebble version --client`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Client version string
    pub version: String,
}

impl SystemInfo {
    /// Take the version from the first line of the command output
    pub fn from_output(text: &str) -> Self {
        let version = text.trim().lines().next().unwrap_or_default().trim();
        Self {
            version: version.to_string(),
        }
    }
}

/// The combined plan printed by `pebble plan`
///
/// Entries are kept as YAML values in plan order; the shim does not
/// interpret service or check definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
    /// Service definitions keyed by name
    pub services: IndexMap<String, serde_yaml::Value>,
    /// Check definitions keyed by name
    pub checks: IndexMap<String, serde_yaml::Value>,
    /// Log target definitions keyed by name
    #[serde(rename = "log-targets")]
    pub log_targets: IndexMap<String, serde_yaml::Value>,
}

impl Plan {
    /// Parse the YAML plan; empty output is an empty plan
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Render the plan back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Definition of service `name`
    pub fn service(&self, name: &str) -> Option<&serde_yaml::Value> {
        self.services.get(name)
    }
}
