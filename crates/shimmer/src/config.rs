//! Client configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// Environment variable pebble reads its state directory from
pub const PEBBLE_DIR_VAR: &str = "PEBBLE";

/// How the client reaches pebble
///
/// Loaded from YAML or built in code:
///
/// ```yaml
/// binary: /usr/bin/pebble
/// socket_path: /var/lib/pebble/default/.pebble.socket
/// timeout: 5.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Path or name of the pebble binary
    pub binary: PathBuf,
    /// Socket of a non-default pebble instance; its directory is exported as `PEBBLE`
    pub socket_path: Option<PathBuf>,
    /// Deadline for management commands
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Extra variables layered over the inherited environment
    pub env: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("pebble"),
            socket_path: None,
            timeout: Duration::from_secs(5),
            env: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    /// Parse a YAML configuration
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Read and parse a YAML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Use a different pebble binary
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Talk to the pebble instance behind `socket_path`
    pub fn with_socket_path(mut self, socket_path: impl Into<PathBuf>) -> Self {
        self.socket_path = Some(socket_path.into());
        self
    }

    /// Deadline for management commands
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set one extra environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Snapshot the environment spawned pebble processes run with.
    ///
    /// The current process environment, then the configured extras, then
    /// `PEBBLE` pointing at the socket's directory when a socket is set.
    /// Names and values are kept as raw OS strings.
    pub fn environment(&self) -> BTreeMap<OsString, OsString> {
        let mut env: BTreeMap<OsString, OsString> = std::env::vars_os().collect();
        env.extend(
            self.env
                .iter()
                .map(|(key, value)| (OsString::from(key), OsString::from(value))),
        );
        if let Some(dir) = self.socket_dir() {
            env.insert(OsString::from(PEBBLE_DIR_VAR), dir.into_os_string());
        }
        env
    }

    fn socket_dir(&self) -> Option<PathBuf> {
        let socket = self.socket_path.as_ref()?;
        if socket.as_os_str().is_empty() {
            return None;
        }
        match socket.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Some(parent.to_path_buf()),
            _ => Some(PathBuf::from(".")),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
