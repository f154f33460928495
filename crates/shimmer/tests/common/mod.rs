//! A scriptable stand-in for the `pebble` binary
//!
//! The script records its arguments and replays canned output from files in
//! a per-test directory. `exec` invocations run the command after `--`
//! directly, so exec tests exercise real processes.

#![allow(dead_code)]

use shimmer::{ClientConfig, PebbleCliClient};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;

const SCRIPT: &str = r#"#!/bin/sh
dir="$FAKE_PEBBLE_DIR"
printf '%s\n' "$@" > "$dir/args"
printf '%s' "$PEBBLE" > "$dir/pebble_env"
if [ "$1" = "exec" ]; then
    while [ "$#" -gt 0 ] && [ "$1" != "--" ]; do shift; done
    shift
    exec "$@"
fi
if [ -f "$dir/sleep" ]; then sleep "$(cat "$dir/sleep")"; fi
if [ -f "$dir/stdout" ]; then cat "$dir/stdout"; fi
if [ -f "$dir/stderr" ]; then cat "$dir/stderr" >&2; fi
if [ -f "$dir/exit" ]; then exit "$(cat "$dir/exit")"; fi
exit 0
"#;

/// Written once per test binary; rewriting an executable while other test
/// threads spawn processes can fail with ETXTBSY.
fn script() -> &'static Path {
    static SCRIPT_PATH: OnceLock<(TempDir, PathBuf)> = OnceLock::new();
    let (_, path) = SCRIPT_PATH.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pebble");
        std::fs::write(&path, SCRIPT).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        (dir, path)
    });
    path
}

/// One fake pebble instance with its own canned responses
pub struct FakePebble {
    dir: TempDir,
}

impl FakePebble {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Print `text` on stdout
    pub fn stdout(&self, text: &str) -> &Self {
        std::fs::write(self.dir().join("stdout"), text).unwrap();
        self
    }

    /// Print `text` on stderr
    pub fn stderr(&self, text: &str) -> &Self {
        std::fs::write(self.dir().join("stderr"), text).unwrap();
        self
    }

    /// Exit with `code`
    pub fn exit(&self, code: i32) -> &Self {
        std::fs::write(self.dir().join("exit"), code.to_string()).unwrap();
        self
    }

    /// Sleep before responding
    pub fn sleep(&self, seconds: u64) -> &Self {
        std::fs::write(self.dir().join("sleep"), seconds.to_string()).unwrap();
        self
    }

    /// Base configuration pointing at the fake binary
    pub fn config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_binary(script())
            .with_env("FAKE_PEBBLE_DIR", self.dir().to_string_lossy())
            .with_timeout(Duration::from_secs(10))
    }

    pub fn client(&self) -> PebbleCliClient {
        PebbleCliClient::new(self.config())
    }

    /// Arguments of the last invocation, without the binary
    pub fn args(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir().join("args"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// True once the binary has been run
    pub fn was_called(&self) -> bool {
        self.dir().join("args").exists()
    }

    /// `PEBBLE` as seen by the last invocation
    pub fn pebble_env(&self) -> String {
        std::fs::read_to_string(self.dir().join("pebble_env")).unwrap()
    }
}
