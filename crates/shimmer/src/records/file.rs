//! `ls -l` style file listings

use chrono::{DateTime, Utc};
use nix::unistd::{getgid, getuid};
use serde::{Deserialize, Serialize};

use crate::decode;
use crate::error::{Error, Result};
use crate::table::split_leading;

/// Kind of filesystem entry, from the first character of the mode string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
    /// Unix domain socket
    Socket,
    /// FIFO
    NamedPipe,
    /// Block or character device
    Device,
    /// Anything else
    Unknown,
}

impl FileType {
    /// Map one type letter.
    ///
    /// pebble formats modes with Go's `FileMode::String`, which uses `L`, `S`
    /// and `D` for links, sockets and devices; GNU `ls` letters are accepted
    /// as well.
    pub fn from_mode_char(c: char) -> Self {
        match c {
            '-' => Self::File,
            'd' => Self::Directory,
            'L' | 'l' => Self::Symlink,
            'S' | 's' => Self::Socket,
            'p' => Self::NamedPipe,
            'D' | 'b' | 'c' => Self::Device,
            _ => Self::Unknown,
        }
    }

    /// Map everything in a mode string before the nine permission bits.
    ///
    /// Go prints a letter per mode flag, so `dt` (sticky directory) and `Dc`
    /// (character device) are both possible. Flags that carry no type
    /// (`a`, `T`, `u`, `g`, `t`) leave a regular file.
    pub fn from_mode_prefix(prefix: &str) -> Self {
        let mut kind = None;
        for c in prefix.chars() {
            match Self::from_mode_char(c) {
                Self::Unknown if matches!(c, 'a' | 'T' | 'u' | 'g' | 't') => {}
                Self::Unknown => return Self::Unknown,
                Self::File => {}
                found => {
                    kind.get_or_insert(found);
                }
            }
        }
        kind.unwrap_or(Self::File)
    }
}

/// Numeric owner and group of a listed file
///
/// The listing only carries names. `root` is known to be 0; every other name
/// is assumed to belong to the local caller, which holds when the shim runs
/// as the same user as the workload and is wrong otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerIds {
    /// Owner uid
    pub user_id: u32,
    /// Group gid
    pub group_id: u32,
}

impl OwnerIds {
    /// Approximate ids for `user` and `group` names
    pub fn approximate(user: &str, group: &str) -> Self {
        Self {
            user_id: if user == "root" { 0 } else { getuid().as_raw() },
            group_id: if group == "root" { 0 } else { getgid().as_raw() },
        }
    }
}

/// One entry of a `pebble ls -l` listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Path that was listed
    pub path: String,
    /// Entry name; may contain spaces
    pub name: String,
    /// Entry kind
    #[serde(rename = "type")]
    pub file_type: FileType,
    /// Permission bits, e.g. `0o644`
    pub permissions: u32,
    /// Owner name
    pub user: String,
    /// Owner uid, see [`OwnerIds::approximate`]
    pub user_id: u32,
    /// Group name
    pub group: String,
    /// Group gid, see [`OwnerIds::approximate`]
    pub group_id: u32,
    /// Size in bytes; `None` when pebble prints `-`
    pub size: Option<u64>,
    /// Modification time
    pub last_modified: DateTime<Utc>,
}

impl FileInfo {
    /// Decode one listing line:
    /// `<mode> <owner> <group> <size> <timestamp> <name>`.
    ///
    /// Returns `Ok(None)` for lines too short to be an entry.
    pub fn from_listing_line(path: &str, line: &str) -> Result<Option<Self>> {
        let Some((tokens, name)) = split_leading(line, 5) else {
            return Ok(None);
        };
        if name.is_empty() {
            return Ok(None);
        }

        let &[mode, user, group, size, modified] = tokens.as_slice() else {
            return Ok(None);
        };
        let (kind, bits) = mode
            .len()
            .checked_sub(9)
            .filter(|&at| at > 0 && mode.is_char_boundary(at))
            .map(|at| mode.split_at(at))
            .ok_or_else(|| Error::decode("permissions", mode))?;
        let ids = OwnerIds::approximate(user, group);

        Ok(Some(Self {
            path: path.to_string(),
            name: name.to_string(),
            file_type: FileType::from_mode_prefix(kind),
            permissions: decode::permissions(bits)?,
            user: user.to_string(),
            user_id: ids.user_id,
            group: group.to_string(),
            group_id: ids.group_id,
            size: decode::human_size(size)?,
            last_modified: decode::timestamp(modified)?,
        }))
    }
}

/// Decode a whole listing of `path`
pub fn parse_listing(path: &str, text: &str) -> Result<Vec<FileInfo>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| FileInfo::from_listing_line(path, line).transpose())
        .collect()
}
