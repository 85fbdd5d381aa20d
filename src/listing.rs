//! Long-format directory listing parsing.
//!
//! FTP exposes no structured stat call, so read/write/execute bits are
//! reconstructed from raw `LIST` output: one `ls -l`-style line per entry,
//! `mode links owner group size month day time-or-year name`. Only the mode
//! string and the name are consumed here.

use crate::error::StorageError;

/// Simplified permission set derived from a listing mode string.
///
/// Each bit is the OR of the user/group/other positions, so `read` is true
/// when anyone may read. The full owner/group distinction is deliberately
/// not modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionTriple {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl PermissionTriple {
    /// Everything allowed. The root item always gets this: it appears in
    /// its parent's listing, not its own, so there is no line to parse.
    pub const ALL: Self = Self {
        read: true,
        write: true,
        execute: true,
    };

    /// Nothing allowed. The baseline for entries with no matching line.
    pub const NONE: Self = Self {
        read: false,
        write: false,
        execute: false,
    };

    /// Bitwise AND with `other`. A child's effective access never exceeds
    /// what the traversal to its parent already allows.
    pub fn intersect(self, other: Self) -> Self {
        Self {
            read: self.read && other.read,
            write: self.write && other.write,
            execute: self.execute && other.execute,
        }
    }
}

/// One parsed listing line: the entry name and its permission bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub permissions: PermissionTriple,
}

/// Decode a 10-character mode string (`drwxr-xr--`). Position 0 is the
/// type flag and is ignored; 1/4/7 are read, 2/5/8 write, 3/6/9 execute.
fn triple_from_mode(mode: &str) -> Option<PermissionTriple> {
    let b = mode.as_bytes();
    if b.len() < 10 {
        return None;
    }
    Some(PermissionTriple {
        read: b[1] == b'r' || b[4] == b'r' || b[7] == b'r',
        write: b[2] == b'w' || b[5] == b'w' || b[8] == b'w',
        execute: b[3] == b'x' || b[6] == b'x' || b[9] == b'x',
    })
}

/// Split a listing line into its mode field and its name field.
///
/// The name is everything after the eighth whitespace-delimited field,
/// so names containing spaces survive intact.
fn mode_and_name(line: &str) -> Option<(&str, &str)> {
    let mut rest = line;
    let mut mode = "";
    for field in 0..8 {
        let trimmed = rest.trim_start();
        let end = trimmed.find(char::is_whitespace)?;
        if field == 0 {
            mode = &trimmed[..end];
        }
        rest = &trimmed[end..];
    }
    let name = rest.trim_start();
    if name.is_empty() {
        None
    } else {
        Some((mode, name))
    }
}

/// Parse one raw listing line. Returns `None` for the `total` summary
/// line, truncated lines, and anything else that is not an entry.
/// Line endings are stripped so CRLF framing never leaks into names.
pub fn parse_entry(line: &str) -> Option<DirectoryEntry> {
    let (mode, name) = mode_and_name(line.trim_end_matches(['\r', '\n']))?;
    if mode == "total" {
        return None;
    }
    let permissions = triple_from_mode(mode)?;
    Some(DirectoryEntry {
        name: name.to_string(),
        permissions,
    })
}

/// Scan a raw listing for the entry named exactly `basename`
/// (case-sensitive, extension included) and return its permission bits.
pub fn find_permissions(lines: &[String], basename: &str) -> Option<PermissionTriple> {
    lines
        .iter()
        .filter_map(|line| parse_entry(line))
        .find(|entry| entry.name == basename)
        .map(|entry| entry.permissions)
}

/// Source of permission bits for an absolute path.
///
/// The production implementation walks parent listings; a transport with
/// structured metadata could answer directly without touching callers.
#[allow(async_fn_in_trait)]
pub trait PermissionSource {
    async fn triple(&self, absolute_path: &str) -> Result<PermissionTriple, StorageError>;
}
