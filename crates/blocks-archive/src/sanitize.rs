//! Entry name validation (zip-slip prevention).

use crate::{Error, Result};

/// Top-level folder macOS adds to archives it creates.
pub const METADATA_DIR: &str = "__MACOSX";

/// Splits an entry name into path segments that stay below the extraction root.
///
/// Both separators are accepted; empty and `.` segments are dropped. Absolute
/// names, drive prefixes and `..` segments are rejected.
pub fn entry_segments(name: &str) -> Result<Vec<&str>> {
    let unsafe_entry = |reason| Error::UnsafeEntry {
        entry: name.to_string(),
        reason,
    };

    if name.contains('\0') {
        return Err(unsafe_entry("contains a NUL byte"));
    }
    if name.starts_with(['/', '\\']) {
        return Err(unsafe_entry("absolute path"));
    }

    let mut segments = Vec::new();
    for segment in name.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => return Err(unsafe_entry("escapes the extraction root")),
            s if segments.is_empty() && is_drive(s) => {
                return Err(unsafe_entry("drive prefix"));
            }
            s => segments.push(s),
        }
    }
    Ok(segments)
}

fn is_drive(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// True for entries below the macOS metadata folder.
pub fn is_metadata(name: &str) -> bool {
    name.split(['/', '\\'])
        .find(|s| !s.is_empty() && *s != ".")
        .is_some_and(|first| first == METADATA_DIR)
}

/// Entry names end with `/` when they denote a directory.
pub fn is_directory_name(name: &str) -> bool {
    name.ends_with('/') || name.ends_with('\\')
}
