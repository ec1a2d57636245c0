//! Pure path canonicalization.
//!
//! Nothing in this module touches the filesystem: a path is resolved against a
//! working directory string and its `.`/`..` segments are folded on a stack.
//! Existence checks live in `blocks-fs`.

use crate::{Error, Result};

/// Separator and prefix rules used when canonicalizing a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathStyle {
    /// `/` separator, absolute paths start with `/`.
    Unix,
    /// `\` separator, absolute paths start with `\` or a `DRIVE:` prefix.
    Windows,
}

impl PathStyle {
    /// Style of the host the process runs on.
    pub fn native() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    pub fn separator(self) -> char {
        match self {
            Self::Unix => '/',
            Self::Windows => '\\',
        }
    }

    /// Both separator variants are accepted on input regardless of style.
    pub fn is_separator(c: char) -> bool {
        c == '/' || c == '\\'
    }

    /// Splits a leading `DRIVE:` segment off a Windows path.
    pub fn split_drive(self, path: &str) -> (Option<&str>, &str) {
        if self != Self::Windows {
            return (None, path);
        }
        let bytes = path.as_bytes();
        if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
            (Some(&path[..2]), &path[2..])
        } else {
            (None, path)
        }
    }

    pub fn is_absolute(self, path: &str) -> bool {
        let (drive, rest) = self.split_drive(path);
        drive.is_some() || rest.starts_with(Self::is_separator)
    }
}

/// Rewrites every separator variant to the style's separator and collapses
/// runs of separators. Directories get a trailing separator.
pub fn normalize(path: &str, style: PathStyle, is_dir: bool) -> String {
    let sep = style.separator();
    let mut out = String::with_capacity(path.len() + 1);
    for c in path.chars() {
        if PathStyle::is_separator(c) {
            if !out.ends_with(sep) {
                out.push(sep);
            }
        } else {
            out.push(c);
        }
    }
    if is_dir && !out.ends_with(sep) {
        out.push(sep);
    }
    out
}

/// Resolves `path` against the process working directory using the host style.
///
/// The working directory is only queried when `path` is relative.
pub fn resolve(path: &str) -> Result<String> {
    let style = PathStyle::native();
    let unified = normalize(path, style, false);
    if unified.is_empty() || style.is_absolute(&unified) {
        return resolve_from(path, "", style);
    }
    let cwd = std::env::current_dir().map_err(Error::CurrentDir)?;
    resolve_from(path, &cwd.to_string_lossy(), style)
}

/// Resolves `path` against `cwd` into an absolute, separator-normalized path
/// with every `.` and `..` segment folded away.
///
/// Empty input resolves to the bare separator. `..` above the root is
/// dropped. The result is a fixed point: resolving it again yields the same
/// string.
pub fn resolve_from(path: &str, cwd: &str, style: PathStyle) -> Result<String> {
    if path.contains('\0') {
        return Err(Error::MalformedPath {
            path: path.replace('\0', "\\0"),
            reason: "contains a NUL byte",
        });
    }

    let sep = style.separator();
    if path.is_empty() {
        return Ok(sep.to_string());
    }

    let unified = normalize(path, style, false);
    let full = if style.is_absolute(&unified) {
        unified
    } else {
        let base = normalize(cwd, style, true);
        format!("{base}{unified}")
    };

    let (drive, rest) = style.split_drive(&full);
    let mut stack: Vec<&str> = Vec::new();
    for segment in rest.split(sep) {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            part => stack.push(part),
        }
    }

    let mut resolved = String::with_capacity(full.len() + 1);
    if let Some(drive) = drive {
        resolved.push_str(drive);
    }
    resolved.push(sep);
    resolved.push_str(&stack.join(&sep.to_string()));
    Ok(resolved)
}
