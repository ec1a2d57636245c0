//! Update manifests.
//!
//! One record per line, three `;`-separated fields:
//!
//! ```text
//! <packageRoot>;<relativePath>;<Action>
//! ```
//!
//! There is no escaping, so neither path may contain `;`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{Error, Result};

const FIELD_SEPARATOR: char = ';';

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManifestAction {
    /// Copy the package file over the installation file.
    Add,
    /// Park the installation file under its backup name.
    Remove,
    /// Any other token. Parsed so the engine can stop at it.
    Unknown(String),
}

impl ManifestAction {
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "Add" => Self::Add,
            "Remove" => Self::Remove,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for ManifestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str("Add"),
            Self::Remove => f.write_str("Remove"),
            Self::Unknown(token) => f.write_str(token),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    pub package_root: PathBuf,
    pub relative_path: String,
    pub action: ManifestAction,
    /// 1-based line number in the manifest text.
    pub line: usize,
}

impl fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (line {})",
            self.action, self.relative_path, self.line
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Parses manifest text. Blank lines are skipped; a line without exactly
    /// three fields is an error. Unknown actions are kept.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (index, raw) in contents.split('\n').enumerate() {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
            let [package_root, relative_path, action] = fields.as_slice() else {
                return Err(Error::MalformedLine {
                    line: index + 1,
                    content: line.to_string(),
                });
            };
            let entry = ManifestEntry {
                package_root: PathBuf::from(package_root),
                relative_path: relative_path.to_string(),
                action: ManifestAction::from_token(action),
                line: index + 1,
            };
            if !entry.action.is_known() {
                tracing::warn!(line = entry.line, action = %entry.action, "unknown manifest action");
            }
            entries.push(entry);
        }
        tracing::debug!(entries = entries.len(), "parsed manifest");
        Ok(Self { entries })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManifestEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromStr for Manifest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ManifestEntry;
    type IntoIter = std::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_entries_with_trailing_newline() {
        let manifest = Manifest::parse("/pkg;plugins/foo.php;Add\n/pkg;plugins/bar.php;Remove\n").unwrap();
        assert_eq!(manifest.len(), 2);
        let first = &manifest.entries()[0];
        assert_eq!(first.package_root, PathBuf::from("/pkg"));
        assert_eq!(first.relative_path, "plugins/foo.php");
        assert_eq!(first.action, ManifestAction::Add);
        assert_eq!(manifest.entries()[1].action, ManifestAction::Remove);
        assert_eq!(manifest.entries()[1].line, 2);
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let manifest = Manifest::parse("\r\n/pkg;a.txt;Add\r\n\n  \n/pkg;b.txt;Remove \r\n").unwrap();
        let lines: Vec<_> = manifest.iter().map(|e| e.line).collect();
        assert_eq!(lines, [2, 5]);
        assert_eq!(manifest.entries()[1].action, ManifestAction::Remove);
    }

    #[test]
    fn test_unknown_action_is_kept() {
        let manifest = Manifest::parse("/pkg;a.txt;Modify").unwrap();
        assert_eq!(manifest.entries()[0].action, ManifestAction::Unknown("Modify".into()));
        assert!(!manifest.entries()[0].action.is_known());
    }

    #[test]
    fn test_wrong_field_count_is_malformed() {
        for text in ["/pkg;a.txt", "/pkg;a;b.txt;Add", "just-a-path"] {
            assert!(matches!(
                Manifest::parse(text),
                Err(Error::MalformedLine { line: 1, .. })
            ));
        }
    }

    #[test]
    fn test_empty_manifest() {
        assert!(Manifest::parse("").unwrap().is_empty());
        assert!(Manifest::parse("\n\n").unwrap().is_empty());
    }
}
