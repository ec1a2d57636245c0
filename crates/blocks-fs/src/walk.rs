//! Directory enumeration with suffix/regex filters.
//!
//! The filter decides which paths are returned, never which directories are
//! descended into.

use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::cancel::{self, CancelToken};
use crate::entry::{Entry, EntryKind};
use crate::{Error, Result};

/// True when the last `suffix.len()` bytes of `path` equal `suffix`.
///
/// A path shorter than the suffix is compared whole, so it only matches when
/// it is the suffix itself.
pub fn has_suffix(path: &str, suffix: &str) -> bool {
    let path = path.as_bytes();
    let start = path.len().saturating_sub(suffix.len());
    &path[start..] == suffix.as_bytes()
}

#[derive(Clone, Debug)]
enum Rule {
    /// Stored with its leading dot.
    Suffix(String),
    Pattern(Regex),
}

impl Rule {
    fn parse(rule: &str) -> Result<Self> {
        if rule.starts_with('/') {
            delimited_regex(rule).map(Self::Pattern)
        } else {
            Ok(Self::Suffix(format!(".{rule}")))
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Suffix(suffix) => has_suffix(path, suffix),
            Self::Pattern(re) => re.is_match(path),
        }
    }
}

/// Compiles `/pattern/flags`. Supported flags are `i`, `m`, `s`, `x` and the
/// no-op `u`.
fn delimited_regex(rule: &str) -> Result<Regex> {
    let invalid = |reason: String| Error::InvalidFilter {
        rule: rule.to_string(),
        reason,
    };

    let close = rule
        .rfind('/')
        .filter(|&i| i > 0)
        .ok_or_else(|| invalid("missing closing '/'".into()))?;
    let pattern = &rule[1..close];

    let mut inline = String::new();
    for flag in rule[close + 1..].chars() {
        match flag {
            'i' | 'm' | 's' | 'x' => inline.push(flag),
            'u' => {}
            other => return Err(invalid(format!("unsupported flag '{other}'"))),
        }
    }

    let source = if inline.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{inline}){pattern}")
    };
    Regex::new(&source).map_err(|e| invalid(e.to_string()))
}

/// A set of rules joined by logical OR. The empty filter passes everything.
#[derive(Clone, Debug, Default)]
pub struct Filter {
    rules: Vec<Rule>,
}

impl Filter {
    pub fn any() -> Self {
        Self::default()
    }

    /// Builds a filter from rules such as `"zip"` or `"/\.tmp$/i"`.
    pub fn new<I, S>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = rules
            .into_iter()
            .map(|rule| Rule::parse(rule.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.rules.is_empty() || self.rules.iter().any(|rule| rule.matches(path))
    }
}

#[derive(Clone, Debug, Default)]
pub struct WalkOptions {
    pub recursive: bool,
    pub sorted: bool,
    pub filter: Filter,
    pub cancel: Option<CancelToken>,
}

impl WalkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Orders siblings by file name instead of directory listing order.
    pub fn sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Lists the descendants of `root` in pre-order.
///
/// `root` is resolved to an absolute path first, so every returned entry and
/// every path the filter sees is absolute. `root` itself is not part of the
/// result. A root that is not a directory, or any directory that cannot be
/// listed, fails the whole walk.
pub fn walk(root: &Path, options: &WalkOptions) -> Result<Vec<Entry>> {
    let root = PathBuf::from(blocks_platform::resolve(&root.to_string_lossy())?);
    let root = root.as_path();
    if !root.is_dir() {
        tracing::warn!(path = %root.display(), operation = "walk", "not a directory");
        return Err(Error::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut walker = WalkDir::new(root).min_depth(1);
    if !options.recursive {
        walker = walker.max_depth(1);
    }
    if options.sorted {
        walker = walker.sort_by_file_name();
    }

    let mut entries = Vec::new();
    for item in walker {
        cancel::check(options.cancel.as_ref())?;
        let item = item.map_err(|source| {
            let path = source.path().unwrap_or(root).to_path_buf();
            tracing::error!(path = %path.display(), operation = "walk", error = %source, "cannot list directory");
            Error::Walk { path, source }
        })?;

        let path = item.path();
        if !options.filter.matches(&path.to_string_lossy()) {
            continue;
        }
        let kind = if item.file_type().is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        entries.push(Entry::seeded(path.to_path_buf(), kind));
    }

    tracing::debug!(path = %root.display(), count = entries.len(), recursive = options.recursive, "walked directory");
    Ok(entries)
}
