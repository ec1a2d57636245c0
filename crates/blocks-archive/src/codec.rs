use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use blocks_fs::{
    CancelToken, Entry, EntryKind, WalkOptions, WriteOptions, create_dir_all_with_mode, walk,
};

use crate::backend::{ArchiveBackend, ArchivedEntry, NativeBackend, PureBackend, SourceFile};
use crate::options::{ArchiveSummary, CreateOptions, ExtractOptions, ExtractReport};
use crate::sanitize::{entry_segments, is_directory_name, is_metadata};
use crate::{Error, Result};

/// Creates and extracts ZIP archives through one [`ArchiveBackend`].
///
/// Cloning is cheap; clones share the backend.
#[derive(Clone, Debug)]
pub struct ArchiveCodec {
    backend: Arc<dyn ArchiveBackend>,
}

impl Default for ArchiveCodec {
    fn default() -> Self {
        Self::detect()
    }
}

impl ArchiveCodec {
    /// Uses the host zip tools when present, the in-process codec otherwise.
    pub fn detect() -> Self {
        match NativeBackend::detect() {
            Some(native) => Self::with_backend(native),
            None => {
                tracing::debug!("native zip tools not found, using pure backend");
                Self::pure()
            }
        }
    }

    pub fn pure() -> Self {
        Self::with_backend(PureBackend)
    }

    pub fn with_backend(backend: impl ArchiveBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Stores every regular file below `source` in a fresh archive at `archive`.
    ///
    /// Entry names are relative to `source`. Directories are implied by the
    /// file names and not stored. An existing file at `archive` is replaced.
    pub fn create_archive(
        &self,
        source: impl AsRef<Path>,
        archive: impl AsRef<Path>,
        options: &CreateOptions,
    ) -> Result<ArchiveSummary> {
        let source = Entry::open(source)?;
        let mut target = Entry::open(archive)?;
        if !source.is_dir() {
            tracing::error!(path = %source.path().display(), operation = "create_archive", "source is not a directory");
            return Err(Error::NotADirectory {
                path: source.path().to_path_buf(),
            });
        }

        let mut walk_options = WalkOptions::new().recursive(true).sorted(true);
        walk_options.filter = options.filter.clone();
        walk_options.cancel = options.cancel.clone();

        let mut files = Vec::new();
        let mut bytes = 0u64;
        for entry in walk(source.path(), &walk_options)? {
            if entry.kind() != EntryKind::File || entry.path() == target.path() {
                continue;
            }
            let name = entry_name(source.path(), entry.path());
            bytes += entry.size()?;
            files.push(SourceFile {
                name,
                path: entry.path().to_path_buf(),
            });
        }

        if target.exists() {
            target.delete(false)?;
        }
        self.backend
            .write(target.path(), source.path(), &files)
            .inspect_err(|e| {
                tracing::error!(path = %target.path().display(), backend = self.backend.name(), error = %e, "archive creation failed");
            })?;

        tracing::info!(
            source = %source.path().display(),
            archive = %target.path().display(),
            backend = self.backend.name(),
            files = files.len(),
            bytes,
            "created archive"
        );
        Ok(ArchiveSummary {
            files: files.len(),
            bytes,
        })
    }

    /// Lists the entries of an archive, failing distinctly on corrupt and empty archives.
    pub fn list(&self, archive: impl AsRef<Path>) -> Result<Vec<ArchivedEntry>> {
        let archive = Entry::open(archive)?;
        let reader = self.backend.open(archive.path())?;
        if reader.entries().is_empty() {
            return Err(Error::Empty {
                path: archive.path().to_path_buf(),
            });
        }
        Ok(reader.entries().to_vec())
    }

    /// Extracts `archive` below `destination` in two phases.
    ///
    /// Every directory the archive needs is created first, parents before
    /// children. Files are then written in archive order, appended to any
    /// existing file at the same path. `__MACOSX` entries are ignored.
    pub fn extract_archive(
        &self,
        archive: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        options: &ExtractOptions,
    ) -> Result<ExtractReport> {
        let archive = Entry::open(archive)?;
        let destination = Entry::open(destination)?;

        let mut reader = self.backend.open(archive.path()).inspect_err(|e| {
            tracing::error!(path = %archive.path().display(), error = %e, "cannot open archive");
        })?;
        if reader.entries().is_empty() {
            tracing::error!(path = %archive.path().display(), "archive is empty");
            return Err(Error::Empty {
                path: archive.path().to_path_buf(),
            });
        }

        let plan = plan(reader.entries())?;
        let root = destination.path();
        let mut report = ExtractReport {
            skipped: plan.skipped,
            ..Default::default()
        };

        if !root.exists() {
            create_dir_all_with_mode(root, options.directory_mode)?;
        }
        for dir in &plan.directories {
            check_cancel(options.cancel.as_ref())?;
            let path = root.join(dir);
            if !path.exists() {
                create_dir_all_with_mode(&path, options.directory_mode)?;
                report.directories += 1;
            }
        }

        let write = WriteOptions::new().append(true).auto_create(true);
        for (name, segments) in &plan.files {
            check_cancel(options.cancel.as_ref())?;
            let data = reader.read(name)?;
            Entry::write(join_segments(root, segments), &data, write)?;
            report.files += 1;
        }

        tracing::info!(
            archive = %archive.path().display(),
            destination = %root.display(),
            backend = self.backend.name(),
            directories = report.directories,
            files = report.files,
            skipped = report.skipped,
            "extracted archive"
        );
        Ok(report)
    }
}

struct Plan {
    /// Every directory to create, relative to the root, ancestors first.
    directories: BTreeSet<String>,
    files: Vec<(String, Vec<String>)>,
    skipped: usize,
}

/// Validates every entry name and computes the directory closure before
/// anything touches the disk.
fn plan(entries: &[ArchivedEntry]) -> Result<Plan> {
    let mut plan = Plan {
        directories: BTreeSet::new(),
        files: Vec::new(),
        skipped: 0,
    };

    for entry in entries {
        if is_metadata(&entry.name) {
            plan.skipped += 1;
            continue;
        }
        let segments = entry_segments(&entry.name)?;
        let is_dir = entry.is_dir || is_directory_name(&entry.name);
        if !is_dir && segments.is_empty() {
            return Err(Error::UnsafeEntry {
                entry: entry.name.clone(),
                reason: "empty file name",
            });
        }

        let dir_len = if is_dir { segments.len() } else { segments.len() - 1 };
        for depth in 1..=dir_len {
            plan.directories.insert(segments[..depth].join("/"));
        }
        if !is_dir {
            plan.files.push((
                entry.name.clone(),
                segments.iter().map(|s| s.to_string()).collect(),
            ));
        }
    }
    Ok(plan)
}

fn check_cancel(token: Option<&CancelToken>) -> Result<()> {
    token.map_or(Ok(()), CancelToken::check).map_err(Error::from)
}

fn join_segments<S: AsRef<str>>(root: &Path, segments: &[S]) -> PathBuf {
    segments
        .iter()
        .fold(root.to_path_buf(), |path, segment| path.join(segment.as_ref()))
}

/// `/`-separated name of `path` relative to `root`.
fn entry_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> ArchivedEntry {
        ArchivedEntry {
            name: name.to_string(),
            is_dir: name.ends_with('/'),
            size: None,
        }
    }

    #[test]
    fn test_plan_orders_ancestors_first() {
        let entries = [entry("b/c/d.txt"), entry("a-z/f"), entry("a/"), entry("b/e.txt")];
        let plan = plan(&entries).unwrap();
        let dirs: Vec<_> = plan.directories.iter().map(String::as_str).collect();
        assert_eq!(dirs, ["a", "a-z", "b", "b/c"]);
        assert_eq!(plan.files.len(), 3);
    }

    #[test]
    fn test_plan_skips_metadata() {
        let entries = [entry("__MACOSX/"), entry("__MACOSX/._a"), entry("a")];
        let plan = plan(&entries).unwrap();
        assert_eq!(plan.skipped, 2);
        assert!(plan.directories.is_empty());
        assert_eq!(plan.files, [("a".to_string(), vec!["a".to_string()])]);
    }

    #[test]
    fn test_plan_rejects_unsafe_names() {
        assert!(matches!(plan(&[entry("ok"), entry("../x")]), Err(Error::UnsafeEntry { .. })));
        assert!(matches!(plan(&[entry(".")]), Err(Error::UnsafeEntry { .. })));
    }

    #[test]
    fn test_entry_name_uses_forward_slashes() {
        let root = Path::new("/srv/site");
        assert_eq!(entry_name(root, Path::new("/srv/site/a/b.txt")), "a/b.txt");
    }
}
