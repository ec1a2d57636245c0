//! A single file or directory with lazily probed, cached attributes.
//!
//! Probes run on first use and are cached until the entry is mutated or
//! [`Entry::refresh`] is called. Queries never fail: a path that cannot be
//! inspected reports `false` or `None`. Mutations return `Err` and log the
//! real path and the attempted operation.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use once_cell::unsync::OnceCell;

use crate::identity::{self, Identity};
use crate::permissions::{OctalMode, UmaskGuard};
use crate::walk::{WalkOptions, walk};
use crate::{Error, Result, mime, size};

/// Bound on nested writability probes.
const MAX_PROBE_DEPTH: usize = 4;

const PROBE_PREFIX: &str = ".blocks-probe-";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Not yet probed, or the path does not exist.
    Unknown,
}

#[derive(Clone, Debug, Default)]
struct Probes {
    exists: OnceCell<bool>,
    kind: OnceCell<EntryKind>,
    readable: OnceCell<bool>,
    writable: OnceCell<bool>,
    size: OnceCell<u64>,
    owner: OnceCell<Option<Identity>>,
    group: OnceCell<Option<Identity>>,
    permissions: OnceCell<Option<OctalMode>>,
    mime: OnceCell<Option<&'static str>>,
}

/// Options for writing file contents.
#[derive(Clone, Copy, Debug, Default)]
pub struct WriteOptions {
    pub append: bool,
    /// Create the file, and any missing parent directories, when absent.
    pub auto_create: bool,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }
}

#[derive(Clone, Debug)]
pub struct Entry {
    requested: String,
    real: PathBuf,
    probes: Probes,
}

impl Entry {
    /// Resolves `path` against the working directory. Nothing is probed yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let requested = path.as_ref().to_string_lossy().into_owned();
        let real = PathBuf::from(blocks_platform::resolve(&requested)?);
        Ok(Self {
            requested,
            real,
            probes: Probes::default(),
        })
    }

    /// Builds an entry for a path already known to exist with the given kind.
    pub(crate) fn seeded(real: PathBuf, kind: EntryKind) -> Self {
        let probes = Probes::default();
        let _ = probes.exists.set(true);
        let _ = probes.kind.set(kind);
        Self {
            requested: real.to_string_lossy().into_owned(),
            real,
            probes,
        }
    }

    /// The path as the caller supplied it.
    pub fn requested_path(&self) -> &str {
        &self.requested
    }

    /// Canonical absolute path.
    pub fn path(&self) -> &Path {
        &self.real
    }

    /// Drops every cached probe.
    pub fn refresh(&mut self) {
        self.probes = Probes::default();
    }

    pub fn exists(&self) -> bool {
        *self.probes.exists.get_or_init(|| match fs::metadata(&self.real) {
            Ok(meta) => {
                let kind = if meta.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                };
                let _ = self.probes.kind.set(kind);
                true
            }
            Err(_) => false,
        })
    }

    /// Kind determined by the last existence probe; `Unknown` before one ran.
    pub fn kind(&self) -> EntryKind {
        self.probes.kind.get().copied().unwrap_or(EntryKind::Unknown)
    }

    pub fn is_file(&self) -> bool {
        self.exists() && self.kind() == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.exists() && self.kind() == EntryKind::Directory
    }

    pub fn is_readable(&self) -> bool {
        *self.probes.readable.get_or_init(|| {
            let readable = if self.is_dir() {
                fs::read_dir(&self.real).is_ok()
            } else {
                File::open(&self.real).is_ok()
            };
            if !readable {
                tracing::info!(path = %self.real.display(), "not readable");
            }
            readable
        })
    }

    /// Probes real writability by creating and opening a scratch file.
    ///
    /// Permission bits are not consulted.
    pub fn is_writable(&self) -> bool {
        *self.probes.writable.get_or_init(|| {
            let writable = probe_writable(&self.real, 0);
            if !writable {
                tracing::info!(path = %self.real.display(), "not writable");
            }
            writable
        })
    }

    /// Byte count of a file, or the sum over every file below a directory.
    pub fn size(&self) -> Result<u64> {
        if let Some(size) = self.probes.size.get() {
            return Ok(*size);
        }
        let size = self.compute_size().map_err(|e| self.failed("size", e))?;
        let _ = self.probes.size.set(size);
        Ok(size)
    }

    pub fn human_size(&self) -> Result<String> {
        self.size().map(size::human_readable)
    }

    fn compute_size(&self) -> Result<u64> {
        if !self.exists() {
            return Err(self.not_found());
        }
        if !self.is_dir() {
            return Ok(self.metadata()?.len());
        }
        let mut total = 0u64;
        for child in walk(&self.real, &WalkOptions::new().recursive(true))? {
            if child.kind() == EntryKind::File {
                total += child.metadata()?.len();
            }
        }
        Ok(total)
    }

    pub fn owner(&self) -> Option<Identity> {
        self.probes
            .owner
            .get_or_init(|| self.metadata().ok().and_then(|m| identity::owner(&m)))
            .clone()
    }

    pub fn group(&self) -> Option<Identity> {
        self.probes
            .group
            .get_or_init(|| self.metadata().ok().and_then(|m| identity::group(&m)))
            .clone()
    }

    /// Mode bits; absent on platforms without POSIX permissions.
    pub fn permissions(&self) -> Option<OctalMode> {
        *self
            .probes
            .permissions
            .get_or_init(|| self.metadata().ok().and_then(|m| OctalMode::of(&m)))
    }

    pub fn mime_type(&self) -> Option<&'static str> {
        *self.probes.mime.get_or_init(|| {
            if self.is_dir() {
                Some(mime::DIRECTORY)
            } else if self.is_file() {
                mime::detect(&self.real).ok().flatten()
            } else {
                None
            }
        })
    }

    /// Last path component, extension included.
    pub fn basename(&self) -> Option<&str> {
        self.real.file_name().and_then(|name| name.to_str())
    }

    /// Last path component without its extension.
    pub fn filename(&self) -> Option<&str> {
        self.real.file_stem().and_then(|stem| stem.to_str())
    }

    pub fn extension(&self) -> Option<&str> {
        self.real.extension().and_then(|ext| ext.to_str())
    }

    pub fn parent(&self) -> Option<&Path> {
        self.real.parent()
    }

    /// Creates an empty file. Fails if anything already exists at the path.
    pub fn create(&mut self) -> Result<()> {
        if self.exists() {
            let err = Error::AlreadyExists {
                path: self.real.clone(),
            };
            return Err(self.failed("create", err));
        }
        File::create(&self.real)
            .map_err(|source| self.write_error(source))
            .map_err(|e| self.failed("create", e))?;
        self.refresh();
        Ok(())
    }

    /// Creates the directory and any missing ancestors with `mode`.
    pub fn create_directory(&mut self, mode: OctalMode) -> Result<()> {
        create_dir_all_with_mode(&self.real, mode).map_err(|e| self.failed("create_directory", e))?;
        self.refresh();
        Ok(())
    }

    /// Copies a file, or a directory tree when `recursive` is set, to `destination`.
    ///
    /// Directories are created before any file is copied. Without `recursive`
    /// only the immediate children of a directory are replayed.
    pub fn copy(&self, destination: impl AsRef<Path>, recursive: bool) -> Result<Entry> {
        let target = Entry::open(destination)?;
        self.copy_to(&target.real, recursive)
            .map_err(|e| self.failed("copy", e))?;
        tracing::debug!(from = %self.real.display(), to = %target.real.display(), "copied");
        Ok(target)
    }

    fn copy_to(&self, target: &Path, recursive: bool) -> Result<()> {
        if !self.exists() {
            return Err(self.not_found());
        }
        if !self.is_dir() {
            fs::copy(&self.real, target).map_err(|source| Error::Write {
                path: target.to_path_buf(),
                source,
            })?;
            return Ok(());
        }

        let children = walk(&self.real, &WalkOptions::new().recursive(recursive))?;
        create_dir_all_with_mode(target, OctalMode::DEFAULT_DIRECTORY)?;
        for dir in children.iter().filter(|c| c.kind() == EntryKind::Directory) {
            create_dir_all_with_mode(&self.rebase(dir.path(), target), OctalMode::DEFAULT_DIRECTORY)?;
        }
        for file in children.iter().filter(|c| c.kind() == EntryKind::File) {
            let dest = self.rebase(file.path(), target);
            fs::copy(file.path(), &dest).map_err(|source| Error::Write { path: dest, source })?;
        }
        Ok(())
    }

    fn rebase(&self, descendant: &Path, target: &Path) -> PathBuf {
        match descendant.strip_prefix(&self.real) {
            Ok(relative) => target.join(relative),
            Err(_) => target.to_path_buf(),
        }
    }

    /// Renames the entry in place. The source must be writable.
    pub fn rename(&mut self, destination: impl AsRef<Path>) -> Result<()> {
        let target = Entry::open(destination)?;
        if !self.is_writable() {
            let err = Error::NotWritable {
                path: self.real.clone(),
            };
            return Err(self.failed("rename", err));
        }
        fs::rename(&self.real, &target.real)
            .map_err(|source| self.write_error(source))
            .map_err(|e| self.failed("rename", e))?;
        tracing::debug!(from = %self.real.display(), to = %target.real.display(), "renamed");
        self.real = target.real;
        self.refresh();
        Ok(())
    }

    /// Replaces or appends to this file's contents.
    pub fn set_contents(&mut self, contents: &[u8], options: WriteOptions) -> Result<()> {
        write_contents(self, contents, options).map_err(|e| self.failed("set_contents", e))?;
        self.refresh();
        Ok(())
    }

    /// Writes `contents` to another path and returns the entry for it.
    pub fn write(destination: impl AsRef<Path>, contents: &[u8], options: WriteOptions) -> Result<Entry> {
        let mut target = Entry::open(destination)?;
        target.set_contents(contents, options)?;
        Ok(target)
    }

    pub fn read_contents(&self) -> Result<Vec<u8>> {
        if !self.is_file() {
            let err = if self.exists() {
                Error::NotAFile {
                    path: self.real.clone(),
                }
            } else {
                self.not_found()
            };
            return Err(self.failed("read_contents", err));
        }
        fs::read(&self.real)
            .map_err(|source| Error::Read {
                path: self.real.clone(),
                source,
            })
            .map_err(|e| self.failed("read_contents", e))
    }

    pub fn set_permissions(&mut self, mode: OctalMode) -> Result<()> {
        mode.apply_to_path(&self.real)
            .map_err(|e| self.failed("set_permissions", e))?;
        self.refresh();
        Ok(())
    }

    /// Deletes a file, or a directory; `purge` removes a directory's contents first.
    pub fn delete(&mut self, purge: bool) -> Result<()> {
        self.remove(purge).map_err(|e| self.failed("delete", e))?;
        self.refresh();
        let _ = self.probes.exists.set(false);
        Ok(())
    }

    fn remove(&self, purge: bool) -> Result<()> {
        if !self.exists() {
            return Err(self.not_found());
        }
        if !self.is_writable() {
            return Err(Error::NotWritable {
                path: self.real.clone(),
            });
        }
        let result = match (self.is_dir(), purge) {
            (false, _) => fs::remove_file(&self.real),
            (true, true) => fs::remove_dir_all(&self.real),
            (true, false) => fs::remove_dir(&self.real),
        };
        result.map_err(|source| self.write_error(source))
    }

    fn metadata(&self) -> Result<fs::Metadata> {
        fs::metadata(&self.real).map_err(|source| Error::Read {
            path: self.real.clone(),
            source,
        })
    }

    fn not_found(&self) -> Error {
        Error::NotFound {
            path: self.real.clone(),
        }
    }

    fn write_error(&self, source: std::io::Error) -> Error {
        Error::Write {
            path: self.real.clone(),
            source,
        }
    }

    fn failed(&self, operation: &'static str, err: Error) -> Error {
        tracing::error!(path = %self.real.display(), operation, error = %err, "filesystem operation failed");
        err
    }
}

fn write_contents(entry: &Entry, contents: &[u8], options: WriteOptions) -> Result<()> {
    if entry.is_dir() {
        return Err(Error::NotAFile {
            path: entry.real.clone(),
        });
    }
    if !entry.exists() {
        if !options.auto_create {
            return Err(entry.not_found());
        }
        if let Some(parent) = entry.real.parent().filter(|p| !p.exists()) {
            create_dir_all_with_mode(parent, OctalMode::DEFAULT_DIRECTORY)?;
        }
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(options.auto_create)
        .append(options.append)
        .truncate(!options.append)
        .open(&entry.real)
        .map_err(|source| entry.write_error(source))?;
    file.write_all(contents)
        .map_err(|source| entry.write_error(source))
}

/// Creates `path` and every missing ancestor, then applies `mode` to `path`.
///
/// The umask is cleared for the duration so new ancestors get `mode` too.
/// An existing directory is left as it is, permissions included.
pub fn create_dir_all_with_mode(path: &Path, mode: OctalMode) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    let write_err = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    let _umask = UmaskGuard::clear();

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode.bits());
    }
    builder.create(path).map_err(write_err)?;
    mode.apply_to_path(path)
}

fn probe_writable(path: &Path, depth: usize) -> bool {
    if depth > MAX_PROBE_DEPTH {
        return false;
    }
    if path.is_dir() {
        let leaf = path.join(format!("{PROBE_PREFIX}{}", uuid::Uuid::new_v4()));
        return probe_writable(&leaf, depth + 1);
    }

    let existed = path.exists();
    if !existed && depth == 0 {
        return path
            .parent()
            .is_some_and(|parent| parent.is_dir() && probe_writable(parent, depth + 1));
    }

    let opened = OpenOptions::new().append(true).create(true).open(path).is_ok();
    if opened && !existed {
        let _ = fs::remove_file(path);
    }
    opened
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[cfg(unix)]
    fn running_as_root() -> bool {
        nix::unistd::Uid::effective().is_root()
    }

    #[test]
    fn test_kind_unknown_until_probed() {
        let dir = tempdir().unwrap();
        let entry = Entry::open(dir.path()).unwrap();
        assert_eq!(entry.kind(), EntryKind::Unknown);
        assert!(entry.exists());
        assert_eq!(entry.kind(), EntryKind::Directory);
    }

    #[test]
    fn test_missing_entry_reports_false() {
        let dir = tempdir().unwrap();
        let entry = Entry::open(dir.path().join("missing")).unwrap();
        assert!(!entry.exists());
        assert!(!entry.is_readable());
        assert_eq!(entry.kind(), EntryKind::Unknown);
        assert!(entry.owner().is_none());
        assert!(entry.mime_type().is_none());
        assert!(matches!(entry.size(), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_path_derived_fields() {
        let entry = Entry::open("/srv/site/templates/index.html.twig").unwrap();
        assert_eq!(entry.basename(), Some("index.html.twig"));
        assert_eq!(entry.filename(), Some("index.html"));
        assert_eq!(entry.extension(), Some("twig"));
        assert_eq!(entry.parent(), Some(Path::new("/srv/site/templates")));
    }

    #[test]
    fn test_relative_path_is_resolved() {
        let entry = Entry::open("a/./b/../c.txt").unwrap();
        assert!(entry.path().is_absolute());
        assert!(entry.path().ends_with("a/c.txt"));
        assert_eq!(entry.requested_path(), "a/./b/../c.txt");
    }

    #[test]
    fn test_create_refuses_existing() {
        let dir = tempdir().unwrap();
        let mut entry = Entry::open(dir.path().join("new.txt")).unwrap();
        entry.create().unwrap();
        assert!(entry.is_file());
        assert!(matches!(entry.create(), Err(Error::AlreadyExists { .. })));
    }

    #[test]
    fn test_set_contents_and_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let mut entry = Entry::open(&path).unwrap();
        assert!(matches!(
            entry.set_contents(b"x", WriteOptions::new()),
            Err(Error::NotFound { .. })
        ));

        entry
            .set_contents(b"one", WriteOptions::new().auto_create(true))
            .unwrap();
        entry
            .set_contents(b"two", WriteOptions::new().append(true))
            .unwrap();
        assert_eq!(entry.read_contents().unwrap(), b"onetwo");

        entry.set_contents(b"three", WriteOptions::new()).unwrap();
        assert_eq!(entry.read_contents().unwrap(), b"three");
        assert_eq!(entry.size().unwrap(), 5);
    }

    #[test]
    fn test_write_creates_parents() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("deep/er/file.bin");
        let entry = Entry::write(&target, b"abc", WriteOptions::new().auto_create(true)).unwrap();
        assert!(entry.is_file());
        assert_eq!(fs::read(&target).unwrap(), b"abc");
    }

    #[test]
    fn test_set_contents_on_directory_fails() {
        let dir = tempdir().unwrap();
        let mut entry = Entry::open(dir.path()).unwrap();
        assert!(matches!(
            entry.set_contents(b"x", WriteOptions::new()),
            Err(Error::NotAFile { .. })
        ));
    }

    #[test]
    fn test_directory_size_sums_files() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("one"), vec![0u8; 10]).unwrap();
        fs::write(dir.path().join("a/two"), vec![0u8; 200]).unwrap();
        fs::write(dir.path().join("a/b/three"), vec![0u8; 3000]).unwrap();

        let entry = Entry::open(dir.path()).unwrap();
        assert_eq!(entry.size().unwrap(), 3210);
        assert_eq!(entry.human_size().unwrap(), "3.13 KB");
    }

    #[test]
    fn test_rename_rederives_path_fields() {
        let dir = tempdir().unwrap();
        let mut entry = Entry::write(dir.path().join("old.css"), b"a{}", WriteOptions::new().auto_create(true)).unwrap();
        entry.rename(dir.path().join("new.js")).unwrap();
        assert_eq!(entry.basename(), Some("new.js"));
        assert_eq!(entry.extension(), Some("js"));
        assert!(entry.exists());
        assert!(!dir.path().join("old.css").exists());
    }

    #[test]
    fn test_copy_directory_tree() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested/empty")).unwrap();
        fs::write(src.join("top.txt"), b"top").unwrap();
        fs::write(src.join("nested/inner.txt"), b"inner").unwrap();

        let copy = Entry::open(&src).unwrap().copy(dir.path().join("dst"), true).unwrap();
        assert!(copy.is_dir());
        assert_eq!(fs::read(dir.path().join("dst/top.txt")).unwrap(), b"top");
        assert_eq!(fs::read(dir.path().join("dst/nested/inner.txt")).unwrap(), b"inner");
        assert!(dir.path().join("dst/nested/empty").is_dir());
    }

    #[test]
    fn test_shallow_copy_skips_grandchildren() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("top.txt"), b"top").unwrap();
        fs::write(src.join("nested/inner.txt"), b"inner").unwrap();

        Entry::open(&src).unwrap().copy(dir.path().join("dst"), false).unwrap();
        assert!(dir.path().join("dst/top.txt").exists());
        assert!(dir.path().join("dst/nested").is_dir());
        assert!(!dir.path().join("dst/nested/inner.txt").exists());
    }

    #[test]
    fn test_delete_directory_requires_purge_when_not_empty() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("full");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("f"), b"").unwrap();

        let mut entry = Entry::open(&target).unwrap();
        assert!(matches!(entry.delete(false), Err(Error::Write { .. })));
        entry.delete(true).unwrap();
        assert!(!entry.exists());
        assert!(!target.exists());
    }

    #[test]
    fn test_probe_leaves_no_trace() {
        let dir = tempdir().unwrap();
        let entry = Entry::open(dir.path()).unwrap();
        assert!(entry.is_writable());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        let missing = Entry::open(dir.path().join("not-yet")).unwrap();
        assert!(missing.is_writable());
        assert!(!dir.path().join("not-yet").exists());
    }

    #[test]
    fn test_probe_keeps_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keep.txt");
        fs::write(&path, b"data").unwrap();
        assert!(Entry::open(&path).unwrap().is_writable());
        assert_eq!(fs::read(&path).unwrap(), b"data");
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_directory_is_not_writable() {
        if running_as_root() {
            return;
        }
        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        OctalMode::from_bits(0o555).apply_to_path(&locked).unwrap();

        let entry = Entry::open(&locked).unwrap();
        assert!(!entry.is_writable());
        assert!(entry.is_readable());

        OctalMode::from_bits(0o755).apply_to_path(&locked).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_create_directory_applies_mode() {
        let dir = tempdir().unwrap();
        let mut entry = Entry::open(dir.path().join("x/y")).unwrap();
        entry.create_directory(OctalMode::DEFAULT_DIRECTORY).unwrap();
        assert_eq!(entry.permissions(), Some(OctalMode::from_bits(0o754)));
        let parent = Entry::open(dir.path().join("x")).unwrap();
        assert_eq!(parent.permissions(), Some(OctalMode::from_bits(0o754)));
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_directory_keeps_its_mode() {
        let dir = tempdir().unwrap();
        let private = dir.path().join("private");
        fs::create_dir(&private).unwrap();
        OctalMode::from_bits(0o700).apply_to_path(&private).unwrap();

        let mut entry = Entry::open(&private).unwrap();
        entry.create_directory(OctalMode::DEFAULT_DIRECTORY).unwrap();
        assert_eq!(entry.permissions(), Some(OctalMode::from_bits(0o700)));
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_onto_existing_directory_keeps_its_mode() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("sub/a.txt"), b"a").unwrap();
        let dst = dir.path().join("dst");
        fs::create_dir(&dst).unwrap();
        OctalMode::from_bits(0o700).apply_to_path(&dst).unwrap();

        Entry::open(&src).unwrap().copy(&dst, true).unwrap();

        assert_eq!(fs::read(dst.join("sub/a.txt")).unwrap(), b"a");
        assert_eq!(Entry::open(&dst).unwrap().permissions(), Some(OctalMode::from_bits(0o700)));
        assert_eq!(
            Entry::open(dst.join("sub")).unwrap().permissions(),
            Some(OctalMode::DEFAULT_DIRECTORY)
        );
    }

    #[test]
    fn test_mime_type() {
        let dir = tempdir().unwrap();
        let page = Entry::write(dir.path().join("page.html"), b"<p>hi</p>", WriteOptions::new().auto_create(true)).unwrap();
        assert_eq!(page.mime_type(), Some("text/html"));
        assert_eq!(Entry::open(dir.path()).unwrap().mime_type(), Some(mime::DIRECTORY));
    }
}
