//! Interchangeable ZIP codecs.
//!
//! A backend only moves bytes in and out of an archive. Directory planning,
//! filtering and name validation live in [`ArchiveCodec`](crate::ArchiveCodec).

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::Result;

mod native;
mod pure;

pub use native::NativeBackend;
pub use pure::PureBackend;

/// One file to be stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    /// Entry name, `/`-separated and relative to the source root.
    pub name: String,
    pub path: PathBuf,
}

/// One entry of an existing archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchivedEntry {
    pub name: String,
    pub is_dir: bool,
    /// Uncompressed size, when the backend reports it.
    pub size: Option<u64>,
}

pub trait ArchiveBackend: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Writes a new archive at `archive` holding `files` in order.
    ///
    /// `source_root` is the directory every `SourceFile::name` is relative to.
    fn write(&self, archive: &Path, source_root: &Path, files: &[SourceFile]) -> Result<()>;

    /// Opens an archive for reading. Fails with `Error::Corrupt` when the
    /// file cannot be parsed as a ZIP archive.
    fn open(&self, archive: &Path) -> Result<Box<dyn ArchiveReader>>;
}

pub trait ArchiveReader {
    fn entries(&self) -> &[ArchivedEntry];

    fn read(&mut self, name: &str) -> Result<Vec<u8>>;
}
