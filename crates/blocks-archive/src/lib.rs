//! ZIP archive creation and extraction for Blocks.
//!
//! [`ArchiveCodec`] owns the algorithm: which files go into an archive, the
//! directory phase that precedes every file write on extraction, metadata
//! filtering and entry name validation. The byte-level work is delegated to an
//! [`ArchiveBackend`], either the host's Info-ZIP tools or the `zip` crate.

pub use backend::{ArchiveBackend, ArchiveReader, ArchivedEntry, NativeBackend, PureBackend, SourceFile};
pub use codec::ArchiveCodec;
pub use error::{Error, Result};
pub use options::{ArchiveSummary, CreateOptions, ExtractOptions, ExtractReport};

pub mod backend;
mod codec;
mod error;
pub mod options;
pub mod sanitize;
