use std::io;
use std::path::PathBuf;

use crate::report::{EntryFailure, RollbackReport};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("manifest line {line} does not have three ';'-separated fields: {content:?}")]
    MalformedLine { line: usize, content: String },

    #[error("update failed at {failure}; {rollback}")]
    UpdateFailed {
        failure: Box<EntryFailure>,
        rollback: RollbackReport,
    },

    #[error("failed to read '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("configuration file '{path}' does not exist")]
    MissingConfig { path: PathBuf },

    #[error("invalid configuration: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("filesystem operation failed: {source}")]
    Fs { source: blocks_fs::Error },

    #[error(transparent)]
    Archive(#[from] blocks_archive::Error),

    #[error(transparent)]
    Platform(#[from] blocks_platform::Error),
}

impl From<blocks_fs::Error> for Error {
    fn from(e: blocks_fs::Error) -> Self {
        Self::Fs { source: e }
    }
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self {
        Self::Config(Box::new(e))
    }
}

/// Error returned by an [`UpdateHook`](crate::UpdateHook).
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),
}
