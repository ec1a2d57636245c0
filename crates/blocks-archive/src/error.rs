use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot open archive '{path}': {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("archive '{path}' contains no entries")]
    Empty { path: PathBuf },

    #[error("unsafe entry name '{entry}': {reason}")]
    UnsafeEntry { entry: String, reason: &'static str },

    #[error("entry '{entry}' not found in '{path}'")]
    EntryNotFound { path: PathBuf, entry: String },

    #[error("'{path}' is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("{backend} backend failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("failed to read '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("filesystem operation failed: {source}")]
    Fs { source: blocks_fs::Error },

    #[error(transparent)]
    Platform(#[from] blocks_platform::Error),
}

impl From<blocks_fs::Error> for Error {
    fn from(e: blocks_fs::Error) -> Self {
        Self::Fs { source: e }
    }
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Fs {
                source: blocks_fs::Error::Cancelled
            }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
