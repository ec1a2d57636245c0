use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Path(#[from] blocks_platform::Error),

    #[error("failed to read '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("'{path}' does not exist")]
    NotFound { path: PathBuf },

    #[error("'{path}' already exists")]
    AlreadyExists { path: PathBuf },

    #[error("'{path}' is not writable")]
    NotWritable { path: PathBuf },

    #[error("'{path}' is not a file")]
    NotAFile { path: PathBuf },

    #[error("'{path}' is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("invalid permission mode '{value}': expected up to four octal digits")]
    InvalidMode { value: String },

    #[error("invalid filter rule '{rule}': {reason}")]
    InvalidFilter { rule: String, reason: String },

    #[error("cannot list '{path}': {source}")]
    Walk { path: PathBuf, source: walkdir::Error },

    #[error("cannot lock '{path}': {source}")]
    Lock { path: PathBuf, source: io::Error },

    #[error("'{path}' is locked by another process")]
    Locked { path: PathBuf },

    #[error("operation cancelled")]
    Cancelled,
}
