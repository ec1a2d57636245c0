use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed path '{path}': {reason}")]
    MalformedPath { path: String, reason: &'static str },

    #[error("cannot determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("command failed: {cmd}, source: {source}")]
    CommandFailed { cmd: String, source: std::io::Error },
}
