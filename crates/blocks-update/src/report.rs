use std::fmt;
use std::path::PathBuf;

use crate::error::HookError;
use crate::manifest::ManifestEntry;

/// Why a manifest entry could not be applied.
#[derive(Debug, thiserror::Error)]
pub enum FailureCause {
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("'{path}' is not inside the installation root")]
    OutsideRoot { path: String },

    #[error("hook '{name}' failed: {source}")]
    Hook {
        name: &'static str,
        source: HookError,
    },

    #[error(transparent)]
    Path(#[from] blocks_platform::Error),

    #[error(transparent)]
    Fs(#[from] blocks_fs::Error),
}

/// The entry that stopped an update and why.
#[derive(Debug)]
pub struct EntryFailure {
    pub entry: ManifestEntry,
    pub cause: FailureCause,
}

impl fmt::Display for EntryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entry, self.cause)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RollbackStatus {
    /// Every backup found was moved back into place.
    RolledBack,
    /// At least one backup could not be restored.
    RollbackIncomplete,
}

impl fmt::Display for RollbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RolledBack => f.write_str("rolled back"),
            Self::RollbackIncomplete => f.write_str("rollback incomplete"),
        }
    }
}

#[derive(Debug)]
pub struct RestoreFailure {
    pub path: PathBuf,
    pub error: blocks_fs::Error,
}

/// Outcome of a rollback sweep over a manifest.
#[derive(Debug, Default)]
pub struct RollbackReport {
    /// Installation paths whose backup was moved back.
    pub restored: Vec<PathBuf>,
    pub failed: Vec<RestoreFailure>,
    /// Files copied by `Add` before the failure. The sweep does not revert them.
    pub unreverted_adds: Vec<PathBuf>,
}

impl RollbackReport {
    pub fn status(&self) -> RollbackStatus {
        if self.failed.is_empty() {
            RollbackStatus::RolledBack
        } else {
            RollbackStatus::RollbackIncomplete
        }
    }
}

impl fmt::Display for RollbackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} restored, {} not restored",
            self.status(),
            self.restored.len(),
            self.failed.len()
        )?;
        if !self.unreverted_adds.is_empty() {
            write!(f, ", {} added files left in place", self.unreverted_adds.len())?;
        }
        Ok(())
    }
}

/// Outcome of a fully applied manifest.
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub applied: Vec<ManifestEntry>,
    /// Backups parked by `Remove`, kept until purged.
    pub backups: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_status_follows_failures() {
        let mut report = RollbackReport::default();
        assert_eq!(report.status(), RollbackStatus::RolledBack);
        report.failed.push(RestoreFailure {
            path: PathBuf::from("/srv/a"),
            error: blocks_fs::Error::Write {
                path: PathBuf::from("/srv/a.bak"),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            },
        });
        assert_eq!(report.status(), RollbackStatus::RollbackIncomplete);
    }

    #[test]
    fn test_display_mentions_unreverted_adds() {
        let report = RollbackReport {
            restored: vec![PathBuf::from("/srv/a")],
            failed: Vec::new(),
            unreverted_adds: vec![PathBuf::from("/srv/b")],
        };
        assert_eq!(
            report.to_string(),
            "rolled back: 1 restored, 0 not restored, 1 added files left in place"
        );
    }
}
