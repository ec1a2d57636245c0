//! Manifest-driven updates for Blocks installations.
//!
//! A [`Manifest`] lists `Add` and `Remove` actions relative to an installation
//! root. [`UpdateEngine`] applies them under an [`InstallationLock`], parks
//! removed files as `.bak` backups and sweeps them back into place when an
//! entry fails.
//!
//! [`InstallationLock`]: blocks_fs::InstallationLock

pub use config::Settings;
pub use engine::{BACKUP_SUFFIX, UpdateEngine, backup_path};
pub use error::{Error, HookError, Result};
pub use hooks::{ProgressHook, UpdateHook};
pub use manifest::{Manifest, ManifestAction, ManifestEntry};
pub use report::{
    EntryFailure, FailureCause, RestoreFailure, RollbackReport, RollbackStatus, UpdateReport,
};

pub mod config;
mod engine;
mod error;
mod hooks;
mod manifest;
pub mod package;
mod report;
