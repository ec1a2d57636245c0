//! Hook traits for the update lifecycle.
//!
//! Hooks observe or veto each manifest transition without touching the
//! engine's mechanics.

use crate::report::EntryFailure;
use crate::error::HookError;
use crate::manifest::ManifestEntry;

/// Called around every manifest entry the engine applies.
///
/// An error from `before_entry` or `after_entry` fails the entry and
/// triggers rollback. Errors from `before_rollback` are logged and ignored.
pub trait UpdateHook: Send + Sync {
    /// Name of this hook for error reporting.
    fn name(&self) -> &'static str;

    /// Called before the entry's action runs.
    fn before_entry(&self, _entry: &ManifestEntry) -> Result<(), HookError> {
        Ok(())
    }

    /// Called after the entry's action succeeded.
    fn after_entry(&self, _entry: &ManifestEntry) -> Result<(), HookError> {
        Ok(())
    }

    /// Called once before the rollback sweep starts.
    fn before_rollback(&self, _failure: &EntryFailure) -> Result<(), HookError> {
        Ok(())
    }
}

/// Logs each applied entry at `info`.
pub struct ProgressHook;

impl UpdateHook for ProgressHook {
    fn name(&self) -> &'static str {
        "progress"
    }

    fn after_entry(&self, entry: &ManifestEntry) -> Result<(), HookError> {
        tracing::info!(action = %entry.action, path = %entry.relative_path, line = entry.line, "applied");
        Ok(())
    }

    fn before_rollback(&self, failure: &EntryFailure) -> Result<(), HookError> {
        tracing::warn!(line = failure.entry.line, cause = %failure.cause, "rolling back");
        Ok(())
    }
}
