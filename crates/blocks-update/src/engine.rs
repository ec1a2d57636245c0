//! Applies manifests to an installation.
//!
//! Entries run in manifest order. `Add` copies a package file over the
//! installation file; `Remove` parks the installation file under
//! `<path>.bak`. The first failure aborts the remaining entries and starts a
//! rollback sweep.
//!
//! The sweep walks the whole manifest, not just the entries that ran, and
//! moves every `.bak` it finds back into place. Only `Remove` is reversible:
//! files copied by `Add` stay where they are and are listed in
//! [`RollbackReport::unreverted_adds`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use blocks_fs::{
    Entry, InstallationLock, OctalMode, Registry, create_dir_all_with_mode,
};
use blocks_platform::{PathStyle, resolve, resolve_from};

use crate::config::{DEFAULT_LOCK_FILE, Settings};
use crate::hooks::UpdateHook;
use crate::manifest::{Manifest, ManifestAction, ManifestEntry};
use crate::report::{
    EntryFailure, FailureCause, RestoreFailure, RollbackReport, RollbackStatus, UpdateReport,
};
use crate::{Error, Result};

pub const BACKUP_SUFFIX: &str = ".bak";

/// `<target>.bak`, next to the file it backs up.
pub fn backup_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Applies manifests to one installation root.
///
/// Every public operation holds the installation lock for its whole run, so
/// two engines on the same root never interleave.
pub struct UpdateEngine {
    root: PathBuf,
    lock_file: PathBuf,
    directory_mode: OctalMode,
    registry: Registry,
    hooks: Vec<Box<dyn UpdateHook>>,
}

impl UpdateEngine {
    pub fn new(installation_root: impl AsRef<Path>) -> Result<Self> {
        let root = Entry::open(installation_root)?.path().to_path_buf();
        Ok(Self {
            lock_file: root.join(DEFAULT_LOCK_FILE),
            root,
            directory_mode: OctalMode::DEFAULT_DIRECTORY,
            registry: Registry::new(),
            hooks: vec![],
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(&settings.installation_root)?
            .lock_file(&settings.lock_file)
            .directory_mode(settings.directory_mode))
    }

    /// Relative paths are taken from the installation root.
    pub fn lock_file(mut self, path: impl AsRef<Path>) -> Self {
        self.lock_file = self.root.join(path);
        self
    }

    /// Mode for directories created while copying `Add` entries.
    pub fn directory_mode(mut self, mode: OctalMode) -> Self {
        self.directory_mode = mode;
        self
    }

    pub fn hook<H: UpdateHook + 'static>(mut self, hook: H) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Applies every entry of `manifest` in order.
    ///
    /// On the first failing entry, or an unknown action, the remaining entries
    /// are skipped, the rollback sweep runs and [`Error::UpdateFailed`] reports
    /// both the failure and the rollback outcome. It is returned even when
    /// rollback restored everything.
    pub fn apply(&self, manifest: &Manifest) -> Result<UpdateReport> {
        let _lock = self.begin()?;
        tracing::info!(root = %self.root.display(), entries = manifest.len(), "applying update");

        let mut report = UpdateReport::default();
        for entry in manifest {
            if let Err(cause) = self.apply_entry(entry, &mut report) {
                let failure = EntryFailure {
                    entry: entry.clone(),
                    cause,
                };
                tracing::error!(
                    line = entry.line,
                    action = %entry.action,
                    path = %entry.relative_path,
                    cause = %failure.cause,
                    "update entry failed"
                );
                for hook in &self.hooks {
                    if let Err(e) = hook.before_rollback(&failure) {
                        tracing::warn!(hook = hook.name(), error = %e, "rollback hook failed");
                    }
                }
                let rollback = self.sweep(manifest, &report.applied);
                return Err(Error::UpdateFailed {
                    failure: Box::new(failure),
                    rollback,
                });
            }
        }

        tracing::info!(
            root = %self.root.display(),
            applied = report.applied.len(),
            backups = report.backups.len(),
            "update applied"
        );
        Ok(report)
    }

    /// Runs the rollback sweep on its own, e.g. after an interrupted run.
    pub fn rollback(&self, manifest: &Manifest) -> Result<RollbackReport> {
        let _lock = self.begin()?;
        Ok(self.sweep(manifest, &[]))
    }

    /// Deletes the backups a manifest's `Remove` entries left behind.
    ///
    /// Returns the backups that were deleted. After this the update can no
    /// longer be rolled back.
    pub fn purge_backups(&self, manifest: &Manifest) -> Result<Vec<PathBuf>> {
        let _lock = self.begin()?;
        let mut purged = Vec::new();
        for entry in manifest {
            if entry.action != ManifestAction::Remove {
                continue;
            }
            let Some(target) = self.sweep_target(entry) else {
                continue;
            };
            let backup = backup_path(&target);
            let mut backup_entry = self.registry.resolve(&backup)?;
            if backup_entry.exists() {
                backup_entry.delete(false)?;
                self.registry.forget(&backup);
                tracing::debug!(path = %backup.display(), "purged backup");
                purged.push(backup);
            }
        }
        tracing::info!(root = %self.root.display(), purged = purged.len(), "purged backups");
        Ok(purged)
    }

    /// Takes the lock and starts a fresh registry session.
    fn begin(&self) -> Result<InstallationLock> {
        let root = Entry::open(&self.root)?;
        if !root.is_dir() {
            tracing::error!(path = %self.root.display(), "installation root is not a directory");
            return Err(blocks_fs::Error::NotADirectory {
                path: self.root.clone(),
            }
            .into());
        }
        let lock = InstallationLock::try_acquire(&self.lock_file)?;
        self.registry.clear();
        Ok(lock)
    }

    fn apply_entry(
        &self,
        entry: &ManifestEntry,
        report: &mut UpdateReport,
    ) -> std::result::Result<(), FailureCause> {
        for hook in &self.hooks {
            hook.before_entry(entry).map_err(|source| FailureCause::Hook {
                name: hook.name(),
                source,
            })?;
        }

        match &entry.action {
            ManifestAction::Add => self.add(entry)?,
            ManifestAction::Remove => {
                let backup = self.remove(entry)?;
                report.backups.push(backup);
            }
            ManifestAction::Unknown(token) => {
                return Err(FailureCause::UnknownAction(token.clone()));
            }
        }
        report.applied.push(entry.clone());

        for hook in &self.hooks {
            hook.after_entry(entry).map_err(|source| FailureCause::Hook {
                name: hook.name(),
                source,
            })?;
        }
        Ok(())
    }

    fn add(&self, entry: &ManifestEntry) -> std::result::Result<(), FailureCause> {
        let package_root = resolve(&entry.package_root.to_string_lossy())?;
        let source_path = PathBuf::from(resolve_below(&package_root, &entry.relative_path)?);
        let target_path = self.target(entry)?;

        let source = self.registry.resolve(&source_path)?;
        if let Some(parent) = target_path.parent() {
            if !parent.exists() {
                create_dir_all_with_mode(parent, self.directory_mode)?;
            }
        }
        let target = source.copy(&target_path, true)?;
        self.registry.store(&target);
        tracing::debug!(from = %source_path.display(), to = %target_path.display(), "added");
        Ok(())
    }

    fn remove(&self, entry: &ManifestEntry) -> std::result::Result<PathBuf, FailureCause> {
        let target_path = self.target(entry)?;
        let backup = backup_path(&target_path);

        let mut target = self.registry.resolve(&target_path)?;
        if !target.exists() {
            return Err(blocks_fs::Error::NotFound { path: target_path }.into());
        }
        if self.registry.resolve(&backup)?.exists() {
            tracing::warn!(path = %backup.display(), "replacing an existing backup");
        }
        target.rename(&backup)?;
        self.registry.forget(&target_path);
        self.registry.store(&target);
        tracing::debug!(path = %target_path.display(), backup = %backup.display(), "parked");
        Ok(backup)
    }

    /// Restores every backup named by `manifest`. `applied` only feeds the
    /// list of `Add` entries left in place.
    fn sweep(&self, manifest: &Manifest, applied: &[ManifestEntry]) -> RollbackReport {
        tracing::info!(root = %self.root.display(), entries = manifest.len(), "rolling back");
        let mut report = RollbackReport::default();

        for entry in manifest {
            let Some(target) = self.sweep_target(entry) else {
                continue;
            };
            match self.restore(&target) {
                Ok(true) => report.restored.push(target),
                Ok(false) => {}
                Err(error) => {
                    tracing::error!(path = %target.display(), error = %error, "backup not restored");
                    report.failed.push(RestoreFailure {
                        path: target,
                        error,
                    });
                }
            }
        }

        for entry in applied.iter().filter(|e| e.action == ManifestAction::Add) {
            if let Ok(target) = self.target(entry) {
                tracing::warn!(path = %target.display(), "added file left in place by rollback");
                report.unreverted_adds.push(target);
            }
        }

        match report.status() {
            RollbackStatus::RolledBack => {
                tracing::info!(restored = report.restored.len(), "rollback complete")
            }
            RollbackStatus::RollbackIncomplete => tracing::error!(
                restored = report.restored.len(),
                failed = report.failed.len(),
                "rollback incomplete, installation is partially updated"
            ),
        }
        report
    }

    fn restore(&self, target: &Path) -> blocks_fs::Result<bool> {
        let backup = backup_path(target);
        let mut entry = self.registry.resolve(&backup)?;
        if !entry.exists() {
            return Ok(false);
        }
        entry.rename(target)?;
        self.registry.forget(&backup);
        self.registry.store(&entry);
        tracing::debug!(path = %target.display(), "restored");
        Ok(true)
    }

    /// Target of `entry`, or `None` with a warning when it cannot name a
    /// path below the root. Such an entry never produced a backup.
    fn sweep_target(&self, entry: &ManifestEntry) -> Option<PathBuf> {
        match self.target(entry) {
            Ok(target) => Some(target),
            Err(cause) => {
                tracing::warn!(line = entry.line, cause = %cause, "skipping manifest entry");
                None
            }
        }
    }

    /// `root/relative_path`, which must lie strictly below the root.
    fn target(&self, entry: &ManifestEntry) -> std::result::Result<PathBuf, FailureCause> {
        let root = self.root.to_string_lossy();
        let target = PathBuf::from(resolve_below(&root, &entry.relative_path)?);
        if target == self.root || !target.starts_with(&self.root) {
            return Err(FailureCause::OutsideRoot {
                path: entry.relative_path.clone(),
            });
        }
        Ok(target)
    }
}

/// Resolves `relative` against `base`, treating a leading separator as part
/// of the relative path.
fn resolve_below(base: &str, relative: &str) -> blocks_platform::Result<String> {
    let relative = relative.trim_start_matches(PathStyle::is_separator);
    resolve_from(relative, base, PathStyle::native())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(relative: &str) -> ManifestEntry {
        ManifestEntry {
            package_root: PathBuf::from("/pkg"),
            relative_path: relative.to_string(),
            action: ManifestAction::Add,
            line: 1,
        }
    }

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/srv/plugins/bar.php")),
            PathBuf::from("/srv/plugins/bar.php.bak")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_target_stays_below_root() {
        let dir = tempfile::tempdir().unwrap();
        let engine = UpdateEngine::new(dir.path()).unwrap();
        let root = engine.root().to_path_buf();

        assert_eq!(engine.target(&entry("plugins/foo.php")).unwrap(), root.join("plugins/foo.php"));
        assert_eq!(engine.target(&entry("/plugins/foo.php")).unwrap(), root.join("plugins/foo.php"));
        assert_eq!(engine.target(&entry("a/../b.txt")).unwrap(), root.join("b.txt"));
        for escaping in ["../outside.txt", "a/../../x", "", "."] {
            assert!(matches!(
                engine.target(&entry(escaping)),
                Err(FailureCause::OutsideRoot { .. })
            ));
        }
    }

    #[test]
    fn test_relative_lock_file_is_below_root() {
        let dir = tempfile::tempdir().unwrap();
        let engine = UpdateEngine::new(dir.path()).unwrap().lock_file("locks/update.lock");
        assert_eq!(engine.lock_file, engine.root().join("locks/update.lock"));
    }

    #[test]
    fn test_settings_lock_file_is_anchored_at_root() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            installation_root: dir.path().to_path_buf(),
            ..Settings::default()
        };
        let engine = UpdateEngine::from_settings(&settings).unwrap();
        assert_eq!(engine.lock_file, engine.root().join(DEFAULT_LOCK_FILE));

        let absolute = dir.path().join("elsewhere.lock");
        let settings = Settings {
            lock_file: absolute.clone(),
            ..settings
        };
        let engine = UpdateEngine::from_settings(&settings).unwrap();
        assert_eq!(engine.lock_file, absolute);
    }
}
