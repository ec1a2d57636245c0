use fs2::FileExt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Exclusive advisory lock on a lock file, released on drop.
///
/// Guards an installation against concurrent update runs.
#[derive(Debug)]
pub struct InstallationLock {
    file: File,
    path: PathBuf,
}

impl InstallationLock {
    fn open(path: &Path) -> Result<File> {
        File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| Error::Lock {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Blocks until the lock is available.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = Self::open(path)?;
        file.lock_exclusive().map_err(|source| Error::Lock {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "acquired installation lock");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Fails with [`Error::Locked`] instead of waiting.
    pub fn try_acquire(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = Self::open(path)?;
        if let Err(source) = file.try_lock_exclusive() {
            let contended = source.kind() == io::ErrorKind::WouldBlock
                || source.raw_os_error() == fs2::lock_contended_error().raw_os_error();
            return Err(if contended {
                Error::Locked {
                    path: path.to_path_buf(),
                }
            } else {
                Error::Lock {
                    path: path.to_path_buf(),
                    source,
                }
            });
        }
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallationLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        tracing::debug!(path = %self.path.display(), "released installation lock");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_holder_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".lock");
        let held = InstallationLock::acquire(&path).unwrap();
        assert!(matches!(
            InstallationLock::try_acquire(&path),
            Err(Error::Locked { .. })
        ));
        drop(held);
        assert!(InstallationLock::try_acquire(&path).is_ok());
    }

    #[test]
    fn test_missing_directory_is_lock_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent/.lock");
        assert!(matches!(
            InstallationLock::acquire(&path),
            Err(Error::Lock { .. })
        ));
    }
}
