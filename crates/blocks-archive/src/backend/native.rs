use std::fs;
use std::path::{Path, PathBuf};

use blocks_platform::command::{Command, locate};
use tempfile::TempDir;

use super::{ArchiveBackend, ArchiveReader, ArchivedEntry, SourceFile};
use crate::{Error, Result};

/// End-of-central-directory record of an archive with no entries.
const EMPTY_ARCHIVE: [u8; 22] = [
    b'P', b'K', 0x05, 0x06, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// Codec that drives the host's Info-ZIP `zip` and `unzip` programs.
#[derive(Clone, Debug)]
pub struct NativeBackend {
    zip: PathBuf,
    unzip: PathBuf,
}

impl NativeBackend {
    const NAME: &'static str = "native";

    /// Locates both programs on `PATH`; `None` when either is missing.
    pub fn detect() -> Option<Self> {
        let zip = locate("zip")?;
        let unzip = locate("unzip")?;
        tracing::debug!(zip = %zip.display(), unzip = %unzip.display(), "found native zip tools");
        Some(Self { zip, unzip })
    }

    fn failure(message: impl Into<String>) -> Error {
        Error::Backend {
            backend: Self::NAME,
            message: message.into(),
        }
    }
}

impl ArchiveBackend for NativeBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn write(&self, archive: &Path, source_root: &Path, files: &[SourceFile]) -> Result<()> {
        if files.is_empty() {
            return fs::write(archive, EMPTY_ARCHIVE).map_err(|source| Error::Write {
                path: archive.to_path_buf(),
                source,
            });
        }
        if let Some(file) = files.iter().find(|f| f.name.contains('\n')) {
            return Err(Self::failure(format!(
                "entry name {:?} cannot be passed to zip",
                file.name
            )));
        }

        let names = files
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        // -D: no directory entries, -X: no extra attributes, -nw: names are literal.
        let output = Command::at(&self.zip)
            .args(["-q", "-D", "-X", "-nw"])
            .arg(archive)
            .arg("-@")
            .current_dir(source_root)
            .stdin_bytes(names)
            .output()?;
        if !output.status.success() {
            return Err(Self::failure(format!(
                "zip exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    fn open(&self, archive: &Path) -> Result<Box<dyn ArchiveReader>> {
        let corrupt = |reason: String| Error::Corrupt {
            path: archive.to_path_buf(),
            reason,
        };
        if !archive.is_file() {
            return Err(corrupt("not a readable file".into()));
        }

        let output = Command::at(&self.unzip)
            .args(["-Z1"])
            .arg(archive)
            .output()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let entries = if is_empty_listing(&stdout, &stderr) {
            Vec::new()
        } else if output.status.success() {
            stdout
                .lines()
                .filter(|line| !line.is_empty())
                .map(|name| ArchivedEntry {
                    name: name.to_string(),
                    is_dir: name.ends_with('/'),
                    size: None,
                })
                .collect()
        } else {
            let reason = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
            return Err(corrupt(reason.to_string()));
        };

        Ok(Box::new(NativeReader {
            unzip: self.unzip.clone(),
            archive: archive.to_path_buf(),
            entries,
            staging: None,
        }))
    }
}

fn is_empty_listing(stdout: &str, stderr: &str) -> bool {
    stdout.trim() == "Empty zipfile." || stderr.contains("zipfile is empty")
}

/// Reads entries from a private staging copy, unpacked on first read.
struct NativeReader {
    unzip: PathBuf,
    archive: PathBuf,
    entries: Vec<ArchivedEntry>,
    staging: Option<TempDir>,
}

impl NativeReader {
    fn staging(&mut self) -> Result<&Path> {
        if self.staging.is_none() {
            let dir = tempfile::Builder::new()
                .prefix(".blocks-unzip-")
                .tempdir()
                .map_err(|source| Error::Write {
                    path: std::env::temp_dir(),
                    source,
                })?;
            let output = Command::at(&self.unzip)
                .args(["-qq", "-o"])
                .arg(&self.archive)
                .arg("-d")
                .arg(dir.path())
                .output()?;
            // 1 is a warning exit status (e.g. a skipped entry).
            if !matches!(output.status.code(), Some(0 | 1)) {
                return Err(Error::Corrupt {
                    path: self.archive.clone(),
                    reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
            self.staging = Some(dir);
        }
        match &self.staging {
            Some(dir) => Ok(dir.path()),
            None => Err(NativeBackend::failure("staging directory missing")),
        }
    }
}

impl ArchiveReader for NativeReader {
    fn entries(&self) -> &[ArchivedEntry] {
        &self.entries
    }

    fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        if !self.entries.iter().any(|e| e.name == name) {
            return Err(Error::EntryNotFound {
                path: self.archive.clone(),
                entry: name.to_string(),
            });
        }
        let staged = self.staging()?.join(name);
        fs::read(&staged).map_err(|source| Error::Read { path: staged, source })
    }
}
