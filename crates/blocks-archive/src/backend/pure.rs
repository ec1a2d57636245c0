use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{ArchiveBackend, ArchiveReader, ArchivedEntry, SourceFile};
use crate::{Error, Result};

/// In-process codec built on the `zip` crate. Always available.
#[derive(Clone, Copy, Debug, Default)]
pub struct PureBackend;

impl PureBackend {
    const NAME: &'static str = "pure";

    fn backend_error(err: ZipError) -> Error {
        Error::Backend {
            backend: Self::NAME,
            message: err.to_string(),
        }
    }
}

impl ArchiveBackend for PureBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn write(&self, archive: &Path, _source_root: &Path, files: &[SourceFile]) -> Result<()> {
        let out = File::create(archive).map_err(|source| Error::Write {
            path: archive.to_path_buf(),
            source,
        })?;
        let mut writer = ZipWriter::new(out);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for file in files {
            writer
                .start_file(file.name.as_str(), options)
                .map_err(Self::backend_error)?;
            let mut input = File::open(&file.path).map_err(|source| Error::Read {
                path: file.path.clone(),
                source,
            })?;
            io::copy(&mut input, &mut writer).map_err(|source| Error::Write {
                path: archive.to_path_buf(),
                source,
            })?;
        }
        writer.finish().map_err(Self::backend_error)?;
        Ok(())
    }

    fn open(&self, archive: &Path) -> Result<Box<dyn ArchiveReader>> {
        let corrupt = |reason: String| Error::Corrupt {
            path: archive.to_path_buf(),
            reason,
        };
        let file = File::open(archive).map_err(|e| corrupt(e.to_string()))?;
        let mut zip = ZipArchive::new(file).map_err(|e| corrupt(e.to_string()))?;

        let mut entries = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            let entry = zip.by_index(index).map_err(|e| corrupt(e.to_string()))?;
            entries.push(ArchivedEntry {
                name: entry.name().to_string(),
                is_dir: entry.is_dir(),
                size: Some(entry.size()),
            });
        }

        Ok(Box::new(PureReader {
            path: archive.to_path_buf(),
            zip,
            entries,
        }))
    }
}

struct PureReader {
    path: PathBuf,
    zip: ZipArchive<File>,
    entries: Vec<ArchivedEntry>,
}

impl ArchiveReader for PureReader {
    fn entries(&self) -> &[ArchivedEntry] {
        &self.entries
    }

    fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut entry = self.zip.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => Error::EntryNotFound {
                path: self.path.clone(),
                entry: name.to_string(),
            },
            other => Error::Corrupt {
                path: self.path.clone(),
                reason: other.to_string(),
            },
        })?;
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data).map_err(|source| Error::Read {
            path: self.path.clone(),
            source,
        })?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.txt");
        std::fs::write(&input, b"payload").unwrap();
        let archive = dir.path().join("out.zip");

        let files = [SourceFile {
            name: "nested/in.txt".into(),
            path: input,
        }];
        PureBackend.write(&archive, dir.path(), &files).unwrap();

        let mut reader = PureBackend.open(&archive).unwrap();
        assert_eq!(reader.entries().len(), 1);
        assert_eq!(reader.entries()[0].name, "nested/in.txt");
        assert_eq!(reader.entries()[0].size, Some(7));
        assert_eq!(reader.read("nested/in.txt").unwrap(), b"payload");
        assert!(matches!(reader.read("missing"), Err(Error::EntryNotFound { .. })));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("bad.zip");
        std::fs::write(&archive, b"definitely not a zip").unwrap();
        assert!(matches!(PureBackend.open(&archive), Err(Error::Corrupt { .. })));
    }
}
