//! Unpacking a downloaded update package.

use std::path::{Path, PathBuf};

use blocks_archive::{ArchiveCodec, ExtractOptions};
use blocks_fs::{Entry, create_dir_all_with_mode};

use crate::Result;

/// Empties `workdir` and extracts `archive` into it.
///
/// Returns the resolved package root, ready to be referenced from a manifest.
pub fn unpack(
    codec: &ArchiveCodec,
    archive: impl AsRef<Path>,
    workdir: impl AsRef<Path>,
    options: &ExtractOptions,
) -> Result<PathBuf> {
    let mut workdir = Entry::open(workdir)?;
    if workdir.exists() {
        tracing::debug!(path = %workdir.path().display(), "clearing package workdir");
        workdir.delete(true)?;
    }
    create_dir_all_with_mode(workdir.path(), options.directory_mode)?;

    let report = codec.extract_archive(archive.as_ref(), workdir.path(), options)?;
    tracing::info!(
        root = %workdir.path().display(),
        files = report.files,
        "unpacked update package"
    );
    Ok(workdir.path().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocks_archive::CreateOptions;
    use std::fs;

    #[test]
    fn test_unpack_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("plugins")).unwrap();
        fs::write(src.join("plugins/foo.php"), b"<?php new").unwrap();
        let archive = dir.path().join("package.zip");
        let codec = ArchiveCodec::pure();
        codec.create_archive(&src, &archive, &CreateOptions::new()).unwrap();

        let workdir = dir.path().join("work");
        fs::create_dir_all(&workdir).unwrap();
        fs::write(workdir.join("stale.txt"), b"old").unwrap();

        let root = unpack(&codec, &archive, &workdir, &ExtractOptions::new()).unwrap();
        assert_eq!(fs::read(root.join("plugins/foo.php")).unwrap(), b"<?php new");
        assert!(!root.join("stale.txt").exists());
    }
}
