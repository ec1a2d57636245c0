//! Runs in its own binary: it changes the process working directory.

use blocks_fs::{Filter, WalkOptions, walk};
use std::fs;
use std::path::Path;

#[cfg(unix)]
#[test]
fn test_relative_root_yields_absolute_paths() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("rel/sub")).unwrap();
    fs::write(dir.path().join("rel/a.txt"), b"a").unwrap();
    fs::write(dir.path().join("rel/sub/b.txt"), b"b").unwrap();
    std::env::set_current_dir(dir.path()).unwrap();

    let options = WalkOptions::new().recursive(true).sorted(true);
    let entries = walk(Path::new("rel"), &options).unwrap();
    assert_eq!(entries.len(), 3);
    for entry in &entries {
        assert!(entry.path().is_absolute(), "{}", entry.path().display());
    }
    assert!(entries[0].path().ends_with("rel/a.txt"));

    // Anchored rules see the full path.
    let anchored = options.filter(Filter::new([r"/^\/.*\/rel\/sub\/b\.txt$/"]).unwrap());
    let matched = walk(Path::new("./rel"), &anchored).unwrap();
    assert_eq!(matched.len(), 1);
    assert!(matched[0].path().ends_with("sub/b.txt"));
}
