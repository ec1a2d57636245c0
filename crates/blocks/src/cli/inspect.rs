use std::path::PathBuf;

use anyhow::{Result, bail};
use blocks_fs::{Entry, EntryKind};

#[derive(Clone, Debug, clap::Args)]
pub struct Inspect {
    pub path: PathBuf,
}

impl Inspect {
    pub fn run(self) -> Result<()> {
        let entry = Entry::open(&self.path)?;
        if !entry.exists() {
            bail!("{} does not exist", entry.path().display());
        }
        let kind = match entry.kind() {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Unknown => "unknown",
        };
        let unknown = || "-".to_string();

        println!("path:        {}", entry.path().display());
        println!("kind:        {kind}");
        println!("size:        {}", entry.human_size()?);
        println!("mime:        {}", entry.mime_type().unwrap_or("-"));
        println!("owner:       {}", entry.owner().map_or_else(unknown, |o| o.to_string()));
        println!("group:       {}", entry.group().map_or_else(unknown, |g| g.to_string()));
        println!("permissions: {}", entry.permissions().map_or_else(unknown, |m| m.to_string()));
        println!("readable:    {}", entry.is_readable());
        println!("writable:    {}", entry.is_writable());
        Ok(())
    }
}
