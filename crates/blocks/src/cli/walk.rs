use std::path::PathBuf;

use anyhow::{Context, Result};
use blocks_fs::{Entry, Filter, WalkOptions, walk};

#[derive(Clone, Debug, clap::Args)]
pub struct Walk {
    pub root: PathBuf,

    /// Descend into subdirectories
    #[arg(long, short)]
    pub recursive: bool,

    /// Only list paths ending in `.<ext>` or matching `/regex/`; repeatable
    #[arg(long, short)]
    pub filter: Vec<String>,
}

impl Walk {
    pub fn run(self) -> Result<()> {
        let filter = Filter::new(&self.filter).context("Invalid filter")?;
        let options = WalkOptions::new()
            .recursive(self.recursive)
            .sorted(true)
            .filter(filter);
        let root = Entry::open(&self.root)?;
        let entries = walk(root.path(), &options)
            .with_context(|| format!("Failed to walk {}", root.path().display()))?;
        for entry in entries {
            println!("{}", entry.path().display());
        }
        Ok(())
    }
}
