use std::path::PathBuf;

use anyhow::{Context, Result};
use blocks_archive::ExtractOptions;
use blocks_update::{ProgressHook, Settings, package};

use super::{Target, codec};

#[derive(Clone, Debug, clap::Args)]
pub struct Update {
    #[command(flatten)]
    pub target: Target,

    /// Package archive to unpack into `--workdir` before applying
    #[arg(long, short, requires = "workdir")]
    pub package: Option<PathBuf>,

    /// Directory the package is unpacked into; emptied first
    #[arg(long, short)]
    pub workdir: Option<PathBuf>,

    /// Delete the backups once the update succeeded
    #[arg(long)]
    pub purge: bool,

    /// Use the built-in ZIP codec even when `zip`/`unzip` are installed
    #[arg(long)]
    pub pure: bool,
}

impl Update {
    pub fn run(self, settings: &Settings) -> Result<()> {
        if let (Some(archive), Some(workdir)) = (&self.package, &self.workdir) {
            let options = ExtractOptions::new().directory_mode(settings.directory_mode);
            let root = package::unpack(&codec(self.pure), archive, workdir, &options)
                .with_context(|| format!("Failed to unpack {}", archive.display()))?;
            println!("unpacked {} into {}", archive.display(), root.display());
        }

        let (engine, manifest) = self.target.load(settings)?;
        let engine = engine.hook(ProgressHook);
        let report = engine.apply(&manifest)?;
        println!(
            "applied {} entries to {}, {} backups kept",
            report.applied.len(),
            engine.root().display(),
            report.backups.len()
        );

        if self.purge {
            let purged = engine.purge_backups(&manifest)?;
            println!("purged {} backups", purged.len());
        }
        Ok(())
    }
}
