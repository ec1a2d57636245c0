pub mod app;
mod archive;
mod inspect;
mod purge;
mod rollback;
mod update;
mod walk;

use std::path::PathBuf;

use anyhow::{Context, Result};
use blocks_archive::ArchiveCodec;
use blocks_update::{Manifest, Settings, UpdateEngine};

/// Flags shared by the commands that act on an installation.
#[derive(Clone, Debug, clap::Args)]
pub struct Target {
    /// Manifest file, one `<packageRoot>;<relativePath>;<Action>` record per line
    pub manifest: PathBuf,

    /// Installation root; overrides `installation_root` from the settings
    #[arg(long, short)]
    pub root: Option<PathBuf>,
}

impl Target {
    pub fn load(&self, settings: &Settings) -> Result<(UpdateEngine, Manifest)> {
        let mut settings = settings.clone();
        if let Some(root) = &self.root {
            settings.installation_root = root.clone();
        }
        let engine = UpdateEngine::from_settings(&settings)?;
        let manifest = Manifest::load(&self.manifest)
            .with_context(|| format!("Failed to load manifest {}", self.manifest.display()))?;
        Ok((engine, manifest))
    }
}

fn codec(pure: bool) -> ArchiveCodec {
    if pure { ArchiveCodec::pure() } else { ArchiveCodec::detect() }
}
