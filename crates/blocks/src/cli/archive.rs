use std::path::PathBuf;

use anyhow::{Context, Result};
use blocks_archive::{CreateOptions, ExtractOptions};
use blocks_fs::{Filter, OctalMode};
use blocks_update::Settings;

use super::codec;

#[derive(Clone, Debug, clap::Args)]
pub struct Archive {
    /// Directory whose files are stored
    pub source: PathBuf,

    /// Archive to write; an existing file is replaced
    pub archive: PathBuf,

    /// Only store files ending in `.<ext>` or matching `/regex/`; repeatable
    #[arg(long, short)]
    pub filter: Vec<String>,

    /// Use the built-in ZIP codec even when `zip`/`unzip` are installed
    #[arg(long)]
    pub pure: bool,
}

impl Archive {
    pub fn run(self) -> Result<()> {
        let filter = Filter::new(&self.filter).context("Invalid filter")?;
        let codec = codec(self.pure);
        let summary = codec
            .create_archive(&self.source, &self.archive, &CreateOptions::new().filter(filter))
            .with_context(|| format!("Failed to archive {}", self.source.display()))?;
        println!(
            "stored {} files ({} bytes) in {} using the {} backend",
            summary.files,
            summary.bytes,
            self.archive.display(),
            codec.backend_name()
        );
        Ok(())
    }
}

#[derive(Clone, Debug, clap::Args)]
pub struct Extract {
    pub archive: PathBuf,

    pub destination: PathBuf,

    /// Mode for created directories, in octal; defaults to `directory_mode`
    #[arg(long)]
    pub mode: Option<OctalMode>,

    /// Use the built-in ZIP codec even when `zip`/`unzip` are installed
    #[arg(long)]
    pub pure: bool,
}

impl Extract {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let mode = self.mode.unwrap_or(settings.directory_mode);
        let report = codec(self.pure)
            .extract_archive(&self.archive, &self.destination, &ExtractOptions::new().directory_mode(mode))
            .with_context(|| format!("Failed to extract {}", self.archive.display()))?;
        println!(
            "extracted {} files and {} directories into {}",
            report.files,
            report.directories,
            self.destination.display()
        );
        if report.skipped > 0 {
            println!("ignored {} metadata entries", report.skipped);
        }
        Ok(())
    }
}
