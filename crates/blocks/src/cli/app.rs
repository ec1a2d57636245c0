use std::path::PathBuf;

use anyhow::Result;
use blocks_update::Settings;
use clap::{ArgAction, Parser, Subcommand};

use super::archive::{Archive, Extract};
use super::inspect::Inspect;
use super::purge::Purge;
use super::rollback::Rollback;
use super::update::Update;
use super::walk::Walk;

#[derive(Clone, Debug, Parser)]
#[command(name = "blocks", version, about, long_about = None, propagate_version = true)]
pub struct App {
    /// TOML settings file; `BLOCKS_*` environment variables take precedence
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Log more; repeat for trace output
    #[arg(long, short, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    // Installation
    #[command(alias = "up", name = "update", about = "Apply a manifest to the installation")]
    Update(Update),
    #[command(alias = "rb", name = "rollback", about = "Restore the backups a manifest left behind")]
    Rollback(Rollback),
    #[command(name = "purge", about = "Delete the backups a manifest left behind")]
    Purge(Purge),

    // Archives
    #[command(alias = "zip", name = "archive", about = "Store a directory tree in a ZIP archive")]
    Archive(Archive),
    #[command(alias = "unzip", name = "extract", about = "Extract a ZIP archive")]
    Extract(Extract),

    // Filesystem
    #[command(alias = "i", name = "inspect", about = "Show what is known about a path")]
    Inspect(Inspect),
    #[command(alias = "ls", name = "walk", about = "List a directory, optionally filtered")]
    Walk(Walk),
}

impl App {
    pub fn run(self) -> Result<()> {
        let settings = Settings::load(self.config.as_deref())?;
        match self.cmd {
            Commands::Update(cmd) => cmd.run(&settings),
            Commands::Rollback(cmd) => cmd.run(&settings),
            Commands::Purge(cmd) => cmd.run(&settings),
            Commands::Archive(cmd) => cmd.run(),
            Commands::Extract(cmd) => cmd.run(&settings),
            Commands::Inspect(cmd) => cmd.run(),
            Commands::Walk(cmd) => cmd.run(),
        }
    }
}
