use anyhow::Result;
use blocks_update::Settings;

use super::Target;

#[derive(Clone, Debug, clap::Args)]
pub struct Purge {
    #[command(flatten)]
    pub target: Target,
}

impl Purge {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let (engine, manifest) = self.target.load(settings)?;
        for path in engine.purge_backups(&manifest)? {
            println!("deleted {}", path.display());
        }
        Ok(())
    }
}
