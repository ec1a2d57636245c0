use anyhow::{Result, bail};
use blocks_update::{RollbackStatus, Settings};

use super::Target;

#[derive(Clone, Debug, clap::Args)]
pub struct Rollback {
    #[command(flatten)]
    pub target: Target,
}

impl Rollback {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let (engine, manifest) = self.target.load(settings)?;
        let report = engine.rollback(&manifest)?;
        for path in &report.restored {
            println!("restored {}", path.display());
        }
        for failure in &report.failed {
            eprintln!("not restored {}: {}", failure.path.display(), failure.error);
        }
        if report.status() == RollbackStatus::RollbackIncomplete {
            bail!("{report}");
        }
        println!("{report}");
        Ok(())
    }
}
