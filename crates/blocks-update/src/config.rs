//! Layered settings: defaults, then an optional TOML file, then `BLOCKS_*`
//! environment variables.

use std::path::{Path, PathBuf};

use blocks_fs::OctalMode;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const ENV_PREFIX: &str = "BLOCKS_";

/// Lock file name, relative to the installation root.
pub const DEFAULT_LOCK_FILE: &str = ".blocks-update.lock";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub installation_root: PathBuf,
    /// Mode for directories created by updates and extraction.
    pub directory_mode: OctalMode,
    /// Relative paths are taken from the installation root.
    pub lock_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            installation_root: PathBuf::from("."),
            directory_mode: OctalMode::DEFAULT_DIRECTORY,
            lock_file: PathBuf::from(DEFAULT_LOCK_FILE),
        }
    }
}

impl Settings {
    /// Loads settings, reading `config` when given. A named file that does not
    /// exist is an error.
    pub fn load(config: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = config {
            if !path.is_file() {
                return Err(Error::MissingConfig {
                    path: path.to_path_buf(),
                });
            }
            figment = figment.merge(Toml::file(path));
        }
        let settings: Self = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;
        tracing::debug!(
            root = %settings.installation_root.display(),
            directory_mode = %settings.directory_mode,
            "loaded settings"
        );
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let settings = Settings::load(None).unwrap();
            assert_eq!(settings, Settings::default());
            assert_eq!(settings.directory_mode.bits(), 0o754);
            assert_eq!(settings.lock_file, PathBuf::from(DEFAULT_LOCK_FILE));
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "blocks.toml",
                r#"
                installation_root = "/srv/www"
                directory_mode = "750"
                "#,
            )?;
            jail.set_env("BLOCKS_DIRECTORY_MODE", "0700");

            let settings = Settings::load(Some(Path::new("blocks.toml"))).unwrap();
            assert_eq!(settings.installation_root, PathBuf::from("/srv/www"));
            assert_eq!(settings.directory_mode.bits(), 0o700);
            Ok(())
        });
    }

    #[test]
    fn test_unquoted_env_mode() {
        Jail::expect_with(|jail| {
            jail.set_env("BLOCKS_DIRECTORY_MODE", "755");
            let settings = Settings::load(None).unwrap();
            assert_eq!(settings.directory_mode.bits(), 0o755);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_mode_is_config_error() {
        Jail::expect_with(|jail| {
            jail.create_file("blocks.toml", "directory_mode = \"0789\"")?;
            let result = Settings::load(Some(Path::new("blocks.toml")));
            assert!(matches!(result, Err(Error::Config(_))));
            Ok(())
        });
    }

    #[test]
    fn test_missing_named_file() {
        Jail::expect_with(|_jail| {
            assert!(matches!(
                Settings::load(Some(Path::new("absent.toml"))),
                Err(Error::MissingConfig { .. })
            ));
            Ok(())
        });
    }
}
