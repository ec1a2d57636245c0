use crate::{Error, Result};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Permission bits written as a four digit octal string (`"0754"`).
///
/// Input shorter than four digits is left-padded with zeros, so `"755"` and
/// `"0755"` parse to the same mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct OctalMode(u32);

impl OctalMode {
    /// Applied to directories when no mode is configured.
    pub const DEFAULT_DIRECTORY: Self = Self(0o754);

    pub fn from_bits(bits: u32) -> Self {
        Self(bits & 0o7777)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let invalid = || Error::InvalidMode {
            value: value.to_string(),
        };
        if trimmed.is_empty() || trimmed.len() > 4 {
            return Err(invalid());
        }
        let padded = format!("{trimmed:0>4}");
        u32::from_str_radix(&padded, 8)
            .map(Self)
            .map_err(|_| invalid())
    }

    /// Whether any write bit is set.
    pub fn is_writable(self) -> bool {
        self.0 & 0o222 != 0
    }

    /// Mode bits of an existing path; absent without POSIX permissions.
    #[cfg(unix)]
    pub fn of(metadata: &std::fs::Metadata) -> Option<Self> {
        use std::os::unix::fs::PermissionsExt;
        Some(Self::from_bits(metadata.permissions().mode()))
    }

    #[cfg(not(unix))]
    pub fn of(_metadata: &std::fs::Metadata) -> Option<Self> {
        None
    }

    /// Sets the mode on `path`.
    ///
    /// On Windows only the read-only attribute is derived from the write bits.
    pub fn apply_to_path(self, path: &Path) -> Result<()> {
        let write_err = |source| Error::Write {
            path: path.to_path_buf(),
            source,
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(self.0))
                .map_err(write_err)?;
        }

        #[cfg(windows)]
        {
            let mut perms = std::fs::metadata(path).map_err(write_err)?.permissions();
            perms.set_readonly(!self.is_writable());
            std::fs::set_permissions(path, perms).map_err(write_err)?;
        }

        Ok(())
    }
}

impl Default for OctalMode {
    fn default() -> Self {
        Self::DEFAULT_DIRECTORY
    }
}

impl fmt::Display for OctalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

impl FromStr for OctalMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<OctalMode> for String {
    fn from(mode: OctalMode) -> Self {
        mode.to_string()
    }
}

struct OctalModeVisitor;

impl Visitor<'_> for OctalModeVisitor {
    type Value = OctalMode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("up to four octal digits, as a string or an integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<OctalMode, E> {
        OctalMode::parse(v).map_err(E::custom)
    }

    // Unquoted `750` in TOML or an environment variable arrives as an integer.
    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<OctalMode, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<OctalMode, E> {
        self.visit_str(&v.to_string())
    }
}

impl<'de> Deserialize<'de> for OctalMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(OctalModeVisitor)
    }
}

/// Clears the process umask until dropped.
///
/// The umask is process wide; hold the guard only around the call that needs
/// exact mode bits.
pub struct UmaskGuard {
    #[cfg(unix)]
    previous: nix::sys::stat::Mode,
}

impl UmaskGuard {
    #[cfg(unix)]
    pub fn clear() -> Self {
        let previous = nix::sys::stat::umask(nix::sys::stat::Mode::empty());
        Self { previous }
    }

    #[cfg(not(unix))]
    pub fn clear() -> Self {
        Self {}
    }
}

impl Drop for UmaskGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        nix::sys::stat::umask(self.previous);
    }
}
