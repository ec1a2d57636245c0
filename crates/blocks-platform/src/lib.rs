//! Platform helpers shared by the Blocks filesystem and update crates.
//!
//! - `path` - pure string canonicalization of user supplied paths
//! - `command` - thin wrapper over host programs (used by the native archive backend)

pub use error::{Error, Result};
pub use path::{PathStyle, normalize, resolve, resolve_from};

pub mod command;
mod error;
pub mod path;
