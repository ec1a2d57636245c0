//! Filesystem layer for Blocks.
//!
//! [`Entry`] wraps one canonicalized path and probes it lazily. [`walk`]
//! enumerates directories through a [`Filter`]. [`Registry`] caches entries for
//! one session and [`InstallationLock`] serializes update runs.

mod cancel;
mod entry;
mod error;
pub mod identity;
mod lock;
pub mod mime;
pub mod permissions;
mod registry;
pub mod size;
pub mod walk;

pub use cancel::CancelToken;
pub use entry::{Entry, EntryKind, WriteOptions, create_dir_all_with_mode};
pub use error::{Error, Result};
pub use identity::Identity;
pub use lock::InstallationLock;
pub use permissions::{OctalMode, UmaskGuard};
pub use registry::Registry;
pub use walk::{Filter, WalkOptions, has_suffix, walk};
