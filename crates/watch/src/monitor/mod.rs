//! The watcher contract and its implementations.
//!
//! A [`Monitor`] owns a table of directories, each attributed to the library
//! it belongs to. Directories are watched **non-recursively**: every
//! subdirectory of a library has its own entry, which is what allows a single
//! directory to be taken out of observation while a file is moved through it.

#[cfg(any(test, feature = "mock"))]
mod mock;
mod native;

use crate::error::Result;
use derive_more::{Display, From};
#[cfg(any(test, feature = "mock"))]
pub use self::mock::{MockMonitor, MonitorCall};
pub use self::native::{NotifyMonitor, WatchEventStream};
use std::path::{Path, PathBuf};

/// Identifier of a library root, as assigned by whoever persists libraries.
#[derive(Debug, Display, From, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(transparent))]
#[display("{_0}")]
pub struct LibraryId(pub u64);

/// Directory watcher with a mutable path table and a global pause switch.
///
/// All methods take `&self`; implementations synchronise internally so a
/// single handle can be shared between the event consumer and any number of
/// relocation tasks.
pub trait Monitor: Send + Sync {
    /// Whether `path` currently has an entry in the table.
    fn is_monitored(&self, path: &Path) -> bool;

    /// Start watching a directory on behalf of a library. Registering a path
    /// that is already present replaces its owner.
    fn register_path(&self, path: &Path, library_id: LibraryId) -> Result<()>;

    /// Stop watching a directory. Returns `false` if it was not monitored.
    fn unregister_path(&self, path: &Path) -> bool;

    /// Stop watching every directory owned by a library, returning how many
    /// entries were removed.
    fn unregister_library(&self, library_id: LibraryId) -> usize;

    /// Snapshot of the table.
    fn monitored_paths(&self) -> Vec<(PathBuf, LibraryId)>;

    /// Stop delivering events. The table is left untouched.
    fn pause(&self);

    fn resume(&self);

    fn is_paused(&self) -> bool;
}
