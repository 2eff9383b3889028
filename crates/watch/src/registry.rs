//! Registration of library directories with the monitor.

use crate::MonitorHandle;
use crate::error::Result;
use crate::monitor::LibraryId;
use std::path::{Path, PathBuf};
use tracing::instrument;
use walkdir::WalkDir;

/// Every directory under `root` (inclusive when `min_depth` is zero), skipping
/// anything that can't be read.
pub(crate) fn walk_directories(root: &Path, min_depth: usize) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .min_depth(min_depth)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable directory entry");
                None
            },
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(walkdir::DirEntry::into_path)
}

/// [`walk_directories`] from `root`, or `None` if `root` isn't a directory.
fn scan(root: &Path, min_depth: usize) -> Option<Vec<PathBuf>> {
    root.is_dir().then(|| walk_directories(root, min_depth).collect())
}

/// [`scan`] on the blocking pool.
async fn scan_off_thread(root: &Path, min_depth: usize) -> Option<Vec<PathBuf>> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || scan(&root, min_depth))
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Directory walk did not complete");
            None
        })
}

/// Thin adapter over the monitor's path table.
///
/// Single-path operations delegate directly. The subtree and bulk forms walk
/// the disk and log (rather than return) failures for individual
/// directories, so one unreadable folder doesn't leave the rest of a library
/// unobserved. They walk on tokio's blocking pool; the `_blocking` variants
/// walk on the calling thread, for drop guards and synchronous callers.
#[derive(Clone)]
pub struct PathRegistry {
    monitor: MonitorHandle,
}

impl PathRegistry {
    pub fn new(monitor: MonitorHandle) -> Self {
        Self { monitor }
    }

    pub fn monitor(&self) -> &MonitorHandle {
        &self.monitor
    }

    pub fn is_monitored(&self, path: &Path) -> bool {
        self.monitor.is_monitored(path)
    }

    pub fn register(&self, path: &Path, library_id: LibraryId) -> Result<()> {
        self.monitor.register_path(path, library_id)
    }

    pub fn unregister(&self, path: &Path) -> bool {
        self.monitor.unregister_path(path)
    }

    pub fn unregister_library(&self, library_id: LibraryId) -> usize {
        let removed = self.monitor.unregister_library(library_id);
        tracing::debug!(%library_id, removed, "Unregistered library");
        removed
    }

    /// Register a library root and every directory beneath it.
    ///
    /// A missing root (or one that isn't a directory) registers nothing. An
    /// error is only returned if the root itself can't be registered.
    #[instrument(skip_all, fields(%library_id, root = %root.display()))]
    pub async fn register_library_subtree(&self, library_id: LibraryId, root: &Path) -> Result<usize> {
        let directories = scan_off_thread(root, 0).await;
        self.register_tree(library_id, directories)
    }

    #[instrument(skip_all, fields(%library_id, root = %root.display()))]
    pub fn register_library_subtree_blocking(&self, library_id: LibraryId, root: &Path) -> Result<usize> {
        self.register_tree(library_id, scan(root, 0))
    }

    /// Register several libraries at once; returns the number of directories
    /// registered across all of them.
    pub async fn register_libraries<P: AsRef<Path>>(
        &self,
        libraries: impl IntoIterator<Item = (LibraryId, P)>,
    ) -> usize {
        let mut registered = 0;
        for (library_id, root) in libraries {
            let result = self.register_library_subtree(library_id, root.as_ref()).await;
            registered += Self::count_library(library_id, result);
        }
        registered
    }

    pub fn register_libraries_blocking<P: AsRef<Path>>(
        &self,
        libraries: impl IntoIterator<Item = (LibraryId, P)>,
    ) -> usize {
        libraries
            .into_iter()
            .map(|(library_id, root)| {
                let result = self.register_library_subtree_blocking(library_id, root.as_ref());
                Self::count_library(library_id, result)
            })
            .sum()
    }

    pub fn unregister_libraries(&self, library_ids: impl IntoIterator<Item = LibraryId>) -> usize {
        library_ids.into_iter().map(|id| self.unregister_library(id)).sum()
    }

    /// Register the directories below `dir` (not `dir` itself) that aren't
    /// already monitored.
    pub async fn register_new_subdirectories(&self, library_id: LibraryId, dir: &Path) -> usize {
        let directories = scan_off_thread(dir, 1).await;
        self.register_unmonitored(library_id, directories.unwrap_or_default())
    }

    pub fn register_new_subdirectories_blocking(&self, library_id: LibraryId, dir: &Path) -> usize {
        self.register_unmonitored(library_id, scan(dir, 1).unwrap_or_default())
    }

    /// `directories` is the root followed by everything beneath it.
    fn register_tree(&self, library_id: LibraryId, directories: Option<Vec<PathBuf>>) -> Result<usize> {
        let Some((root, rest)) = directories.as_deref().and_then(<[PathBuf]>::split_first) else {
            tracing::debug!("Library root is not a directory, nothing to register");
            return Ok(0);
        };
        self.register(root, library_id)?;
        let mut registered = 1;
        for dir in rest {
            match self.register(dir, library_id) {
                Ok(()) => registered += 1,
                Err(e) => tracing::warn!(path = %dir.display(), error = ?e, "Could not register directory"),
            }
        }
        tracing::debug!(registered, "Registered library subtree");
        Ok(registered)
    }

    fn register_unmonitored(&self, library_id: LibraryId, directories: Vec<PathBuf>) -> usize {
        let mut registered = 0;
        for sub in directories {
            if self.is_monitored(&sub) {
                continue;
            }
            match self.register(&sub, library_id) {
                Ok(()) => registered += 1,
                Err(e) => tracing::warn!(path = %sub.display(), error = ?e, "Could not register new subdirectory"),
            }
        }
        registered
    }

    fn count_library(library_id: LibraryId, result: Result<usize>) -> usize {
        result.unwrap_or_else(|e| {
            tracing::warn!(%library_id, error = ?e, "Could not register library");
            0
        })
    }
}
