//! Fine-grained suspension of just the directories a move touches.

use crate::monitor::LibraryId;
use crate::registry::PathRegistry;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Runs an operation with the source and target directories of a move
/// unregistered, then puts them back.
#[derive(Clone)]
pub struct ScopedExecutor {
    registry: PathRegistry,
    settle_delay: Duration,
}

/// Directories taken out of the table for one operation. Restores them on
/// drop, so a cancelled or panicking operation still leaves the table intact.
struct Suspension {
    registry: PathRegistry,
    library_id: LibraryId,
    target_dir: Option<PathBuf>,
    suspended: Vec<PathBuf>,
}

impl Suspension {
    fn suspend(&mut self, dir: &Path) {
        if self.registry.is_monitored(dir) && self.registry.unregister(dir) {
            tracing::debug!(path = %dir.display(), "Suspended directory");
            self.suspended.push(dir.to_path_buf());
        }
    }

    fn register(&self, dir: &Path) {
        if let Err(e) = self.registry.register(dir, self.library_id) {
            tracing::warn!(path = %dir.display(), error = ?e, "Could not re-register directory");
        }
    }

    /// Directories between `dir` and its nearest monitored ancestor that are
    /// not monitored themselves, outermost first. Empty if no ancestor is
    /// monitored at all.
    fn unmonitored_ancestors(&self, dir: &Path) -> Vec<PathBuf> {
        let mut pending = Vec::new();
        for ancestor in dir.ancestors().skip(1) {
            if self.registry.is_monitored(ancestor) {
                pending.reverse();
                return pending;
            }
            pending.push(ancestor.to_path_buf());
        }
        Vec::new()
    }

    fn restore(&mut self) {
        for dir in std::mem::take(&mut self.suspended) {
            if dir.is_dir() {
                self.register(&dir);
            } else {
                tracing::debug!(path = %dir.display(), "Suspended directory no longer exists");
            }
        }
        let Some(target_dir) = self.target_dir.take() else {
            return;
        };
        if !target_dir.is_dir() {
            return;
        }
        if !self.registry.is_monitored(&target_dir) {
            // A move can create several levels of directories at once.
            for ancestor in self.unmonitored_ancestors(&target_dir) {
                self.register(&ancestor);
            }
            self.register(&target_dir);
        }
        let added = self
            .registry
            .register_new_subdirectories_blocking(self.library_id, &target_dir);
        if added > 0 {
            tracing::debug!(path = %target_dir.display(), added, "Registered new subdirectories");
        }
    }
}

impl Drop for Suspension {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Restores on the blocking pool, since restoring checks and walks the disk.
async fn restore_off_thread(mut suspension: Suspension) {
    let result = tokio::task::spawn_blocking(move || suspension.restore()).await;
    if let Err(e) = result {
        tracing::warn!(error = %e, "Restoring suspended directories did not complete");
    }
}

impl ScopedExecutor {
    pub fn new(registry: PathRegistry, settle_delay: Duration) -> Self {
        Self { registry, settle_delay }
    }

    pub fn registry(&self) -> &PathRegistry {
        &self.registry
    }

    /// Run `operation` (typically a rename from `source` to `target`) with the
    /// parent directories of both paths suspended.
    ///
    /// The target directory is only suspended if it differs from the source
    /// directory and already exists. After the operation (successful or not)
    /// there is a short settle delay before anything is re-registered, so
    /// events the backend raised during the move are discarded. Directories
    /// that were suspended are only re-registered if they still exist; the
    /// target directory and any new subdirectories are registered as needed.
    /// That disk work runs on the blocking pool, except when the returned
    /// future is dropped early, in which case it runs inline on drop.
    #[instrument(skip_all, fields(%library_id, source = %source.display(), target = %target.display()))]
    pub async fn execute_with_paths_suspended<F: Future>(
        &self,
        source: &Path,
        target: &Path,
        library_id: LibraryId,
        operation: F,
    ) -> F::Output {
        let source_dir = source.parent();
        let target_dir = target.parent();
        let mut suspension = Suspension {
            registry: self.registry.clone(),
            library_id,
            target_dir: target_dir.map(Path::to_path_buf),
            suspended: Vec::new(),
        };
        if let Some(dir) = source_dir {
            suspension.suspend(dir);
        }
        if let Some(dir) = target_dir
            && target_dir != source_dir
            && tokio::fs::try_exists(dir).await.unwrap_or(false)
        {
            suspension.suspend(dir);
        }

        let output = operation.await;
        tokio::time::sleep(self.settle_delay).await;
        restore_off_thread(suspension).await;
        output
    }
}
