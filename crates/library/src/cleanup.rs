//! Removal of directories left empty by a move.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tome_storage::{Filesystem, normalize};
use tracing::instrument;

/// Files that operating systems drop into directories on their own. A
/// directory containing nothing else counts as empty.
pub const DEFAULT_IGNORED_FILES: [&str; 2] = [".DS_Store", "Thumbs.db"];

pub fn default_ignored_files() -> HashSet<String> {
    DEFAULT_IGNORED_FILES.iter().map(|s| s.to_string()).collect()
}

/// Walks upward from `start`, deleting each directory whose only contents are
/// `ignored` files (deleting those files first). Returns the number of
/// directories deleted.
///
/// Stops at the first directory that is a library root, lies outside every
/// library root, no longer exists, can't be read, or holds anything worth
/// keeping. Failures are logged and end the walk; they are never returned.
#[instrument(skip_all, fields(start = %start.display()))]
pub async fn cleanup_empty_ancestors(
    fs: &dyn Filesystem,
    start: &Path,
    library_roots: &[PathBuf],
    ignored: &HashSet<String>,
) -> usize {
    let roots: Vec<PathBuf> = library_roots.iter().map(normalize).collect();
    let mut removed = 0;
    let mut current = Some(normalize(start));
    while let Some(dir) = current {
        if roots.contains(&dir) {
            tracing::debug!(path = %dir.display(), "Reached library root");
            break;
        }
        if !roots.iter().any(|root| dir.starts_with(root)) {
            tracing::debug!(path = %dir.display(), "Outside every library root");
            break;
        }
        match fs.is_dir(&dir).await {
            Ok(true) => {},
            Ok(false) => {
                tracing::debug!(path = %dir.display(), "No longer a directory, nothing to clean up");
                break;
            },
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = ?e, "Cannot inspect directory, stopping cleanup");
                break;
            },
        }
        let entries = match fs.list(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = ?e, "Cannot read directory, stopping cleanup");
                break;
            },
        };
        let only_ignored = entries.iter().all(|entry| {
            entry
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| ignored.contains(name))
        });
        if !only_ignored {
            tracing::debug!(path = %dir.display(), "Directory still has content");
            break;
        }
        for entry in &entries {
            match fs.remove_file(entry).await {
                Ok(()) => tracing::debug!(path = %entry.display(), "Deleted ignored file"),
                Err(e) => tracing::warn!(path = %entry.display(), error = ?e, "Could not delete ignored file"),
            }
        }
        if let Err(e) = fs.remove_dir(&dir).await {
            tracing::warn!(path = %dir.display(), error = ?e, "Could not delete empty directory");
            break;
        }
        tracing::info!(path = %dir.display(), "Deleted empty directory");
        removed += 1;
        current = dir.parent().map(Path::to_path_buf);
    }
    removed
}
