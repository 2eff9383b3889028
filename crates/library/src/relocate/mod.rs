//! Moving book files to where their naming pattern says they belong, without
//! the directory watcher mistaking the moves for external changes.
//!
//! Two strategies are used:
//!
//! - [`Relocator::move_single`] suspends only the source and target
//!   directories of the one file being moved (see
//!   [`ScopedExecutor`](tome_watch::ScopedExecutor)).
//! - [`Relocator::move_batch`] unregisters every affected library up front,
//!   moves everything, then re-registers each library's whole directory tree.
//!
//! [`Relocator::reorganize`] additionally pauses the watcher for the duration
//! of a batch, for whole-library reorganisations.

mod batch;
pub mod error;
mod single;
#[cfg(test)]
mod testing;

use self::error::{ErrorKind, Result};
use crate::cleanup::{cleanup_empty_ancestors, default_ignored_files};
use crate::models::{BookFile, BookMetadata, Library};
use crate::template::{PathGenerator, effective_pattern};
use exn::{OptionExt, ResultExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tome_storage::{FilesystemHandle, resolve_under};
use tome_watch::guard::DEFAULT_RESUME_DELAY;
use tome_watch::scoped::DEFAULT_SETTLE_DELAY;
use tome_watch::{MonitorHandle, MonitoringGuard, PathRegistry, ScopedExecutor};

pub use self::single::Outcome;

/// Tunables for a [`Relocator`].
#[derive(Debug, Clone)]
pub struct Settings {
    /// Pattern used by libraries without their own.
    pub default_pattern: Option<String>,
    /// Wait after unregistering libraries, before the first move of a batch.
    pub pre_move_delay: Duration,
    /// Wait after the last move of a batch, before re-registering libraries.
    pub batch_settle_delay: Duration,
    /// Wait after a single move, before re-registering its directories.
    pub scoped_settle_delay: Duration,
    /// How long the watcher stays paused after a protected operation.
    pub resume_delay: Duration,
    /// Files that don't stop a directory from counting as empty.
    pub ignored_files: HashSet<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_pattern: None,
            pre_move_delay: Duration::from_millis(500),
            batch_settle_delay: Duration::from_secs(1),
            scoped_settle_delay: DEFAULT_SETTLE_DELAY,
            resume_delay: DEFAULT_RESUME_DELAY,
            ignored_files: default_ignored_files(),
        }
    }
}

/// Why a record was left where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum SkipReason {
    #[display("record has no library")]
    NoLibrary,
    #[display("record has no sub-path or filename")]
    MissingPathComponents,
    #[display("stored location is outside the library root")]
    InvalidLocation,
    #[display("file not found on disk")]
    SourceMissing,
    #[display("file is already in place")]
    AlreadyInPlace,
}

/// Per-record result of a batch move. Every variant hands the record back,
/// with its path fields reflecting where the files are now.
#[derive(Debug)]
pub enum Relocation {
    Moved(BookFile),
    Skipped(BookFile, SkipReason),
    /// The primary file or one of the additional files could not be moved.
    /// Files moved before the failure stay moved, and the record says so.
    Failed(BookFile, error::Error),
}

impl Relocation {
    pub fn book(&self) -> &BookFile {
        match self {
            Self::Moved(book) | Self::Skipped(book, _) | Self::Failed(book, _) => book,
        }
    }

    pub fn into_book(self) -> BookFile {
        match self {
            Self::Moved(book) | Self::Skipped(book, _) | Self::Failed(book, _) => book,
        }
    }

    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(..))
    }
}

/// The relocation engine.
pub struct Relocator {
    fs: FilesystemHandle,
    registry: PathRegistry,
    scoped: ScopedExecutor,
    guard: MonitoringGuard,
    settings: Settings,
}

impl Relocator {
    pub fn new(fs: FilesystemHandle, monitor: MonitorHandle, settings: Settings) -> Self {
        let registry = PathRegistry::new(monitor.clone());
        Self {
            fs,
            scoped: ScopedExecutor::new(registry.clone(), settings.scoped_settle_delay),
            guard: MonitoringGuard::new(monitor, settings.resume_delay),
            registry,
            settings,
        }
    }

    /// Share a guard with other parts of the application, so that their
    /// protected operations and ours pause the watcher only once.
    pub fn with_guard(mut self, guard: MonitoringGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn registry(&self) -> &PathRegistry {
        &self.registry
    }

    pub fn guard(&self) -> &MonitoringGuard {
        &self.guard
    }

    /// Where `book`'s primary file would be moved to within `library`.
    pub fn target_path(&self, book: &BookFile, library: &Library) -> Result<PathBuf> {
        let file_name = book.file_name.as_deref().ok_or_raise(|| ErrorKind::Template)?;
        self.resolve(&book.metadata, file_name, library)
    }

    /// Computes where `book` would be moved to without touching the disk.
    /// `None` if the record lacks a library or path fields.
    pub fn preview(&self, book: &BookFile) -> Result<Option<PathBuf>> {
        match &book.library {
            Some(library) if book.has_required_path_components() => self.target_path(book, library).map(Some),
            _ => Ok(None),
        }
    }

    fn resolve(&self, metadata: &BookMetadata, file_name: &str, library: &Library) -> Result<PathBuf> {
        let pattern = effective_pattern(library, self.settings.default_pattern.as_deref());
        let generator = pattern.parse::<PathGenerator>().or_raise(|| ErrorKind::Template)?;
        let relative = generator.generate(metadata, file_name).or_raise(|| ErrorKind::Template)?;
        resolve_under(&library.root, &relative).or_raise(|| ErrorKind::InvalidPath(PathBuf::from(&relative)))
    }

    /// Moves a file and tidies up the directory it left behind.
    async fn rename_and_cleanup(&self, source: &Path, target: &Path, roots: &[PathBuf]) -> Result<()> {
        self.fs.rename(source, target).await.or_raise(|| ErrorKind::Storage)?;
        tracing::info!(backend = self.fs.name(), from = %source.display(), to = %target.display(), "Moved file");
        if let Some(dir) = source.parent() {
            cleanup_empty_ancestors(self.fs.as_ref(), dir, roots, &self.settings.ignored_files).await;
        }
        Ok(())
    }
}

/// Splits `target` into the record's `(sub_path, file_name)` pair.
fn placement(library: &Library, target: &Path) -> Result<(String, String)> {
    library
        .relativize(target)
        .ok_or_raise(|| ErrorKind::InvalidPath(target.to_path_buf()))
}
