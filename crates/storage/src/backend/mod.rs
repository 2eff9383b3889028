//! Filesystem trait and implementations.
//!
//! This module defines the [`Filesystem`] trait, the narrow set of
//! operations the relocation engine needs from the disk it is reorganising.
//! Unlike library records, every path handed to a [`Filesystem`] is
//! **absolute**: a single relocation may touch two different library roots.
//!

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod ro;

pub use self::local::LocalFilesystem;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockFilesystem;
pub use self::ro::ReadOnlyFilesystem;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Unified interface for filesystem operations.
///
/// All operations are asynchronous so that slow (network) mounts don't stall
/// the runtime. It's a glorified `std::fs`, but swappable, which is what lets
/// tests inject failures half way through a batch.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use tome_storage::{backend::Filesystem, error::Result};
///
/// async fn move_if_present(fs: &dyn Filesystem, from: &Path, to: &Path) -> Result<bool> {
///     if fs.exists(from).await? {
///         fs.rename(from, to).await?;
///         Ok(true)
///     } else {
///         Ok(false)
///     }
/// }
/// ```
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Name of the implementation, used for logging only.
    fn name(&self) -> &str;

    /// Check if a file or directory exists.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use tome_storage::{backend::Filesystem, error::Result};
    /// # async fn example(fs: &dyn Filesystem) -> Result<()> {
    /// if fs.exists(Path::new("/books/Doe/Title.pdf")).await? {
    ///     println!("File exists!");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Check if a path exists and is a directory.
    async fn is_dir(&self, path: &Path) -> Result<bool>;

    /// List the immediate entries (files and directories) of a directory.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the
    /// directory does not exist. Order is unspecified.
    async fn list(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Rename/move a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the source
    /// file does not exist.
    ///
    /// # Notes
    /// - Implementations should create parent directories as needed
    /// - If the destination already exists, it will be overwritten
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use tome_storage::{backend::Filesystem, error::Result};
    /// # async fn example(fs: &dyn Filesystem) -> Result<()> {
    /// fs.rename(
    ///     Path::new("/books/old/book.pdf"),
    ///     Path::new("/books/J. Doe/Title.pdf"),
    /// ).await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn remove_file(&self, path: &Path) -> Result<()>;

    /// Delete an **empty** directory.
    ///
    /// Returns [`NotEmpty`](crate::error::ErrorKind::NotEmpty) if it still has
    /// entries.
    async fn remove_dir(&self, path: &Path) -> Result<()>;
}
