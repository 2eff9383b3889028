//! Read-only filesystem decorator.
//!
//! Wraps another implementation and prevents mutating operations from
//! executing, while still indicating success on return. Used for dry runs:
//! the relocation engine goes through all of its motions and reports what it
//! *would* have moved.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::{FilesystemHandle, backend::Filesystem, error::Result};

/// Read-only filesystem.
///
/// Wraps another filesystem and silently drops all write operations, logging
/// an [`info event`](tracing::Event).
#[derive(Clone)]
pub struct ReadOnlyFilesystem {
    inner: FilesystemHandle,
}
impl ReadOnlyFilesystem {
    pub fn new(inner: FilesystemHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Filesystem for ReadOnlyFilesystem {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn is_dir(&self, path: &Path) -> Result<bool> {
        self.inner.is_dir(path).await
    }

    async fn list(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.inner.list(dir).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        tracing::info!(from = %from.display(), to = %to.display(), "Skipping rename/move during read-only mode");
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        tracing::info!(path = %path.display(), "Skipping delete during read-only mode");
        Ok(())
    }

    async fn remove_dir(&self, path: &Path) -> Result<()> {
        tracing::info!(path = %path.display(), "Skipping directory removal during read-only mode");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalFilesystem;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_writes_are_dropped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let from = temp_dir.path().join("book.pdf");
        let to = temp_dir.path().join("moved/book.pdf");
        std::fs::write(&from, b"data").unwrap();

        let fs = ReadOnlyFilesystem::new(Arc::new(LocalFilesystem::default()));
        fs.rename(&from, &to).await.unwrap();
        fs.remove_file(&from).await.unwrap();
        assert!(fs.exists(&from).await.unwrap());
        assert!(!fs.exists(&to).await.unwrap());
        assert_eq!(fs.list(temp_dir.path()).await.unwrap(), vec![from]);
    }
}
