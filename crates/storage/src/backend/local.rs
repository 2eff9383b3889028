//! Local filesystem implementation.
//!
//! Thin wrapper over `tokio::fs` that maps I/O errors onto [`ErrorKind`] and
//! gives `rename` the "create parents, overwrite, survive device boundaries"
//! semantics the relocation engine relies on.

use crate::backend::Filesystem;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tome_storage::FilesystemHandle;
/// use tome_storage::backend::LocalFilesystem;
///
/// let fs: FilesystemHandle = Arc::new(LocalFilesystem::default());
/// ```
#[derive(Clone, Debug)]
pub struct LocalFilesystem {
    name: String,
}
impl LocalFilesystem {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn require_absolute(path: &Path) -> Result<()> {
        if !path.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
        }
        Ok(())
    }

    /// Copy-then-delete fallback for renames that cross a mount point.
    async fn copy_and_delete(from: &Path, to: &Path) -> Result<()> {
        tracing::debug!(from = %from.display(), to = %to.display(), "Rename crosses devices; copying instead");
        fs::copy(from, to).await.map_err(|e| ErrorKind::from_io(e, from))?;
        if let Err(e) = fs::remove_file(from).await {
            // The copy already landed, so report success with a stray original.
            tracing::warn!(path = %from.display(), error = %e, "Copied file but could not remove the original");
        }
        Ok(())
    }
}
impl Default for LocalFilesystem {
    fn default() -> Self {
        Self::new("local")
    }
}

#[async_trait]
impl Filesystem for LocalFilesystem {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        Self::require_absolute(path)?;
        Ok(fs::try_exists(path).await.map_err(ErrorKind::Io)?)
    }

    async fn is_dir(&self, path: &Path) -> Result<bool> {
        Self::require_absolute(path)?;
        match fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(exn::Exn::from(ErrorKind::from_io(e, path))),
        }
    }

    async fn list(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        Self::require_absolute(dir)?;
        let mut entries = fs::read_dir(dir).await.map_err(|e| ErrorKind::from_io(e, dir))?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| ErrorKind::from_io(e, dir))? {
            paths.push(entry.path());
        }
        Ok(paths)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        Self::require_absolute(from)?;
        Self::require_absolute(to)?;
        // Create parent directories for destination if needed
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await.map_err(|e| ErrorKind::from_io(e, parent))?;
        }
        match fs::rename(from, to).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => Self::copy_and_delete(from, to).await,
            Err(e) => Err(exn::Exn::from(ErrorKind::from_io(e, from))),
        }
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        Self::require_absolute(path)?;
        Ok(fs::remove_file(path).await.map_err(|e| ErrorKind::from_io(e, path))?)
    }

    async fn remove_dir(&self, path: &Path) -> Result<()> {
        Self::require_absolute(path)?;
        Ok(fs::remove_dir(path).await.map_err(|e| ErrorKind::from_io(e, path))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, data: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    #[tokio::test]
    async fn test_requires_absolute_paths() {
        let fs = LocalFilesystem::default();
        assert!(fs.exists(Path::new("relative/path")).await.is_err());
        assert!(fs.rename(Path::new("a.pdf"), Path::new("b.pdf")).await.is_err());
    }

    #[tokio::test]
    async fn test_exists_and_is_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystem::default();
        let file = temp_dir.path().join("book.pdf");
        assert!(!fs.exists(&file).await.unwrap());
        write(&file, b"data");
        assert!(fs.exists(&file).await.unwrap());
        assert!(!fs.is_dir(&file).await.unwrap());
        assert!(fs.is_dir(temp_dir.path()).await.unwrap());
        assert!(!fs.is_dir(&temp_dir.path().join("missing")).await.unwrap());
    }

    #[tokio::test]
    async fn test_rename_creates_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystem::default();
        let from = temp_dir.path().join("old/book.pdf");
        let to = temp_dir.path().join("a/b/c/book.pdf");
        write(&from, b"data");
        fs.rename(&from, &to).await.unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_rename_overwrites_existing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystem::default();
        let from = temp_dir.path().join("new.pdf");
        let to = temp_dir.path().join("old.pdf");
        write(&from, b"new");
        write(&to, b"old");
        fs.rename(&from, &to).await.unwrap();
        assert_eq!(std::fs::read(&to).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_rename_missing_source() {
        let temp_dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystem::default();
        let err = fs
            .rename(&temp_dir.path().join("missing.pdf"), &temp_dir.path().join("x.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list() {
        let temp_dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystem::default();
        write(&temp_dir.path().join("a.pdf"), b"data");
        write(&temp_dir.path().join("sub/b.pdf"), b"data");
        let mut entries = fs.list(temp_dir.path()).await.unwrap();
        entries.sort();
        assert_eq!(entries, vec![temp_dir.path().join("a.pdf"), temp_dir.path().join("sub")]);
        let err = fs.list(&temp_dir.path().join("missing")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove() {
        let temp_dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystem::default();
        let dir = temp_dir.path().join("dir");
        let file = dir.join(".DS_Store");
        write(&file, b"junk");
        let err = fs.remove_dir(&dir).await.unwrap_err();
        assert!(!matches!(&*err, ErrorKind::NotFound(_)));
        fs.remove_file(&file).await.unwrap();
        fs.remove_dir(&dir).await.unwrap();
        assert!(!dir.exists());
    }
}
