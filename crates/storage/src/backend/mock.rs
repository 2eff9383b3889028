//! Fault-injecting filesystem for testing.

use crate::backend::{Filesystem, LocalFilesystem};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Filesystem that delegates to [`LocalFilesystem`] but refuses to rename
/// selected paths.
///
/// Relocation logic is mostly interesting when something goes wrong half way
/// through a batch, and provoking a real `EACCES` in a test container (that
/// usually runs as root) is unreliable. Instead, mark a path as poisoned and
/// any rename whose source *or* destination matches fails with
/// [`Injected`](ErrorKind::Injected). Successful renames are recorded.
#[derive(Default)]
pub struct MockFilesystem {
    inner: LocalFilesystem,
    failing: Mutex<HashSet<PathBuf>>,
    renamed: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl MockFilesystem {
    /// Poison a path at construction time.
    pub fn with_failing_rename(self, path: impl Into<PathBuf>) -> Self {
        self.fail_rename(path);
        self
    }

    /// Poison a path: renames from or to it will fail.
    pub fn fail_rename(&self, path: impl Into<PathBuf>) {
        self.failing.lock().unwrap_or_else(PoisonError::into_inner).insert(path.into());
    }

    /// Renames that went through, in call order.
    pub fn renamed(&self) -> Vec<(PathBuf, PathBuf)> {
        self.renamed.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn is_poisoned(&self, from: &Path, to: &Path) -> Option<PathBuf> {
        let failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        [from, to].into_iter().find(|p| failing.contains(*p)).map(Path::to_path_buf)
    }
}

#[async_trait]
impl Filesystem for MockFilesystem {
    fn name(&self) -> &str {
        "mock"
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
        if let Some(poisoned) = self.is_poisoned(from, to) {
            exn::bail!(ErrorKind::Injected(poisoned));
        }
        self.inner.rename(from, to).await?;
        self.renamed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((from.to_path_buf(), to.to_path_buf()));
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        self.inner.remove_file(path).await
    }

    async fn remove_dir(&self, path: &Path) -> Result<()> {
        self.inner.remove_dir(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_poisoned_rename_leaves_file_in_place() {
        let temp_dir = tempfile::tempdir().unwrap();
        let good = temp_dir.path().join("good.pdf");
        let bad = temp_dir.path().join("bad.pdf");
        std::fs::write(&good, b"good").unwrap();
        std::fs::write(&bad, b"bad").unwrap();

        let fs = MockFilesystem::default().with_failing_rename(&bad);
        let err = fs.rename(&bad, &temp_dir.path().join("out/bad.pdf")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Injected(p) if p == &bad));
        assert!(bad.exists());

        let target = temp_dir.path().join("out/good.pdf");
        fs.rename(&good, &target).await.unwrap();
        assert!(target.exists());
        assert_eq!(fs.renamed(), vec![(good, target)]);
    }
}
