use super::{Relocator, Settings};
use crate::models::{BookMetadata, Library, LibraryId};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tome_storage::backend::MockFilesystem;
use tome_watch::monitor::MockMonitor;

pub(super) const PATTERN: &str = "{author}/{title}";

pub(super) struct Fixture {
    temp_dir: tempfile::TempDir,
    pub library: Library,
    pub monitor: Arc<MockMonitor>,
    pub fs: Arc<MockFilesystem>,
    pub relocator: Relocator,
}

impl Fixture {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("books");
        std::fs::create_dir_all(&root).unwrap();
        let monitor = Arc::new(MockMonitor::default());
        let fs = Arc::new(MockFilesystem::default());
        let relocator = Relocator::new(fs.clone(), monitor.clone(), settings(Duration::ZERO, Duration::ZERO));
        Self {
            library: Library::new(LibraryId(1), "Books", root),
            temp_dir,
            monitor,
            fs,
            relocator,
        }
    }

    /// Another engine over the same monitor and filesystem, with its own
    /// batch delays.
    pub fn relocator_with_delays(&self, pre_move_delay: Duration, batch_settle_delay: Duration) -> Relocator {
        Relocator::new(
            self.fs.clone(),
            self.monitor.clone(),
            settings(pre_move_delay, batch_settle_delay),
        )
    }

    pub fn root(&self) -> &Path {
        &self.library.root
    }

    /// A second, empty library next to the first.
    pub fn other_library(&self) -> Library {
        let root = self.temp_dir.path().join("other");
        std::fs::create_dir_all(&root).unwrap();
        Library::new(LibraryId(2), "Other", root)
    }

    pub fn register_library(&self) {
        self.register(&self.library);
    }

    pub fn register(&self, library: &Library) {
        self.relocator
            .registry()
            .register_library_subtree_blocking(library.id, &library.root)
            .unwrap();
    }
}

fn settings(pre_move_delay: Duration, batch_settle_delay: Duration) -> Settings {
    Settings {
        default_pattern: Some(PATTERN.to_string()),
        pre_move_delay,
        batch_settle_delay,
        scoped_settle_delay: Duration::ZERO,
        resume_delay: Duration::ZERO,
        ..Settings::default()
    }
}

pub(super) fn metadata(title: &str, author: &str) -> BookMetadata {
    BookMetadata {
        title: Some(title.to_string()),
        authors: vec![author.to_string()],
        ..BookMetadata::default()
    }
}

pub(super) fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"").unwrap();
}
