//! [`Monitor`] backed by the platform's native file notification API.

use crate::error::{ErrorKind, Result};
use crate::event::{WatchEvent, WatchEventKind};
use crate::monitor::{LibraryId, Monitor};
use crate::registry::walk_directories;
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use tokio::sync::mpsc;

pub type WatchEventStream = Pin<Box<dyn Stream<Item = WatchEvent> + Send>>;

/// State shared with the notify callback, which runs on the backend's own
/// thread.
struct Shared {
    table: RwLock<HashMap<PathBuf, LibraryId>>,
    paused: AtomicBool,
    sender: mpsc::UnboundedSender<WatchEvent>,
}

impl Shared {
    fn owner_of(&self, path: &Path) -> Option<LibraryId> {
        self.table.read().unwrap_or_else(PoisonError::into_inner).get(path).copied()
    }

    fn dispatch(&self, result: notify::Result<Event>) {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Watch error");
                return;
            },
        };
        if self.paused.load(Ordering::Acquire) {
            tracing::trace!(paths = ?event.paths, "Dropping event while paused");
            return;
        }
        let Some(kind) = WatchEventKind::from_notify(&event.kind) else {
            return;
        };
        for path in event.paths {
            // Attribute the event to the directory it happened in. Removal of
            // a monitored directory itself is reported against its own entry.
            let owner = path
                .parent()
                .and_then(|parent| self.owner_of(parent))
                .or_else(|| self.owner_of(&path));
            let Some(library_id) = owner else {
                tracing::trace!(path = %path.display(), "Dropping event outside monitored directories");
                continue;
            };
            if self.sender.send(WatchEvent::new(library_id, path, kind)).is_err() {
                tracing::debug!("Event receiver dropped");
                return;
            }
        }
    }
}

/// Directory watcher built on [`notify`].
///
/// Each registered directory gets its own non-recursive watch. Events are
/// dropped (not queued) while the monitor is paused, and events from
/// directories without a table entry are ignored, which is how a directory
/// is taken out of observation during a move.
///
/// # Examples
///
/// ```no_run
/// use futures::StreamExt;
/// use std::path::Path;
/// use std::sync::Arc;
/// use tome_watch::{LibraryId, Monitor, NotifyMonitor};
///
/// # async fn example() -> tome_watch::error::Result<()> {
/// let monitor = Arc::new(NotifyMonitor::new()?);
/// monitor.register_path(Path::new("/books"), LibraryId(1))?;
/// let mut events = monitor.events()?;
/// while let Some(event) = events.next().await {
///     println!("{:?} {}", event.kind, event.path.display());
/// }
/// # Ok(())
/// # }
/// ```
pub struct NotifyMonitor {
    shared: Arc<Shared>,
    watcher: Mutex<RecommendedWatcher>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<WatchEvent>>>,
}

impl NotifyMonitor {
    pub fn new() -> Result<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            table: RwLock::new(HashMap::new()),
            paused: AtomicBool::new(false),
            sender,
        });
        let callback_state = Arc::clone(&shared);
        let watcher = notify::recommended_watcher(move |result| callback_state.dispatch(result))
            .or_raise(|| ErrorKind::Watcher)?;
        Ok(Self {
            shared,
            watcher: Mutex::new(watcher),
            receiver: Mutex::new(Some(receiver)),
        })
    }

    /// Take the stream of events. Can only be called once.
    ///
    /// Directories created inside a monitored directory are registered (along
    /// with anything already inside them) before their creation event is
    /// yielded. That happens here rather than in the notify callback because
    /// adding a watch from within the callback can deadlock some backends.
    ///
    /// The stream ends once the monitor is dropped.
    pub fn events(self: &Arc<Self>) -> Result<WatchEventStream> {
        let mut receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| exn::Exn::from(ErrorKind::EventsTaken))?;
        let monitor: Weak<Self> = Arc::downgrade(self);
        Ok(Box::pin(stream! {
            while let Some(event) = receiver.recv().await {
                if event.kind == WatchEventKind::Created {
                    if let Some(monitor) = monitor.upgrade() {
                        let (dir, library_id) = (event.path.clone(), event.library_id);
                        let adopted = tokio::task::spawn_blocking(move || monitor.adopt_directory(&dir, library_id));
                        if let Err(e) = adopted.await {
                            tracing::warn!(error = %e, "Could not adopt new directory");
                        }
                    }
                }
                yield event;
            }
        }))
    }

    /// Registers `dir` and everything below it, if it's a directory. Blocks
    /// on the disk walk.
    fn adopt_directory(&self, dir: &Path, library_id: LibraryId) {
        if !dir.is_dir() {
            return;
        }
        for path in walk_directories(dir, 0) {
            if self.is_monitored(&path) {
                continue;
            }
            match self.register_path(&path, library_id) {
                Ok(()) => tracing::debug!(path = %path.display(), %library_id, "Registered new directory"),
                Err(e) => tracing::warn!(path = %path.display(), error = ?e, "Could not register new directory"),
            }
        }
    }

    fn watcher(&self) -> std::sync::MutexGuard<'_, RecommendedWatcher> {
        self.watcher.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Monitor for NotifyMonitor {
    fn is_monitored(&self, path: &Path) -> bool {
        self.shared.owner_of(path).is_some()
    }

    fn register_path(&self, path: &Path, library_id: LibraryId) -> Result<()> {
        if !path.is_dir() {
            exn::bail!(ErrorKind::NotADirectory(path.to_path_buf()));
        }
        if !self.is_monitored(path) {
            // Never hold the table lock here: the backend may be blocked
            // inside the callback waiting to read it.
            self.watcher()
                .watch(path, RecursiveMode::NonRecursive)
                .or_raise(|| ErrorKind::Watcher)?;
        }
        self.shared
            .table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), library_id);
        Ok(())
    }

    fn unregister_path(&self, path: &Path) -> bool {
        let removed = self
            .shared
            .table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .is_some();
        if removed && let Err(e) = self.watcher().unwatch(path) {
            // Usually because the directory is already gone.
            tracing::debug!(path = %path.display(), error = %e, "Could not unwatch directory");
        }
        removed
    }

    fn unregister_library(&self, library_id: LibraryId) -> usize {
        let mut removed = Vec::new();
        self.shared
            .table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|path, owner| {
                if *owner == library_id {
                    removed.push(path.clone());
                    false
                } else {
                    true
                }
            });
        let mut watcher = self.watcher();
        for path in &removed {
            if let Err(e) = watcher.unwatch(path) {
                tracing::debug!(path = %path.display(), error = %e, "Could not unwatch directory");
            }
        }
        removed.len()
    }

    fn monitored_paths(&self) -> Vec<(PathBuf, LibraryId)> {
        let table = self.shared.table.read().unwrap_or_else(PoisonError::into_inner);
        table.iter().map(|(path, id)| (path.clone(), *id)).collect()
    }

    fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
        tracing::info!("Directory monitoring paused");
    }

    fn resume(&self) {
        self.shared.paused.store(false, Ordering::Release);
        tracing::info!("Directory monitoring resumed");
    }

    fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    async fn next_matching(
        events: &mut WatchEventStream,
        predicate: impl Fn(&WatchEvent) -> bool,
    ) -> Option<WatchEvent> {
        tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(event) = events.next().await {
                if predicate(&event) {
                    return Some(event);
                }
            }
            None
        })
        .await
        .ok()
        .flatten()
    }

    #[test]
    fn test_table_operations() {
        let temp_dir = tempfile::tempdir().unwrap();
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();

        let monitor = NotifyMonitor::new().unwrap();
        monitor.register_path(temp_dir.path(), LibraryId(1)).unwrap();
        monitor.register_path(&a, LibraryId(1)).unwrap();
        monitor.register_path(&b, LibraryId(2)).unwrap();
        assert!(monitor.is_monitored(&a));
        assert_eq!(monitor.monitored_paths().len(), 3);

        assert!(monitor.unregister_path(&a));
        assert!(!monitor.unregister_path(&a));
        assert_eq!(monitor.unregister_library(LibraryId(1)), 1);
        assert_eq!(monitor.monitored_paths(), vec![(b, LibraryId(2))]);
    }

    #[test]
    fn test_register_rejects_files_and_missing_paths() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("book.pdf");
        std::fs::write(&file, b"data").unwrap();
        let monitor = NotifyMonitor::new().unwrap();
        let err = monitor.register_path(&file, LibraryId(1)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotADirectory(_)));
        assert!(monitor.register_path(&temp_dir.path().join("missing"), LibraryId(1)).is_err());
    }

    #[test]
    fn test_events_can_only_be_taken_once() {
        let monitor = Arc::new(NotifyMonitor::new().unwrap());
        assert!(monitor.events().is_ok());
        let err = monitor.events().err().unwrap();
        assert!(matches!(&*err, ErrorKind::EventsTaken));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_created_file_is_reported_with_library() {
        let temp_dir = tempfile::tempdir().unwrap();
        let monitor = Arc::new(NotifyMonitor::new().unwrap());
        monitor.register_path(temp_dir.path(), LibraryId(7)).unwrap();
        let mut events = monitor.events().unwrap();

        let file = temp_dir.path().join("book.pdf");
        std::fs::write(&file, b"data").unwrap();
        let event = next_matching(&mut events, |e| e.path == file).await.unwrap();
        assert_eq!(event.library_id, LibraryId(7));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_new_directories_are_registered() {
        let temp_dir = tempfile::tempdir().unwrap();
        let monitor = Arc::new(NotifyMonitor::new().unwrap());
        monitor.register_path(temp_dir.path(), LibraryId(3)).unwrap();
        let mut events = monitor.events().unwrap();

        let dir = temp_dir.path().join("J. Doe");
        std::fs::create_dir(&dir).unwrap();
        next_matching(&mut events, |e| e.path == dir && e.kind == WatchEventKind::Created)
            .await
            .unwrap();
        assert!(monitor.is_monitored(&dir));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_paused_monitor_drops_events() {
        let temp_dir = tempfile::tempdir().unwrap();
        let monitor = Arc::new(NotifyMonitor::new().unwrap());
        monitor.register_path(temp_dir.path(), LibraryId(1)).unwrap();
        let mut events = monitor.events().unwrap();

        monitor.pause();
        assert!(monitor.is_paused());
        let quiet = temp_dir.path().join("quiet.pdf");
        std::fs::write(&quiet, b"data").unwrap();
        // Give the backend time to deliver (and drop) the event.
        tokio::time::sleep(Duration::from_millis(500)).await;
        monitor.resume();

        let loud = temp_dir.path().join("loud.pdf");
        std::fs::write(&loud, b"data").unwrap();
        let first = next_matching(&mut events, |e| e.path == quiet || e.path == loud).await.unwrap();
        assert_eq!(first.path, loud);
    }
}
