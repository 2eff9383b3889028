//! In-memory monitor for testing.

use crate::error::{ErrorKind, Result};
use crate::monitor::{LibraryId, Monitor};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// A call made against a [`MockMonitor`], recorded in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorCall {
    Register(PathBuf, LibraryId),
    Unregister(PathBuf),
    UnregisterLibrary(LibraryId),
    Pause,
    Resume,
}

#[derive(Default)]
struct State {
    table: HashMap<PathBuf, LibraryId>,
    paused: bool,
    calls: Vec<MonitorCall>,
    failing: HashSet<PathBuf>,
}

/// Monitor that keeps its table in memory and records every call.
///
/// Nothing is watched. Paths do not need to exist, so tests can register
/// whatever layout they like and then assert on the call log.
#[derive(Default)]
pub struct MockMonitor {
    state: Mutex<State>,
}

impl MockMonitor {
    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every future registration of `path` fail.
    pub fn fail_register(&self, path: impl Into<PathBuf>) {
        self.state().failing.insert(path.into());
    }

    pub fn calls(&self) -> Vec<MonitorCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn pause_count(&self) -> usize {
        self.count(|call| matches!(call, MonitorCall::Pause))
    }

    pub fn resume_count(&self) -> usize {
        self.count(|call| matches!(call, MonitorCall::Resume))
    }

    pub fn count(&self, predicate: impl Fn(&MonitorCall) -> bool) -> usize {
        self.state().calls.iter().filter(|call| predicate(call)).count()
    }

    /// Directories owned by a library, sorted.
    pub fn library_paths(&self, library_id: LibraryId) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self
            .state()
            .table
            .iter()
            .filter(|(_, owner)| **owner == library_id)
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }
}

impl Monitor for MockMonitor {
    fn is_monitored(&self, path: &Path) -> bool {
        self.state().table.contains_key(path)
    }

    fn register_path(&self, path: &Path, library_id: LibraryId) -> Result<()> {
        let mut state = self.state();
        state.calls.push(MonitorCall::Register(path.to_path_buf(), library_id));
        if state.failing.contains(path) {
            exn::bail!(ErrorKind::Injected(path.to_path_buf()));
        }
        state.table.insert(path.to_path_buf(), library_id);
        Ok(())
    }

    fn unregister_path(&self, path: &Path) -> bool {
        let mut state = self.state();
        state.calls.push(MonitorCall::Unregister(path.to_path_buf()));
        state.table.remove(path).is_some()
    }

    fn unregister_library(&self, library_id: LibraryId) -> usize {
        let mut state = self.state();
        state.calls.push(MonitorCall::UnregisterLibrary(library_id));
        let before = state.table.len();
        state.table.retain(|_, owner| *owner != library_id);
        before - state.table.len()
    }

    fn monitored_paths(&self) -> Vec<(PathBuf, LibraryId)> {
        self.state().table.iter().map(|(path, id)| (path.clone(), *id)).collect()
    }

    fn pause(&self) {
        let mut state = self.state();
        state.calls.push(MonitorCall::Pause);
        state.paused = true;
    }

    fn resume(&self) {
        let mut state = self.state();
        state.calls.push(MonitorCall::Resume);
        state.paused = false;
    }

    fn is_paused(&self) -> bool {
        self.state().paused
    }
}
