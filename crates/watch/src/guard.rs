//! Whole-watcher pause/resume coordination.
//!
//! Coarse operations (reorganising an entire library, bulk imports) touch too
//! many directories to suspend them one by one. Instead the guard pauses the
//! monitor for as long as at least one protected operation is running, and
//! resumes it a little while after the last one has finished so that the
//! backend's trailing events for those operations are dropped too.

use crate::MonitorHandle;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_RESUME_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct State {
    /// Protected operations currently running.
    active: usize,
    /// Whether the current pause was put in place by the guard. A pause
    /// requested by someone else is never lifted here.
    owns_pause: bool,
}

struct Inner {
    monitor: MonitorHandle,
    resume_delay: Duration,
    state: Mutex<State>,
}

/// Process-wide pause coordinator.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct MonitoringGuard {
    inner: Arc<Inner>,
}

/// Held for the duration of one protected operation. Dropping it (normally,
/// on panic, or when the operation's future is cancelled) ends the operation.
struct Protection {
    guard: MonitoringGuard,
}

impl Drop for Protection {
    fn drop(&mut self) {
        self.guard.leave();
    }
}

impl MonitoringGuard {
    pub fn new(monitor: MonitorHandle, resume_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                monitor,
                resume_delay,
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.inner.monitor.is_paused()
    }

    /// Run `operation` with the monitor paused.
    ///
    /// The output of `operation` is returned untouched, errors included. The
    /// resume is scheduled however the operation ends.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use std::time::Duration;
    /// # use tome_watch::{MonitoringGuard, NotifyMonitor};
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> tome_watch::error::Result<()> {
    /// let guard = MonitoringGuard::new(Arc::new(NotifyMonitor::new()?), Duration::from_millis(10));
    /// let answer = guard.execute_protected("answer", async { 42 }).await;
    /// assert_eq!(answer, 42);
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all, fields(operation = name))]
    pub async fn execute_protected<F: Future>(&self, name: &str, operation: F) -> F::Output {
        let _protection = self.enter();
        tracing::debug!("Running protected operation");
        operation.await
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self) -> Protection {
        let mut state = self.state();
        state.active += 1;
        if !self.inner.monitor.is_paused() {
            self.inner.monitor.pause();
            state.owns_pause = true;
        }
        Protection { guard: self.clone() }
    }

    fn leave(&self) {
        let mut state = self.state();
        state.active = state.active.saturating_sub(1);
        if state.active == 0 && state.owns_pause {
            drop(state);
            self.schedule_resume();
        }
    }

    fn schedule_resume(&self) {
        let guard = self.clone();
        let delay = self.inner.resume_delay;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    guard.resume_if_idle();
                });
            },
            Err(_) => {
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    guard.resume_if_idle();
                });
            },
        }
    }

    /// The deferred half of [`leave`](Self::leave). Another protected
    /// operation may have started in the meantime, in which case its own
    /// completion will schedule the resume.
    fn resume_if_idle(&self) {
        let mut state = self.state();
        if state.active > 0 || !state.owns_pause {
            return;
        }
        state.owns_pause = false;
        if self.inner.monitor.is_paused() {
            self.inner.monitor.resume();
        } else {
            tracing::warn!("Monitor was resumed by someone else while protected");
        }
    }
}
