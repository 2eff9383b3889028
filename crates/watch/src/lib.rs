//! Watching library directories, and keeping the watcher out of the way of
//! our own file moves.
//!
//! - [`Monitor`]: the watcher contract, a table of directories and a pause
//!   switch. [`NotifyMonitor`] is the real thing.
//! - [`PathRegistry`]: registering and unregistering directories and whole
//!   library subtrees.
//! - [`MonitoringGuard`]: pauses the whole watcher around coarse operations.
//! - [`ScopedExecutor`]: suspends only the two directories a single move
//!   touches.

pub mod error;
mod event;
pub mod guard;
pub mod monitor;
pub mod registry;
pub mod scoped;

pub use crate::event::{WatchEvent, WatchEventKind};
pub use crate::guard::MonitoringGuard;
pub use crate::monitor::{LibraryId, Monitor, NotifyMonitor};
pub use crate::registry::PathRegistry;
pub use crate::scoped::ScopedExecutor;
use std::sync::Arc;

pub type MonitorHandle = Arc<dyn Monitor + Send + Sync>;
