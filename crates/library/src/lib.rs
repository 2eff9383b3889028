//! Where book files belong, and getting them there.
//!
//! - [`PathGenerator`] renders naming patterns into relative paths.
//! - [`Relocator`] moves files to those paths, keeping the directory watcher
//!   (see [`tome_watch`]) from reporting its own moves as external changes.
//! - [`cleanup_empty_ancestors`] removes directories a move left empty.

pub mod cleanup;
pub mod error;
pub mod models;
pub mod relocate;
mod template;
pub mod unique;

pub use crate::cleanup::cleanup_empty_ancestors;
pub use crate::relocate::{Outcome, Relocation, Relocator, Settings, SkipReason};
pub use crate::template::{FALLBACK_PATTERN, PathGenerator, effective_pattern};
pub use crate::unique::CollisionCounter;
