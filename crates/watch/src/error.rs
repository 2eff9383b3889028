//! Watch Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A watch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for watch operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The platform watcher could not be created or refused a path
    #[display("directory watcher failure")]
    Watcher,
    /// Only directories can be registered
    #[display("not a directory: {}", _0.display())]
    NotADirectory(#[error(not(source))] PathBuf),
    /// The event stream was already handed out
    #[display("event stream already taken")]
    EventsTaken,
    /// Fault injected by a test double
    #[display("injected fault: {}", _0.display())]
    Injected(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // inotify watch limits and the like can clear up.
        matches!(self, Self::Watcher)
    }
}
