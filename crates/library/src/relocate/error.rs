//! Error types for the [`relocate`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A relocation error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for relocation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a relocation failure.
///
/// A file that simply isn't there is not an error; it is reported as
/// [`SkipReason::SourceMissing`](super::SkipReason::SourceMissing).
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The naming pattern could not be compiled or rendered.
    #[display("could not compute target path")]
    Template,
    /// A filesystem operation (existence check, rename) failed.
    #[display("filesystem operation failed")]
    Storage,
    /// The target path can't be stored on the record.
    #[display("target path not representable in library: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage)
    }
}
