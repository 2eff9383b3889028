//! Path validation and normalization utilities.
//!
//! Library records store a root directory plus a relative sub-path. Anything
//! produced from user-controlled naming patterns goes through [`validate`]
//! before being joined onto a root, so it can never leave that root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a relative path for security and correctness.
/// Ensures that paths don't escape the root they will be joined onto (no `..`
/// traversal past the start). Leading separators are ignored, so `/a/b` is
/// treated the same as `a/b`.
///
/// > **Note:** This does **not** normalize backslashes, non-UTF8 bytes, or
/// >           platform-specific weirdness. Null bytes are explicitly rejected.
///
/// # Returns
/// Returns the normalized path if valid, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if invalid.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use tome_storage::validate_path;
/// // Valid paths
/// assert!(validate_path("Author/book.epub").is_ok());
/// assert!(validate_path("/Author/book.epub").is_ok()); // (leading separator stripped)
/// assert!(validate_path("a/../book.epub").is_ok()); // (never leaves library root)
/// // Invalid paths
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a/../../b").is_err()); // (leaves library root)
/// assert!(validate_path("a\0b").is_err());
/// // Paths get resolved
/// assert_eq!(
///     validate_path("wrong/../still-wrong/.././correct//./book.pdf/").unwrap(),
///     Path::new("correct/book.pdf")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    // Use Rust's built-in path component parser for robust handling. Means we
    // don't have to deal with non-UTF8, or the maniacs on Unix that use
    // backslashes in their filenames.
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls, so reject them.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Joins a relative path onto an absolute root, guaranteeing the result stays
/// inside that root.
///
/// ```
/// use std::path::Path;
/// use tome_storage::resolve_under;
/// let root = Path::new("/books");
/// assert_eq!(resolve_under(root, "/Doe/./Title.pdf").unwrap(), Path::new("/books/Doe/Title.pdf"));
/// assert!(resolve_under(root, "../elsewhere.pdf").is_err());
/// assert!(resolve_under("relative/root", "Title.pdf").is_err());
/// ```
pub fn resolve_under(root: impl AsRef<Path>, relative: impl AsRef<Path>) -> Result<PathBuf> {
    let root = root.as_ref();
    if !root.is_absolute() {
        exn::bail!(ErrorKind::InvalidPath(root.to_path_buf()));
    }
    Ok(normalize(root).join(validate(relative)?))
}

/// Lexically normalizes a path: drops `.` components and resolves `..`
/// against the preceding component. Never touches the filesystem, so
/// symlinks are not resolved.
///
/// `..` at the start of a relative path (or directly after the root) is kept
/// or dropped respectively, mirroring what the OS would do.
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                },
                Some(Component::RootDir | Component::Prefix(_)) => {},
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
