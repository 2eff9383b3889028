//! Records handed to the relocation engine by whoever persists them.
//!
//! Records are plain data. The engine mutates their path fields in place and
//! hands them back; saving them is the caller's job.

use std::path::{Path, PathBuf};
use tome_storage::{normalize, resolve_under};
pub use tome_watch::LibraryId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A library root directory.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Library {
    pub id: LibraryId,
    pub name: String,
    /// Absolute path of the library's root directory.
    pub root: PathBuf,
    /// Overrides the global naming pattern for this library.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub naming_pattern: Option<String>,
}

impl Library {
    pub fn new(id: LibraryId, name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id,
            name: name.into(),
            root: root.into(),
            naming_pattern: None,
        }
    }

    pub fn with_naming_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.naming_pattern = Some(pattern.into());
        self
    }

    /// The root, lexically normalized.
    pub fn normalized_root(&self) -> PathBuf {
        normalize(&self.root)
    }

    /// Splits an absolute path under this library's root into the
    /// `(sub_path, file_name)` pair stored on records. Sub-paths always use
    /// `/` as the separator and are empty for files directly in the root.
    pub fn relativize(&self, path: &Path) -> Option<(String, String)> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let parent = path.parent()?.strip_prefix(self.normalized_root()).ok()?;
        let sub_path = parent
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Some((sub_path, file_name))
    }
}

/// Metadata fields available to naming patterns.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct BookMetadata {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    pub series: Option<String>,
    pub series_index: Option<f64>,
    pub year: Option<i32>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub isbn: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum AdditionalFileKind {
    /// The same book in another format.
    Alternative,
    /// Covers, notes, and other companion assets.
    Supplementary,
}

/// A file belonging to a book besides its primary file. Lives in the same
/// library as the book.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdditionalFile {
    pub id: u64,
    pub sub_path: String,
    pub file_name: String,
    pub kind: AdditionalFileKind,
}

impl AdditionalFile {
    pub fn full_path(&self, library: &Library) -> Option<PathBuf> {
        resolve_under(&library.root, Path::new(&self.sub_path).join(&self.file_name)).ok()
    }
}

/// A book's primary file.
///
/// The path fields are optional because records can exist before their file
/// has been placed anywhere; such records are never moved.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BookFile {
    pub id: u64,
    pub library: Option<Library>,
    /// Directory of the file relative to the library root, `/`-separated.
    pub sub_path: Option<String>,
    pub file_name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub metadata: BookMetadata,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub additional_files: Vec<AdditionalFile>,
}

impl BookFile {
    /// A record with a location but no metadata or additional files.
    pub fn new(id: u64, library: Library, sub_path: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            id,
            library: Some(library),
            sub_path: Some(sub_path.into()),
            file_name: Some(file_name.into()),
            metadata: BookMetadata::default(),
            additional_files: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: BookMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_additional_file(mut self, file: AdditionalFile) -> Self {
        self.additional_files.push(file);
        self
    }

    pub fn has_required_path_components(&self) -> bool {
        self.library.is_some() && self.sub_path.is_some() && self.file_name.is_some()
    }

    /// Absolute location of the file: root, then sub-path, then filename.
    ///
    /// `None` if a path component is missing or the stored location would
    /// escape the library root.
    pub fn full_path(&self) -> Option<PathBuf> {
        let library = self.library.as_ref()?;
        let relative = Path::new(self.sub_path.as_deref()?).join(self.file_name.as_deref()?);
        resolve_under(&library.root, relative).ok()
    }
}

/// A request to bring one record in line with its naming pattern, optionally
/// moving it into a different library.
#[derive(Debug, Clone)]
pub struct MoveRequest {
    pub book: BookFile,
    pub target_library: Option<Library>,
}

impl MoveRequest {
    pub fn to_library(book: BookFile, library: Library) -> Self {
        Self {
            book,
            target_library: Some(library),
        }
    }
}

impl From<BookFile> for MoveRequest {
    fn from(book: BookFile) -> Self {
        Self {
            book,
            target_library: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> Library {
        Library::new(LibraryId(1), "Books", "/books")
    }

    #[test]
    fn test_full_path() {
        let book = BookFile::new(1, library(), "old", "book.pdf");
        assert_eq!(book.full_path().unwrap(), Path::new("/books/old/book.pdf"));
        let root_level = BookFile::new(2, library(), "", "book.pdf");
        assert_eq!(root_level.full_path().unwrap(), Path::new("/books/book.pdf"));
    }

    #[test]
    fn test_full_path_requires_components() {
        let mut book = BookFile::new(1, library(), "old", "book.pdf");
        book.file_name = None;
        assert!(!book.has_required_path_components());
        assert!(book.full_path().is_none());
    }

    #[test]
    fn test_full_path_never_escapes_root() {
        let book = BookFile::new(1, library(), "../elsewhere", "book.pdf");
        assert!(book.full_path().is_none());
    }

    #[test]
    fn test_relativize() {
        let library = Library::new(LibraryId(1), "Books", "/books/");
        assert_eq!(
            library.relativize(Path::new("/books/J. Doe/Series/Title.pdf")),
            Some(("J. Doe/Series".to_string(), "Title.pdf".to_string()))
        );
        assert_eq!(library.relativize(Path::new("/books/Title.pdf")), Some((String::new(), "Title.pdf".to_string())));
        assert_eq!(library.relativize(Path::new("/elsewhere/Title.pdf")), None);
    }
}
