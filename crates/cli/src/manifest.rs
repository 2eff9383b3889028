//! JSON file standing in for the database that would normally own book
//! records.
//!
//! ```json
//! {
//!   "books": [
//!     {
//!       "id": 1,
//!       "library": { "id": 1, "name": "Books", "root": "/srv/books" },
//!       "sub_path": "incoming",
//!       "file_name": "dune.epub",
//!       "metadata": { "title": "Dune", "authors": ["Frank Herbert"] },
//!       "target_library": { "id": 2, "name": "Archive", "root": "/srv/archive" }
//!     }
//!   ]
//! }
//! ```

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tome_library::Relocation;
use tome_library::models::{BookFile, Library, MoveRequest};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub books: Vec<Entry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    #[serde(flatten)]
    pub book: BookFile,
    /// Library to move the book into, if not its current one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_library: Option<Library>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).or_raise(|| ErrorKind::Manifest(path.to_path_buf()))?;
        serde_json::from_str(&contents).or_raise(|| ErrorKind::Manifest(path.to_path_buf()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).or_raise(|| ErrorKind::Manifest(path.to_path_buf()))?;
        std::fs::write(path, json + "\n").or_raise(|| ErrorKind::Manifest(path.to_path_buf()))
    }

    pub fn requests(&self) -> Vec<MoveRequest> {
        self.books
            .iter()
            .map(|entry| MoveRequest {
                book: entry.book.clone(),
                target_library: entry.target_library.clone(),
            })
            .collect()
    }

    /// Replaces each entry's record with the one the engine handed back.
    /// Results must be in request order. Entries that moved drop their
    /// target library, since they're now in it.
    pub fn apply(&mut self, results: Vec<Relocation>) {
        for (entry, result) in self.books.iter_mut().zip(results) {
            if result.is_moved() {
                entry.target_library = None;
            }
            entry.book = result.into_book();
        }
    }
}
