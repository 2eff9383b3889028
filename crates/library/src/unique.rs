use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Keeps the files moved in one batch from landing on the same path.
///
/// The first request for a path gets it unchanged. Every later request for the
/// same path (compared case-insensitively, since several common filesystems
/// are) gets `_2`, `_3`, … inserted before the extension, skipping any
/// suffixed name that is itself taken.
///
/// Only paths handed out or reserved through this counter are considered;
/// other files already on disk are not.
#[derive(Debug, Default)]
pub struct CollisionCounter {
    seen: HashMap<String, usize>,
}

impl CollisionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `path` without renaming it, so that later candidates with the
    /// same path are suffixed.
    pub fn reserve(&mut self, path: &Path) {
        self.seen.entry(Self::key(path)).or_insert(1);
    }

    /// Give up a claim on `path`, e.g. because the file there is about to be
    /// moved away.
    pub fn release(&mut self, path: &Path) {
        self.seen.remove(&Self::key(path));
    }

    pub fn unique_path(&mut self, candidate: PathBuf) -> PathBuf {
        let key = Self::key(&candidate);
        let mut count = *self.seen.entry(key.clone()).and_modify(|c| *c += 1).or_insert(1);
        if count == 1 {
            return candidate;
        }
        let Some(file_name) = candidate.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return candidate;
        };
        loop {
            let renamed = candidate.with_file_name(Self::suffixed(&file_name, count));
            let renamed_key = Self::key(&renamed);
            if !self.seen.contains_key(&renamed_key) {
                self.seen.insert(key, count);
                self.seen.insert(renamed_key, 1);
                return renamed;
            }
            count += 1;
        }
    }

    fn suffixed(file_name: &str, count: usize) -> String {
        match file_name.rfind('.') {
            // A trailing dot isn't an extension separator.
            Some(dot) if dot + 1 < file_name.len() => {
                format!("{}_{}{}", &file_name[..dot], count, &file_name[dot..])
            },
            _ => format!("{file_name}_{count}"),
        }
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_sequence() {
        let mut counter = CollisionCounter::new();
        let candidate = PathBuf::from("/books/J. Doe/Title.pdf");
        assert_eq!(counter.unique_path(candidate.clone()), Path::new("/books/J. Doe/Title.pdf"));
        assert_eq!(counter.unique_path(candidate.clone()), Path::new("/books/J. Doe/Title_2.pdf"));
        assert_eq!(counter.unique_path(candidate), Path::new("/books/J. Doe/Title_3.pdf"));
    }

    #[test]
    fn test_case_insensitive() {
        let mut counter = CollisionCounter::new();
        counter.unique_path(PathBuf::from("/books/Title.PDF"));
        assert_eq!(counter.unique_path(PathBuf::from("/books/title.pdf")), Path::new("/books/title_2.pdf"));
    }

    #[test]
    fn test_reserve() {
        let mut counter = CollisionCounter::new();
        counter.reserve(Path::new("/books/Title.pdf"));
        counter.reserve(Path::new("/books/Title.pdf"));
        assert_eq!(counter.unique_path(PathBuf::from("/books/Title.pdf")), Path::new("/books/Title_2.pdf"));
        assert_eq!(counter.unique_path(PathBuf::from("/books/Other.pdf")), Path::new("/books/Other.pdf"));
    }

    #[test]
    fn test_suffixes_skip_taken_names() {
        let mut counter = CollisionCounter::new();
        counter.reserve(Path::new("/books/Title.pdf"));
        counter.reserve(Path::new("/books/Title_2.pdf"));
        assert_eq!(counter.unique_path(PathBuf::from("/books/Title.pdf")), Path::new("/books/Title_3.pdf"));
        assert_eq!(counter.unique_path(PathBuf::from("/books/Title_3.pdf")), Path::new("/books/Title_3_2.pdf"));
        assert_eq!(counter.unique_path(PathBuf::from("/books/Title.pdf")), Path::new("/books/Title_4.pdf"));
    }

    #[test]
    fn test_release() {
        let mut counter = CollisionCounter::new();
        counter.reserve(Path::new("/books/Title.pdf"));
        counter.reserve(Path::new("/books/Title_2.pdf"));
        counter.release(Path::new("/books/title_2.PDF"));
        assert_eq!(counter.unique_path(PathBuf::from("/books/Title.pdf")), Path::new("/books/Title_2.pdf"));
    }

    #[rstest]
    #[case("/books/README", "/books/README_2")]
    #[case("/books/notes.", "/books/notes._2")]
    #[case("/books/archive.tar.gz", "/books/archive.tar_2.gz")]
    #[case("/books/.hidden", "/books/_2.hidden")]
    fn test_extension_edge_cases(#[case] candidate: &str, #[case] expected: &str) {
        let mut counter = CollisionCounter::new();
        counter.unique_path(PathBuf::from(candidate));
        assert_eq!(counter.unique_path(PathBuf::from(candidate)), Path::new(expected));
    }
}
