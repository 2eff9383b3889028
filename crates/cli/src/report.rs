use std::collections::BTreeMap;
use std::fmt;
use tome_library::Relocation;
use tome_library::models::LibraryId;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Per-library tally of a batch, keyed by the library each record ended up
/// in. Records without a library are counted under `None`.
#[derive(Debug, Default)]
pub struct Report {
    libraries: BTreeMap<Option<LibraryId>, Counts>,
}

impl Report {
    pub fn new(results: &[Relocation]) -> Self {
        let mut libraries: BTreeMap<_, Counts> = BTreeMap::new();
        for result in results {
            let counts = libraries
                .entry(result.book().library.as_ref().map(|l| l.id))
                .or_default();
            match result {
                Relocation::Moved(_) => counts.moved += 1,
                Relocation::Skipped(..) => counts.skipped += 1,
                Relocation::Failed(..) => counts.failed += 1,
            }
        }
        Self { libraries }
    }

    pub fn get(&self, library: Option<LibraryId>) -> Counts {
        self.libraries.get(&library).copied().unwrap_or_default()
    }

    pub fn failed(&self) -> usize {
        self.libraries.values().map(|c| c.failed).sum()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (library, counts) in &self.libraries {
            match library {
                Some(id) => write!(f, "library {id}: ")?,
                None => write!(f, "no library: ")?,
            }
            writeln!(
                f,
                "{} moved, {} skipped, {} failed",
                counts.moved, counts.skipped, counts.failed
            )?;
        }
        Ok(())
    }
}

/// One line per record, for the terminal.
pub fn describe(result: &Relocation) -> String {
    let book = result.book();
    let location = book
        .full_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(unplaced)".to_string());
    match result {
        Relocation::Moved(_) => format!("moved    #{} -> {location}", book.id),
        Relocation::Skipped(_, reason) => format!("skipped  #{} ({reason})", book.id),
        Relocation::Failed(_, e) => format!("FAILED   #{} at {location}: {}", book.id, &**e),
    }
}
