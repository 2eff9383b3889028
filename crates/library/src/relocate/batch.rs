use super::error::{ErrorKind, Result};
use super::{Relocation, Relocator, SkipReason, placement};
use crate::models::{AdditionalFile, BookFile, BookMetadata, Library, MoveRequest};
use crate::unique::CollisionCounter;
use exn::ResultExt;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tome_storage::normalize;
use tome_watch::{LibraryId, PathRegistry};
use tracing::instrument;

/// Libraries unregistered for the duration of a batch.
/// [`finish`](Self::finish) re-registers their whole directory trees;
/// dropping it unfinished does the same on the spot, so an aborted batch
/// still restores monitoring.
struct LibraryRestore {
    registry: PathRegistry,
    libraries: BTreeMap<LibraryId, PathBuf>,
}

impl LibraryRestore {
    async fn finish(mut self) {
        let libraries = std::mem::take(&mut self.libraries);
        let registered = self
            .registry
            .register_libraries(libraries.iter().map(|(id, root)| (*id, root)))
            .await;
        tracing::debug!(libraries = libraries.len(), registered, "Re-registered libraries");
    }
}

impl Drop for LibraryRestore {
    fn drop(&mut self) {
        if self.libraries.is_empty() {
            return;
        }
        let registered = self
            .registry
            .register_libraries_blocking(self.libraries.iter().map(|(id, root)| (*id, root)));
        tracing::debug!(libraries = self.libraries.len(), registered, "Re-registered libraries");
    }
}

/// Where a record's primary file is and where its pattern wants it.
struct Route {
    source_library: Library,
    target_library: Library,
    source: PathBuf,
    target: PathBuf,
}

enum Plan {
    Skip(SkipReason),
    Move(Route),
}

/// Everything a record's files need to know about where they're going.
struct Destination<'a> {
    source: &'a Library,
    target: &'a Library,
    roots: [PathBuf; 2],
}

impl Relocator {
    /// Moves every record to the location its naming pattern dictates.
    ///
    /// Each affected library (the records' own libraries and any target
    /// libraries) is unregistered once for the whole batch and re-registered
    /// once at the end, however many records fail, and whether or not it was
    /// monitored beforehand. A library whose root doesn't exist registers
    /// nothing.
    ///
    /// Every target is worked out before anything moves. The files the batch
    /// already holds (primaries in place, every record's current files) are
    /// claimed first, so no record is moved onto a file another record still
    /// owns, whatever order the records come in.
    ///
    /// Records are then processed one at a time, in order. A failure is
    /// reported as [`Relocation::Failed`] and the batch carries on; files
    /// already moved stay moved.
    #[instrument(skip_all, fields(count = requests.len()))]
    pub async fn move_batch(&self, requests: Vec<MoveRequest>) -> Vec<Relocation> {
        let restore = self.suspend_libraries(&requests);
        tokio::time::sleep(self.settings.pre_move_delay).await;

        let mut planned = Vec::with_capacity(requests.len());
        for MoveRequest { book, target_library } in requests {
            let plan = self.plan(&book, target_library).await;
            planned.push((book, plan));
        }
        let mut counter = CollisionCounter::new();
        for (book, plan) in &planned {
            if !matches!(plan, Ok(Plan::Skip(SkipReason::SourceMissing))) {
                claim_files(&mut counter, book);
            }
        }

        let mut results = Vec::with_capacity(planned.len());
        for (book, plan) in planned {
            let relocation = match plan {
                Ok(Plan::Skip(reason)) => Relocation::Skipped(book, reason),
                Ok(Plan::Move(route)) => self.relocate_one(book, route, &mut counter).await,
                Err(e) => Relocation::Failed(book, e),
            };
            match &relocation {
                Relocation::Moved(book) => tracing::debug!(book_id = book.id, "Relocated"),
                Relocation::Skipped(book, reason) => tracing::debug!(book_id = book.id, %reason, "Skipped"),
                Relocation::Failed(book, e) => tracing::error!(book_id = book.id, error = ?e, "Relocation failed"),
            }
            results.push(relocation);
        }

        let moved = results.iter().filter(|r| r.is_moved()).count();
        let failed = results.iter().filter(|r| r.is_failed()).count();
        tracing::info!(moved, failed, total = results.len(), "Batch complete");
        tokio::time::sleep(self.settings.batch_settle_delay).await;
        restore.finish().await;
        results
    }

    /// Runs [`move_batch`](Self::move_batch) with the watcher paused, for
    /// reorganising whole libraries at once.
    pub async fn reorganize(&self, requests: Vec<MoveRequest>) -> Vec<Relocation> {
        self.guard.execute_protected("reorganize", self.move_batch(requests)).await
    }

    fn suspend_libraries(&self, requests: &[MoveRequest]) -> LibraryRestore {
        let mut libraries = BTreeMap::new();
        let affected = requests
            .iter()
            .flat_map(|r| [r.book.library.as_ref(), r.target_library.as_ref()])
            .flatten();
        for library in affected {
            libraries.entry(library.id).or_insert_with(|| library.root.clone());
        }
        for id in libraries.keys() {
            self.registry.unregister_library(*id);
        }
        LibraryRestore {
            registry: self.registry.clone(),
            libraries,
        }
    }

    /// Decides whether a record moves, and where to, without touching it.
    async fn plan(&self, book: &BookFile, target_library: Option<Library>) -> Result<Plan> {
        let Some(source_library) = book.library.clone() else {
            return Ok(Plan::Skip(SkipReason::NoLibrary));
        };
        if !book.has_required_path_components() {
            return Ok(Plan::Skip(SkipReason::MissingPathComponents));
        }
        let Some(source) = book.full_path() else {
            return Ok(Plan::Skip(SkipReason::InvalidLocation));
        };
        if !self.fs.exists(&source).await.or_raise(|| ErrorKind::Storage)? {
            return Ok(Plan::Skip(SkipReason::SourceMissing));
        }
        let target_library = match target_library {
            Some(library) if library.id != source_library.id => library,
            _ => source_library.clone(),
        };
        let target = self.target_path(book, &target_library)?;
        if normalize(&target) == normalize(&source) {
            return Ok(Plan::Skip(SkipReason::AlreadyInPlace));
        }
        Ok(Plan::Move(Route {
            source_library,
            target_library,
            source,
            target,
        }))
    }

    async fn relocate_one(&self, mut book: BookFile, route: Route, counter: &mut CollisionCounter) -> Relocation {
        match self.relocate_book(&mut book, route, counter).await {
            Ok(None) => Relocation::Moved(book),
            Ok(Some(reason)) => Relocation::Skipped(book, reason),
            Err(e) => Relocation::Failed(book, e),
        }
    }

    /// Moves the primary file, then the additional files. Returns why
    /// nothing was moved, if nothing was.
    async fn relocate_book(
        &self,
        book: &mut BookFile,
        route: Route,
        counter: &mut CollisionCounter,
    ) -> Result<Option<SkipReason>> {
        let Route {
            source_library,
            target_library,
            source,
            target,
        } = route;
        // The file is leaving, so its current path is free unless the move
        // doesn't happen.
        counter.release(&normalize(&source));
        let target = counter.unique_path(target);
        if normalize(&target) == normalize(&source) {
            return Ok(Some(SkipReason::AlreadyInPlace));
        }

        let destination = Destination {
            roots: [source_library.root.clone(), target_library.root.clone()],
            source: &source_library,
            target: &target_library,
        };
        if let Err(e) = self.rename_and_cleanup(&source, &target, &destination.roots).await {
            counter.reserve(&normalize(&source));
            return Err(e);
        }
        let (sub_path, file_name) = placement(&target_library, &target)?;
        book.sub_path = Some(sub_path);
        book.file_name = Some(file_name);
        if target_library.id != source_library.id {
            tracing::info!(from = %source_library.id, to = %target_library.id, "Moved book to another library");
            book.library = Some(target_library.clone());
        }

        for file in book.additional_files.iter_mut() {
            self.relocate_additional(file, &book.metadata, &destination, counter).await?;
        }
        Ok(None)
    }

    /// Additional files are named with the book's metadata but keep their
    /// own extension, and never overwrite another file moved in this batch.
    #[instrument(skip_all, fields(file_id = file.id))]
    async fn relocate_additional(
        &self,
        file: &mut AdditionalFile,
        metadata: &BookMetadata,
        destination: &Destination<'_>,
        counter: &mut CollisionCounter,
    ) -> Result<()> {
        let Some(source) = file.full_path(destination.source) else {
            tracing::warn!("Stored location escapes library root");
            return Ok(());
        };
        if !self.fs.exists(&source).await.or_raise(|| ErrorKind::Storage)? {
            tracing::warn!(path = %source.display(), "Additional file missing");
            return Ok(());
        }
        let target = self.resolve(metadata, &file.file_name, destination.target)?;
        if normalize(&target) == normalize(&source) {
            return Ok(());
        }
        counter.release(&normalize(&source));
        let target = counter.unique_path(target);
        if normalize(&target) == normalize(&source) {
            return Ok(());
        }
        if let Err(e) = self.rename_and_cleanup(&source, &target, &destination.roots).await {
            counter.reserve(&normalize(&source));
            return Err(e);
        }
        let (sub_path, file_name) = placement(destination.target, &target)?;
        file.sub_path = sub_path;
        file.file_name = file_name;
        Ok(())
    }
}

/// Claims the paths of a record's files as they are now.
fn claim_files(counter: &mut CollisionCounter, book: &BookFile) {
    let Some(library) = &book.library else {
        return;
    };
    let additional = book.additional_files.iter().filter_map(|f| f.full_path(library));
    for path in book.full_path().into_iter().chain(additional) {
        counter.reserve(&normalize(&path));
    }
}
