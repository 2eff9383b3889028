use super::error::{ErrorKind, Result};
use super::{Relocator, SkipReason, placement};
use crate::models::BookFile;
use exn::ResultExt;
use std::path::PathBuf;
use tome_storage::normalize;
use tracing::instrument;

/// What [`Relocator::move_single`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Moved { from: PathBuf, to: PathBuf },
    Skipped(SkipReason),
}

impl Relocator {
    /// Moves `book`'s primary file to the location its naming pattern
    /// dictates, suspending only the two directories involved.
    ///
    /// On success the record's `sub_path` and `file_name` describe the new
    /// location; the caller is responsible for persisting it. Additional
    /// files are left alone. A rename failure is returned as an error and
    /// leaves the record untouched.
    #[instrument(skip_all, fields(book_id = book.id))]
    pub async fn move_single(&self, book: &mut BookFile) -> Result<Outcome> {
        let Some(library) = book.library.clone() else {
            return Ok(Outcome::Skipped(SkipReason::NoLibrary));
        };
        if !book.has_required_path_components() {
            return Ok(Outcome::Skipped(SkipReason::MissingPathComponents));
        }
        let Some(source) = book.full_path() else {
            tracing::warn!("Stored location escapes library root");
            return Ok(Outcome::Skipped(SkipReason::InvalidLocation));
        };
        if !self.fs.exists(&source).await.or_raise(|| ErrorKind::Storage)? {
            tracing::debug!(path = %source.display(), "Source file missing, nothing to move");
            return Ok(Outcome::Skipped(SkipReason::SourceMissing));
        }
        let target = self.target_path(book, &library)?;
        if normalize(&target) == normalize(&source) {
            tracing::debug!(path = %source.display(), "Already in place");
            return Ok(Outcome::Skipped(SkipReason::AlreadyInPlace));
        }

        let roots = [library.root.clone()];
        self.scoped
            .execute_with_paths_suspended(
                &source,
                &target,
                library.id,
                self.rename_and_cleanup(&source, &target, &roots),
            )
            .await?;

        let (sub_path, file_name) = placement(&library, &target)?;
        book.sub_path = Some(sub_path);
        book.file_name = Some(file_name);
        Ok(Outcome::Moved { from: source, to: target })
    }
}
