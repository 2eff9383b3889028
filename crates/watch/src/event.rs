use crate::monitor::LibraryId;
use std::path::PathBuf;
use time::UtcDateTime;

/// What happened to a path inside a monitored directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Created,
    Modified,
    Removed,
}

impl WatchEventKind {
    pub(crate) fn from_notify(kind: &notify::EventKind) -> Option<Self> {
        use notify::EventKind;
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(_) => Some(Self::Modified),
            EventKind::Remove(_) => Some(Self::Removed),
            // Access events and backend noise are of no interest.
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }
}

/// A change observed in a monitored directory, attributed to the library that
/// owns the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub library_id: LibraryId,
    pub path: PathBuf,
    pub kind: WatchEventKind,
    pub detected_at: UtcDateTime,
}

impl WatchEvent {
    pub fn new(library_id: LibraryId, path: impl Into<PathBuf>, kind: WatchEventKind) -> Self {
        Self {
            library_id,
            path: path.into(),
            kind,
            detected_at: UtcDateTime::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};
    use rstest::rstest;

    #[rstest]
    #[case(notify::EventKind::Create(CreateKind::File), Some(WatchEventKind::Created))]
    #[case(notify::EventKind::Modify(ModifyKind::Any), Some(WatchEventKind::Modified))]
    #[case(notify::EventKind::Remove(RemoveKind::Folder), Some(WatchEventKind::Removed))]
    #[case(notify::EventKind::Access(AccessKind::Any), None)]
    #[case(notify::EventKind::Other, None)]
    fn test_from_notify(#[case] kind: notify::EventKind, #[case] expected: Option<WatchEventKind>) {
        assert_eq!(WatchEventKind::from_notify(&kind), expected);
    }
}
