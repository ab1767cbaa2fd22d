//! Interfaces the host list model implements for the scheduler.

use crate::backend::BackendKind;

/// One row of the host's item list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListEntry {
    /// Stable identifier of the item (its URL or path).
    pub source_id: String,
    /// Directory-like entries never get thumbnails.
    pub is_directory: bool,
}

impl ListEntry {
    pub fn file(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            is_directory: false,
        }
    }

    pub fn directory(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            is_directory: true,
        }
    }
}

/// Read access to the host's current item list.
pub trait ItemList: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry at `index`, or `None` when out of range.
    fn item(&self, index: usize) -> Option<ListEntry>;

    /// True while the list is still being populated and may be rewritten.
    fn is_scanning(&self) -> bool;

    /// Linear search for the current position of `source_id`.
    fn position_of(&self, source_id: &str) -> Option<usize> {
        (0..self.len()).find(|&i| {
            self.item(i)
                .is_some_and(|entry| entry.source_id == source_id)
        })
    }
}

/// Maps an entry to the storage backend that serves it.
pub trait BackendClassifier: Send + Sync {
    fn classify(&self, entry: &ListEntry) -> BackendKind;
}

/// Mutation notifications raised by the host list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListEvent {
    /// Scanning finished; the list is stable.
    ScanCompleted,
    /// Items were inserted or removed.
    Spliced,
    /// Items were reordered.
    Sorted,
    /// The item at `index` changed on disk.
    Changed { index: usize },
}
