//! Output document types.
//!
//! An [`OutputDocument`] is a logical destination document: the maximal run
//! of page instances between two separators in the pagination sequence. The
//! sequence derives and maintains its membership; nothing here stores
//! authoritative neighbor links.

use super::page::{PageId, Rotation};
use crate::sequence::ElementId;
use serde::{Deserialize, Serialize};

/// Stable arena index of an [`OutputDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocId(pub(crate) u32);

/// Opaque user metadata attached to a document.
///
/// The engine never interprets the contents beyond these flags; the actual
/// payload lives with the host's data provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentData {
    /// The metadata has unsaved operator edits.
    pub modified: bool,

    /// The metadata failed validation.
    pub data_error: bool,

    /// The metadata carries a non-fatal warning.
    pub data_warning: bool,

    /// The metadata is shared with a verification workflow.
    pub shared_in_verification: bool,
}

/// Commit-time classification of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentForm {
    /// First exact reproduction of one source's pristine pages: the output
    /// is a byte-identical copy, never re-encoded.
    InSourceForm,

    /// Second or later exact reproduction of a source; must still be
    /// materialized as a new file.
    CopyOfSource,

    /// Reordered, rotated, merged, or missing pages; requires page-by-page
    /// re-assembly.
    Modified,
}

/// A logical output document assembled from a run of page instances.
#[derive(Debug, Clone)]
pub struct OutputDocument {
    /// Stable identity.
    pub id: DocId,

    /// Base output filename (collision resolution happens at commit).
    pub filename: String,

    /// Collapsed in the host's thumbnail panel; pages are not navigable.
    pub collapsed: bool,

    /// Whether the operator marked this document for commit.
    pub selected_for_commit: bool,

    /// Whether this document came from an upstream pagination suggestion.
    pub pagination_suggested: bool,

    /// Whether this document has already been committed.
    pub committed: bool,

    /// Attached metadata flags.
    pub data: DocumentData,

    /// Page instances at creation time, with their rotations, for revert
    /// and for [`OutputDocument::matches_original`].
    pub original_pages: Vec<(PageId, Rotation)>,

    /// Page instance elements in order. Recomputed from sequence order.
    pub pages: Vec<ElementId>,

    /// The separator that opens this document's run, if any.
    pub separator: Option<ElementId>,
}

impl OutputDocument {
    /// Create a document with a creation snapshot.
    pub fn new(id: DocId, filename: impl Into<String>, original: Vec<(PageId, Rotation)>) -> Self {
        Self {
            id,
            filename: filename.into(),
            collapsed: false,
            selected_for_commit: false,
            pagination_suggested: false,
            committed: false,
            data: DocumentData::default(),
            original_pages: original,
            pages: Vec::new(),
            separator: None,
        }
    }

    /// Number of page instances currently in the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Whether the document currently holds no page instances.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Whether the document still matches its creation snapshot, given the
    /// current (page, rotation) pairs of its instances in order.
    pub fn matches_original(&self, current: &[(PageId, Rotation)]) -> bool {
        self.original_pages == current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_is_empty() {
        let doc = OutputDocument::new(DocId(0), "a.tif", Vec::new());
        assert!(doc.is_empty());
        assert_eq!(doc.page_count(), 0);
        assert!(!doc.committed);
    }

    #[test]
    fn test_matches_original() {
        let snapshot = vec![(PageId(0), Rotation::R0), (PageId(1), Rotation::R0)];
        let doc = OutputDocument::new(DocId(0), "a.tif", snapshot.clone());
        assert!(doc.matches_original(&snapshot));

        let rotated = vec![(PageId(0), Rotation::R90), (PageId(1), Rotation::R0)];
        assert!(!doc.matches_original(&rotated));

        let reordered = vec![(PageId(1), Rotation::R0), (PageId(0), Rotation::R0)];
        assert!(!doc.matches_original(&reordered));
    }
}
