//! Notifications emitted by mutation entry points.
//!
//! The engine is a pure state container: it never calls back into host code
//! mid-mutation. Every mutating operation returns the notifications the
//! presentation layer needs to re-render, in the order they occurred.

use crate::commit::PaginationReport;
use crate::model::DocId;
use crate::sequence::ElementId;
use std::path::PathBuf;

/// A discrete state-change event for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The selection set changed.
    SelectionChanged,

    /// The primary selection moved. The host closes the previously displayed
    /// page and opens the new one; when both resolve to the same page the
    /// transition is a no-op.
    PrimarySelectionChanged {
        /// Element that lost primary status.
        previous: Option<ElementId>,
        /// Element that gained primary status.
        current: Option<ElementId>,
    },

    /// A new output document was created (load, split, or paste).
    DocumentCreated(DocId),

    /// An output document lost its last page instance and was disposed.
    DocumentRemoved(DocId),

    /// A document's membership, filename, or flags changed.
    DocumentChanged(DocId),

    /// Derived state (command availability, separator captions) must be
    /// recomputed by the host.
    StateChanged,

    /// A document was committed to its final output file.
    DocumentCommitted {
        /// The committed document.
        document: DocId,
        /// Final output path.
        file: PathBuf,
    },

    /// A commit transaction finished; summarizes source consumption.
    Paginated(PaginationReport),
}
