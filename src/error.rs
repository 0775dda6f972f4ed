//! Error types for the repage library.

use std::io;
use thiserror::Error;

/// Result type alias for repage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while composing or committing documents.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when staging or finalizing output files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Inserting the element would place two separators next to each other.
    ///
    /// This signals a no-op, not a fatal condition: the caller should drop
    /// the insertion and leave the sequence as it was.
    #[error("Insertion would create adjacent separators")]
    InvalidAdjacency,

    /// Loading more pages would exceed the concurrently-loaded page ceiling.
    #[error("Page capacity exceeded (limit is {limit} loaded pages)")]
    CapacityExceeded {
        /// The enforced ceiling.
        limit: usize,
    },

    /// The referenced sequence element no longer exists.
    #[error("Sequence element not found")]
    ElementNotFound,

    /// The referenced output document no longer exists.
    #[error("Output document not found")]
    DocumentNotFound,

    /// A clipboard entry references a source that could not be opened.
    #[error("Source document not loaded: {0}")]
    SourceNotLoaded(String),

    /// A source re-opened with a different page count than first recorded.
    ///
    /// The file changed on disk between loads; the existing pages keep their
    /// identities and the new load is rejected.
    #[error("Source {name} now reports {reported} pages (previously {known})")]
    SourceChanged {
        /// Source document name.
        name: String,
        /// Page count reported by the image source now.
        reported: u32,
        /// Page count recorded when the source was first opened.
        known: u32,
    },

    /// A commit scope selects only part of one or more documents.
    ///
    /// Recoverable: the operator can widen the selection, or the caller can
    /// retry with auto-expansion enabled.
    #[error("Commit selection splits document boundary: {documents:?}")]
    CommitValidationFailed {
        /// Filenames of the partially-selected documents.
        documents: Vec<String>,
    },

    /// Clipboard contents could not be validated after the retry bound.
    #[error("Clipboard write could not be validated after {attempts} attempts")]
    ClipboardValidationFailed {
        /// Number of write attempts made.
        attempts: usize,
    },

    /// Paste was requested but the clipboard holds no payload.
    #[error("Clipboard is empty")]
    ClipboardEmpty,

    /// The clipboard backend failed outright (not a validation mismatch).
    #[error("Clipboard backend error: {0}")]
    ClipboardBackend(String),

    /// The provenance sink rejected the commit's audit record.
    ///
    /// Fatal for the in-progress commit: no output file is moved to its
    /// final name. Already-staged temporary files are not rolled back.
    #[error("Provenance write failed: {0}")]
    ProvenanceWriteFailed(String),

    /// One or more documents failed to materialize during a commit.
    ///
    /// Failures are aggregated so a partial success is never silent.
    #[error("Commit failed for {} document(s)", failures.len())]
    CommitFailed {
        /// (document filename, failure description) pairs.
        failures: Vec<(String, String)>,
    },

    /// A commit was requested while another commit is in progress.
    #[error("A commit is already in progress")]
    CommitInProgress,

    /// A load was requested while another load is in progress.
    #[error("A load is already in progress")]
    LoadInProgress,

    /// Output codec failure while materializing a document.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ClipboardBackend(err.to_string())
    }
}
