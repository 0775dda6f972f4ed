//! Commit transaction types and document classification.
//!
//! At commit time every target document is classified: the first exact
//! reproduction of a source's pristine pages goes out as a byte-identical
//! copy, later reproductions are materialized as fresh files, and anything
//! reordered, rotated, or short a page is re-assembled page by page.

mod transaction;

pub use transaction::{run_commit, CommitContext};

use crate::collab::WrittenFile;
use crate::model::{DocId, DocumentForm, PageStore, Rotation, SourceId};
use crate::sequence::Sequence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options for a commit transaction.
#[derive(Debug, Clone)]
pub struct CommitOptions {
    /// Commit only documents touched by the current selection or explicitly
    /// marked for commit.
    pub only_selection: bool,

    /// When a document is only partially selected, widen the selection to
    /// the whole document instead of failing validation.
    pub auto_expand: bool,

    /// Directory receiving the final output files.
    pub output_dir: PathBuf,
}

impl CommitOptions {
    /// Commit everything into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            only_selection: false,
            auto_expand: false,
            output_dir: output_dir.into(),
        }
    }

    /// Restrict the commit to the selection.
    pub fn only_selection(mut self) -> Self {
        self.only_selection = true;
        self
    }

    /// Auto-expand partial selections to whole documents.
    pub fn with_auto_expand(mut self, expand: bool) -> Self {
        self.auto_expand = expand;
        self
    }
}

/// One destination of a source page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Final output filename.
    pub filename: String,

    /// Page number within the output (1-indexed).
    pub page_number: u32,
}

/// Where one source page ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    /// Source document name.
    pub source: String,

    /// Page number within the source (1-indexed).
    pub number: u32,

    /// True when the page reached no output (recorded for audit).
    pub deleted: bool,

    /// Destinations in sequence order; the first entry is authoritative.
    pub destinations: Vec<Destination>,
}

/// The full source-to-destination mapping of one commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceMap {
    /// When the map was assembled.
    pub recorded_at: DateTime<Utc>,

    /// One record per source page of every source touched by the commit.
    pub records: Vec<ProvenanceRecord>,
}

/// Source-level summary attached to the `Paginated` notification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaginationReport {
    /// Sources whose every page reached an output; no longer referenced.
    pub consumed: Vec<String>,

    /// Sources whose suggested pagination was disregarded in favor of the
    /// as-loaded form.
    pub suggestion_disregarded: Vec<String>,

    /// Sources left in source form, unmodified.
    pub left_in_source_form: Vec<String>,
}

/// One successfully committed document.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedDocument {
    /// The document.
    pub document: DocId,

    /// Final output filename.
    pub filename: String,

    /// Classification that drove materialization.
    pub form: DocumentForm,

    /// The finalized file.
    pub file: WrittenFile,
}

/// Result of a commit transaction.
#[derive(Debug, Clone)]
pub struct CommitReport {
    /// Committed documents in sequence order.
    pub written: Vec<CommittedDocument>,

    /// The audit mapping handed to the provenance sink.
    pub provenance: ProvenanceMap,

    /// Source-level summary.
    pub pagination: PaginationReport,

    /// When the transaction finished.
    pub finished_at: DateTime<Utc>,
}

/// The source a document exactly reproduces, if any.
///
/// A document is in source form when its live pages are exactly one
/// source's pages, in pristine order, with no rotation.
pub(crate) fn source_form_of(
    seq: &Sequence,
    store: &PageStore,
    doc: DocId,
) -> Option<SourceId> {
    let live = seq.live_instances(doc, store);
    if live.is_empty() {
        return None;
    }
    let pages: Vec<_> = live
        .iter()
        .filter_map(|e| seq.page_of(*e))
        .filter_map(|p| store.page(p))
        .collect();
    if pages.len() != live.len() {
        return None;
    }
    let sid = pages[0].source;
    let source = store.source(sid)?;
    if pages.len() != source.pages.len() {
        return None;
    }
    for (i, page) in pages.iter().enumerate() {
        if page.source != sid
            || page.key.number != (i + 1) as u32
            || page.rotation != Rotation::R0
        {
            return None;
        }
    }
    Some(sid)
}

/// Classify target documents in sequence order.
///
/// The first exact reproduction of each source is `InSourceForm`; later
/// ones are `CopyOfSource`; everything else is `Modified`.
pub(crate) fn classify_documents(
    seq: &Sequence,
    store: &PageStore,
    targets: &[DocId],
) -> Vec<(DocId, DocumentForm, Option<SourceId>)> {
    let mut seen = std::collections::HashSet::new();
    targets
        .iter()
        .map(|&doc| match source_form_of(seq, store, doc) {
            Some(sid) => {
                let form = if seen.insert(sid) {
                    DocumentForm::InSourceForm
                } else {
                    DocumentForm::CopyOfSource
                };
                log::debug!("document {doc:?} classified {form:?}");
                (doc, form, Some(sid))
            }
            None => (doc, DocumentForm::Modified, None),
        })
        .collect()
}
