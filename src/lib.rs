//! # repage
//!
//! Pagination composition engine for scanned-page workflows.
//!
//! This library holds the state of a re-pagination session: pages loaded
//! from scanned source documents, one ordered sequence of page and
//! separator elements, the output documents derived from that order, a
//! selection state machine, a reference-counting clipboard protocol, and
//! a commit transaction that materializes output files with a full
//! source-to-destination audit trail.
//!
//! ## Quick Start
//!
//! ```no_run
//! use repage::{
//!     CommitContext, CommitOptions, CounterNaming, DefaultDataProvider,
//!     NullProvenanceSink, Workspace,
//! };
//! use repage::collab::{ImageSource, OutputCodec};
//!
//! fn run(
//!     images: &dyn ImageSource,
//!     codec: &dyn OutputCodec,
//! ) -> repage::Result<()> {
//!     let data = DefaultDataProvider;
//!     let mut ws = Workspace::new();
//!     ws.load_source("scan-001.tif", images, &data, None)?;
//!     ws.load_source("scan-002.tif", images, &data, None)?;
//!
//!     let provenance = NullProvenanceSink;
//!     let naming = CounterNaming::new();
//!     let ctx = CommitContext {
//!         codec,
//!         provenance: &provenance,
//!         naming: &naming,
//!     };
//!     let (report, _notes) = ws.commit(&CommitOptions::new("out"), &ctx)?;
//!     println!("committed {} document(s)", report.written.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Order-derived documents**: split and merge are separator edits;
//!   membership is recomputed from sequence order, never stored as links
//! - **Logical clipboard**: copy and cut move page identities, with
//!   reference counting pinning source files until the clipboard moves on
//! - **Classified commits**: pristine documents go out as byte-identical
//!   copies; everything else is re-assembled page by page
//! - **Audit provenance**: every commit records where each source page
//!   ended up, deletions included
//! - **Pluggable collaborators**: image access, output encoding, audit
//!   logging, metadata, and naming live behind traits

pub mod clipboard;
pub mod collab;
pub mod commit;
pub mod error;
pub mod model;
pub mod notify;
pub mod selection;
pub mod sequence;
pub mod workspace;

// Re-export commonly used types
pub use clipboard::{
    ClipboardBackend, ClipboardEntry, ClipboardPayload, InMemoryClipboard, CLIPBOARD_RETRY_LIMIT,
};
pub use collab::{
    CounterNaming, DefaultDataProvider, NullProvenanceSink, PageRenderSpec, WrittenFile,
};
pub use commit::{
    CommitContext, CommitOptions, CommitReport, CommittedDocument, Destination, PaginationReport,
    ProvenanceMap, ProvenanceRecord,
};
pub use error::{Error, Result};
pub use model::{
    DocId, DocumentData, DocumentForm, OutputDocument, Page, PageId, PageKey, PageStore, Rotation,
    SourceDocument, SourceId,
};
pub use notify::Notification;
pub use selection::{Modifiers, SelectionState};
pub use sequence::{Element, ElementId, Position, Sequence, MAX_LOADED_PAGES};
pub use workspace::Workspace;
