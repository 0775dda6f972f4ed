//! Data model: pages, sources, and output documents.

mod document;
mod page;
mod source;

pub use document::{DocId, DocumentData, DocumentForm, OutputDocument};
pub use page::{HolderId, Page, PageId, PageKey, Rotation, SourceId};
pub use source::{PageStore, SourceDocument};
