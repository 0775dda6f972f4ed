//! External collaborator contracts.
//!
//! The engine composes and commits documents; decoding pixels, producing
//! output image files, audit logging, metadata, and filename allocation all
//! live behind these seams. Hosts register real implementations; tests use
//! mocks.

use crate::commit::ProvenanceMap;
use crate::error::Result;
use crate::model::{DocumentData, Rotation};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One page of one output document, ready for re-assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRenderSpec {
    /// Source document name.
    pub source: String,

    /// Page number within the source (1-indexed).
    pub number: u32,

    /// Rotation to apply when rendering.
    pub rotation: Rotation,
}

/// A materialized output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    /// Where the file was written.
    pub path: PathBuf,

    /// Pages in the file.
    pub page_count: u32,

    /// File size in bytes.
    pub bytes: u64,
}

/// Access to source images.
pub trait ImageSource {
    /// Open a source (if needed) and return its page count.
    fn page_count(&self, source: &str) -> Result<u32>;
}

/// Produces output image files.
pub trait OutputCodec {
    /// Re-assemble the given pages into one output file at `dest`.
    fn write_document(&self, pages: &[PageRenderSpec], dest: &Path) -> Result<WrittenFile>;

    /// Copy a source file byte-identically to `dest`, without re-encoding.
    fn copy_verbatim(&self, source: &str, dest: &Path) -> Result<WrittenFile>;
}

/// Receives the commit-time provenance map for audit logging.
pub trait ProvenanceSink {
    /// Record one committed transaction's source-to-destination mapping.
    fn record(&self, map: &ProvenanceMap) -> Result<()>;
}

/// Supplies and reverts opaque per-document metadata.
pub trait DocumentDataProvider {
    /// Fresh metadata for a document originating from `filename`.
    fn request(&self, filename: &str) -> DocumentData;

    /// Metadata restored to its last-saved snapshot.
    fn revert(&self, filename: &str) -> DocumentData;
}

/// Allocates collision-free output filenames.
pub trait NamingAuthority {
    /// Map a base filename to a name no prior commit has used.
    fn assign(&self, base: &str) -> String;
}

/// Provenance sink that logs and discards.
#[derive(Debug, Default)]
pub struct NullProvenanceSink;

impl ProvenanceSink for NullProvenanceSink {
    fn record(&self, map: &ProvenanceMap) -> Result<()> {
        log::debug!("discarding provenance for {} pages", map.records.len());
        Ok(())
    }
}

/// Data provider handing out default (empty) metadata.
#[derive(Debug, Default)]
pub struct DefaultDataProvider;

impl DocumentDataProvider for DefaultDataProvider {
    fn request(&self, _filename: &str) -> DocumentData {
        DocumentData::default()
    }

    fn revert(&self, _filename: &str) -> DocumentData {
        DocumentData::default()
    }
}

/// Naming authority that suffixes repeats: `scan.tif`, `scan-1.tif`, ...
///
/// Interior mutability instead of `&mut self` because the engine is a
/// single-threaded state container (one logical mutation thread).
#[derive(Debug, Default)]
pub struct CounterNaming {
    used: RefCell<HashMap<String, u32>>,
}

impl CounterNaming {
    /// Create a fresh authority with no names taken.
    pub fn new() -> Self {
        Self::default()
    }
}

impl NamingAuthority for CounterNaming {
    fn assign(&self, base: &str) -> String {
        let mut used = self.used.borrow_mut();
        let n = used.entry(base.to_string()).or_insert(0);
        *n += 1;
        if *n == 1 {
            base.to_string()
        } else {
            match base.rsplit_once('.') {
                Some((stem, ext)) => format!("{}-{}.{}", stem, *n - 1, ext),
                None => format!("{}-{}", base, *n - 1),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_naming_is_collision_free() {
        let naming = CounterNaming::new();
        assert_eq!(naming.assign("scan.tif"), "scan.tif");
        assert_eq!(naming.assign("scan.tif"), "scan-1.tif");
        assert_eq!(naming.assign("scan.tif"), "scan-2.tif");
        assert_eq!(naming.assign("other"), "other");
        assert_eq!(naming.assign("other"), "other-1");
    }
}
