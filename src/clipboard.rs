//! Clipboard protocol: logical page identities plus reference counting.
//!
//! Copy and cut never serialize pixel data; the payload is the logical
//! identity of each page (source name and page number) plus its deleted
//! flag. Placing a payload increments a reference on every page involved,
//! which pins the owning source file until the clipboard moves on. Exactly
//! one add/release pair exists per holder: replacing the clipboard contents
//! or dropping the holder releases the previous references.

use crate::error::{Error, Result};
use crate::model::{HolderId, PageId, PageKey, PageStore};
use serde::{Deserialize, Serialize};

/// Bounded retry count for shared-clipboard placement.
pub const CLIPBOARD_RETRY_LIMIT: usize = 3;

/// One page reference on the clipboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardEntry {
    /// Source document name.
    pub source: String,

    /// Page number within the source (1-indexed).
    pub number: u32,

    /// Whether the page was marked deleted when copied.
    pub deleted: bool,
}

/// The serialized clipboard payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardPayload {
    /// Copied pages in selection order.
    pub entries: Vec<ClipboardEntry>,
}

impl ClipboardPayload {
    /// Build a payload from pages in order.
    pub fn from_pages(store: &PageStore, pages: &[PageId]) -> Self {
        let entries = pages
            .iter()
            .filter_map(|id| store.page(*id))
            .map(|p| ClipboardEntry {
                source: p.key.source.clone(),
                number: p.key.number,
                deleted: p.deleted,
            })
            .collect();
        Self { entries }
    }

    /// Serialize to the wire format.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the wire format.
    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Logical identities in payload order.
    pub fn keys(&self) -> impl Iterator<Item = PageKey> + '_ {
        self.entries
            .iter()
            .map(|e| PageKey::new(e.source.clone(), e.number))
    }
}

/// Where clipboard text actually goes.
///
/// The engine talks to a shared OS clipboard through this seam; writes can
/// transiently fail there, which is why placement validates by reading back.
pub trait ClipboardBackend {
    /// Replace the clipboard contents.
    fn write(&mut self, content: &str) -> Result<()>;

    /// Current clipboard contents, if any.
    fn read(&self) -> Result<Option<String>>;
}

/// Process-local clipboard backend, also the test double of choice.
#[derive(Debug, Default)]
pub struct InMemoryClipboard {
    content: Option<String>,
}

impl InMemoryClipboard {
    /// Create an empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardBackend for InMemoryClipboard {
    fn write(&mut self, content: &str) -> Result<()> {
        self.content = Some(content.to_string());
        Ok(())
    }

    fn read(&self) -> Result<Option<String>> {
        Ok(self.content.clone())
    }
}

/// The reference-count owner for the current clipboard contents.
///
/// Must be released through [`release`](ClipboardHolder::release) whenever
/// the contents are replaced or the workspace goes away; anything else leaks
/// references and the input files are never freed.
#[derive(Debug)]
pub struct ClipboardHolder {
    holder: HolderId,
    pages: Vec<PageId>,
}

impl ClipboardHolder {
    /// The pages this holder pins.
    pub fn pages(&self) -> &[PageId] {
        &self.pages
    }

    /// Release every reference this holder added.
    pub fn release(self, store: &mut PageStore) {
        for page in &self.pages {
            store.release_reference(*page, self.holder);
        }
    }
}

/// Place pages on the clipboard with validation and reference counting.
///
/// The payload is written and read back up to [`CLIPBOARD_RETRY_LIMIT`]
/// times; only after a verified write does the previous holder release and
/// the new holder add its references. On failure nothing changes: the old
/// holder keeps its references and is handed back inside the error path by
/// leaving `previous` untouched at the call site.
pub fn place(
    store: &mut PageStore,
    backend: &mut dyn ClipboardBackend,
    pages: &[PageId],
) -> Result<ClipboardHolder> {
    let payload = ClipboardPayload::from_pages(store, pages);
    let serialized = payload.to_json()?;

    let mut attempts = 0;
    let placed = loop {
        attempts += 1;
        match backend.write(&serialized) {
            Ok(()) => match backend.read()? {
                Some(content) if content == serialized => break true,
                other => {
                    log::warn!(
                        "clipboard read-back mismatch on attempt {attempts} ({} bytes back)",
                        other.map(|s| s.len()).unwrap_or(0)
                    );
                }
            },
            // A failing write is as transient as a mismatched read-back;
            // it consumes an attempt instead of aborting placement.
            Err(e) => {
                log::warn!("clipboard write failed on attempt {attempts}: {e}");
            }
        }
        if attempts >= CLIPBOARD_RETRY_LIMIT {
            break false;
        }
    };
    if !placed {
        return Err(Error::ClipboardValidationFailed { attempts });
    }

    let holder = store.new_holder();
    let mut held = Vec::with_capacity(pages.len());
    for page in pages {
        if store.add_reference(*page, holder) {
            held.push(*page);
        }
    }
    Ok(ClipboardHolder {
        holder,
        pages: held,
    })
}

/// Read and parse the current clipboard payload.
pub fn take_payload(backend: &dyn ClipboardBackend) -> Result<ClipboardPayload> {
    match backend.read()? {
        Some(content) => ClipboardPayload::from_json(&content),
        None => Err(Error::ClipboardEmpty),
    }
}
