//! Source documents and the page arena.
//!
//! The [`PageStore`] owns every [`Page`] behind a stable [`PageId`], so the
//! rest of the engine can hold IDs instead of shared mutable references.
//! All page mutation goes through the store's write paths; callers that mark
//! the sequence dirty after a write keep derived separator state consistent.

use super::page::{HolderId, Page, PageId, PageKey, Rotation, SourceId};
use std::collections::HashMap;

/// One input file and its pristine pages.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Source file name.
    pub name: String,

    /// Pages in pristine order.
    pub pages: Vec<PageId>,

    /// Whether the file is currently loaded.
    pub loaded: bool,

    /// Whether an upstream pagination suggestion accompanied this source.
    pub pagination_suggested: bool,
}

impl SourceDocument {
    /// Number of pages in the source.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }
}

/// Arena of pages and source documents, keyed by stable IDs.
#[derive(Debug, Default)]
pub struct PageStore {
    pages: Vec<Page>,
    sources: Vec<SourceDocument>,
    by_key: HashMap<PageKey, PageId>,
    next_holder: u32,
}

impl PageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a source document, creating one authoritative page per number.
    ///
    /// Re-opening a source by the same name returns the existing entry and
    /// marks it loaded again.
    pub fn open_source(&mut self, name: &str, page_count: u32) -> SourceId {
        if let Some(id) = self.source_by_name(name) {
            self.sources[id.0 as usize].loaded = true;
            return id;
        }

        let source = SourceId(self.sources.len() as u32);
        let mut pages = Vec::with_capacity(page_count as usize);
        for number in 1..=page_count {
            let key = PageKey::new(name, number);
            let id = PageId(self.pages.len() as u32);
            self.by_key.insert(key.clone(), id);
            self.pages.push(Page::new(key, source));
            pages.push(id);
        }
        self.sources.push(SourceDocument {
            name: name.to_string(),
            pages,
            loaded: true,
            pagination_suggested: false,
        });
        log::debug!("opened source {name} with {page_count} pages");
        source
    }

    /// Mark a source as carrying an upstream pagination suggestion.
    pub fn set_pagination_suggested(&mut self, source: SourceId, suggested: bool) {
        if let Some(s) = self.sources.get_mut(source.0 as usize) {
            s.pagination_suggested = suggested;
        }
    }

    /// Look up a source by name.
    pub fn source_by_name(&self, name: &str) -> Option<SourceId> {
        self.sources
            .iter()
            .position(|s| s.name == name)
            .map(|i| SourceId(i as u32))
    }

    /// Get a source document.
    pub fn source(&self, id: SourceId) -> Option<&SourceDocument> {
        self.sources.get(id.0 as usize)
    }

    /// Iterate all sources in load order.
    pub fn sources(&self) -> impl Iterator<Item = (SourceId, &SourceDocument)> {
        self.sources
            .iter()
            .enumerate()
            .map(|(i, s)| (SourceId(i as u32), s))
    }

    /// Get a page.
    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.get(id.0 as usize)
    }

    /// Resolve a logical identity to its authoritative page.
    pub fn resolve(&self, key: &PageKey) -> Option<PageId> {
        self.by_key.get(key).copied()
    }

    /// Set a page's rotation. Returns whether the value changed.
    pub fn set_rotation(&mut self, id: PageId, rotation: Rotation) -> bool {
        match self.pages.get_mut(id.0 as usize) {
            Some(p) if p.rotation != rotation => {
                p.rotation = rotation;
                true
            }
            _ => false,
        }
    }

    /// Rotate a page one step clockwise or counter-clockwise.
    pub fn rotate(&mut self, id: PageId, clockwise: bool) -> bool {
        if let Some(p) = self.pages.get_mut(id.0 as usize) {
            p.rotation = if clockwise {
                p.rotation.rotated_cw()
            } else {
                p.rotation.rotated_ccw()
            };
            true
        } else {
            false
        }
    }

    /// Set a page's deleted flag. Returns whether the value changed.
    pub fn set_deleted(&mut self, id: PageId, deleted: bool) -> bool {
        match self.pages.get_mut(id.0 as usize) {
            Some(p) if p.deleted != deleted => {
                p.deleted = deleted;
                true
            }
            _ => false,
        }
    }

    /// Mark a page as viewed.
    pub fn set_viewed(&mut self, id: PageId) {
        if let Some(p) = self.pages.get_mut(id.0 as usize) {
            p.viewed = true;
        }
    }

    /// Allocate a fresh holder identity for reference counting.
    pub fn new_holder(&mut self) -> HolderId {
        let id = HolderId(self.next_holder);
        self.next_holder += 1;
        id
    }

    /// Add a holder reference to a page.
    pub fn add_reference(&mut self, id: PageId, holder: HolderId) -> bool {
        self.pages
            .get_mut(id.0 as usize)
            .map(|p| p.add_reference(holder))
            .unwrap_or(false)
    }

    /// Release a holder reference from a page.
    pub fn release_reference(&mut self, id: PageId, holder: HolderId) -> bool {
        self.pages
            .get_mut(id.0 as usize)
            .map(|p| p.release_reference(holder))
            .unwrap_or(false)
    }

    /// Whether a source may be released: no page of it is still referenced.
    pub fn source_releasable(&self, id: SourceId) -> bool {
        match self.source(id) {
            Some(s) => s.pages.iter().all(|p| {
                self.page(*p)
                    .map(|page| !page.is_referenced())
                    .unwrap_or(true)
            }),
            None => true,
        }
    }

    /// Restore every page of a source to its pristine state.
    pub fn reset_source(&mut self, id: SourceId) {
        let pages = match self.source(id) {
            Some(s) => s.pages.clone(),
            None => return,
        };
        for p in pages {
            if let Some(page) = self.pages.get_mut(p.0 as usize) {
                page.rotation = Rotation::R0;
                page.deleted = false;
            }
        }
    }
}
