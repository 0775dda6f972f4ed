//! The pagination sequence: one ordered list of page and separator elements
//! representing all loaded documents.
//!
//! Document membership is recomputed from element order after every
//! mutation, never stored as authoritative cross-links: a document is the
//! maximal run of page instances between two separators. Split and merge
//! fall out of that rule — inserting a separator inside a run moves the
//! trailing pages into a new document, removing a separator folds its run
//! into the preceding document.

mod element;

pub use element::{Element, ElementId, PageInstance, Separator};

use crate::error::{Error, Result};
use crate::model::{DocId, OutputDocument, PageId, PageStore, Rotation};
use crate::notify::Notification;
use std::collections::{HashMap, HashSet};

/// Ceiling on concurrently-loaded page instances.
///
/// Enforced on the default load path ([`Position::End`]); explicit positions
/// may exceed it because their callers validate a smaller, bounded operation
/// first.
pub const MAX_LOADED_PAGES: usize = 1000;

/// Where to insert an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// At this element index (clamped to the area before the sentinel).
    At(usize),

    /// Append, keeping the load-next sentinel last. Enforces the page
    /// ceiling for page insertions.
    End,
}

/// A maximal run: one optional opening separator plus following page indices.
struct Run {
    sep: Option<usize>,
    pages: Vec<usize>,
}

/// The ordered element sequence plus the document arena derived from it.
#[derive(Debug, Default)]
pub struct Sequence {
    elements: Vec<Element>,
    docs: Vec<Option<OutputDocument>>,
    next_id: u32,
}

impl Sequence {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&mut self) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Number of elements, sentinel included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the sequence holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate elements in order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// Element by identity.
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.index_of(id).map(|i| &self.elements[i])
    }

    /// Position of an element, by identity.
    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id() == id)
    }

    /// Element at a position.
    pub fn at(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    /// Number of live page instances.
    pub fn page_instance_count(&self) -> usize {
        self.elements.iter().filter(|e| e.is_page()).count()
    }

    /// Number of instances referencing one page.
    pub fn instance_count_of(&self, page: PageId) -> usize {
        self.elements
            .iter()
            .filter(|e| e.as_page().map(|p| p.page == page).unwrap_or(false))
            .count()
    }

    /// The page referenced by an element, if it is a page instance.
    pub fn page_of(&self, id: ElementId) -> Option<PageId> {
        self.element(id).and_then(|e| e.as_page()).map(|p| p.page)
    }

    /// Index where [`Position::End`] lands: before the sentinel, if present.
    fn end_index(&self) -> usize {
        match self.elements.last() {
            Some(Element::LoadNext { .. }) => self.elements.len() - 1,
            _ => self.elements.len(),
        }
    }

    fn resolve_index(&self, pos: Position) -> usize {
        match pos {
            Position::At(i) => i.min(self.end_index()),
            Position::End => self.end_index(),
        }
    }

    /// Insert a page instance.
    ///
    /// `Position::End` fails with [`Error::CapacityExceeded`] once
    /// [`MAX_LOADED_PAGES`] instances are loaded; the sequence is left
    /// unchanged.
    pub fn insert_page(&mut self, page: PageId, pos: Position) -> Result<ElementId> {
        if matches!(pos, Position::End) && self.page_instance_count() >= MAX_LOADED_PAGES {
            return Err(Error::CapacityExceeded {
                limit: MAX_LOADED_PAGES,
            });
        }
        let index = self.resolve_index(pos);
        let id = self.alloc_id();
        self.elements.insert(
            index,
            Element::Page(PageInstance {
                id,
                page,
                doc: None,
                doc_page_index: 0,
            }),
        );
        Ok(id)
    }

    /// Insert a separator.
    ///
    /// Rejected with [`Error::InvalidAdjacency`] when either neighbor is
    /// already a separator; callers treat that as a no-op signal.
    pub fn insert_separator(&mut self, pos: Position) -> Result<ElementId> {
        let index = self.resolve_index(pos);
        if index > 0 && self.elements[index - 1].is_separator() {
            return Err(Error::InvalidAdjacency);
        }
        if let Some(next) = self.elements.get(index) {
            if next.is_separator() {
                return Err(Error::InvalidAdjacency);
            }
        }
        let id = self.alloc_id();
        self.elements
            .insert(index, Element::Separator(Separator { id, doc: None }));
        Ok(id)
    }

    /// Add or remove the trailing load-next sentinel.
    pub fn set_load_next(&mut self, present: bool) -> Option<ElementId> {
        let has = matches!(self.elements.last(), Some(Element::LoadNext { .. }));
        match (present, has) {
            (true, false) => {
                let id = self.alloc_id();
                self.elements.push(Element::LoadNext { id });
                Some(id)
            }
            (false, true) => {
                self.elements.pop();
                None
            }
            _ => None,
        }
    }

    /// Remove an element by identity, returning it.
    pub fn remove(&mut self, id: ElementId) -> Result<Element> {
        let index = self.index_of(id).ok_or(Error::ElementNotFound)?;
        Ok(self.elements.remove(index))
    }

    /// Move an element to a new position (remove + insert in one step).
    ///
    /// A separator move that would create adjacent separators is rolled back
    /// and rejected with [`Error::InvalidAdjacency`].
    pub fn move_element(&mut self, id: ElementId, pos: Position) -> Result<()> {
        let old_index = self.index_of(id).ok_or(Error::ElementNotFound)?;
        let element = self.elements.remove(old_index);
        let index = self.resolve_index(pos);
        if element.is_separator() {
            let prev_sep = index > 0 && self.elements[index - 1].is_separator();
            let next_sep = self
                .elements
                .get(index)
                .map(|e| e.is_separator())
                .unwrap_or(false);
            if prev_sep || next_sep {
                self.elements.insert(old_index.min(self.elements.len()), element);
                return Err(Error::InvalidAdjacency);
            }
        }
        self.elements.insert(index, element);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    fn doc_alive(&self, id: DocId) -> bool {
        self.docs
            .get(id.0 as usize)
            .map(|s| s.is_some())
            .unwrap_or(false)
    }

    fn create_document(&mut self, filename: String, original: Vec<(PageId, Rotation)>) -> DocId {
        let id = DocId(self.docs.len() as u32);
        self.docs
            .push(Some(OutputDocument::new(id, filename, original)));
        id
    }

    /// Get a document.
    pub fn document(&self, id: DocId) -> Option<&OutputDocument> {
        self.docs.get(id.0 as usize).and_then(|s| s.as_ref())
    }

    /// Get a document mutably.
    pub fn document_mut(&mut self, id: DocId) -> Option<&mut OutputDocument> {
        self.docs.get_mut(id.0 as usize).and_then(|s| s.as_mut())
    }

    /// Iterate live documents in sequence order.
    pub fn documents(&self) -> impl Iterator<Item = &OutputDocument> {
        // Sequence order, not arena order: walk elements and emit each
        // document the first time its run appears.
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for el in &self.elements {
            if let Some(d) = el.document() {
                if seen.insert(d) {
                    if let Some(doc) = self.document(d) {
                        ordered.push(doc);
                    }
                }
            }
        }
        ordered.into_iter()
    }

    /// The document containing (or opened by) an element.
    pub fn document_of(&self, id: ElementId) -> Option<DocId> {
        self.element(id).and_then(|e| e.document())
    }

    /// (page, rotation) pairs of a document's instances in order.
    pub fn document_page_states(&self, id: DocId, store: &PageStore) -> Vec<(PageId, Rotation)> {
        let Some(doc) = self.document(id) else {
            return Vec::new();
        };
        doc.pages
            .iter()
            .filter_map(|e| self.page_of(*e))
            .filter_map(|p| store.page(p).map(|pg| (p, pg.rotation)))
            .collect()
    }

    /// Non-deleted page instances of a document, in order.
    pub fn live_instances(&self, id: DocId, store: &PageStore) -> Vec<ElementId> {
        let Some(doc) = self.document(id) else {
            return Vec::new();
        };
        doc.pages
            .iter()
            .copied()
            .filter(|e| {
                self.page_of(*e)
                    .and_then(|p| store.page(p))
                    .map(|pg| !pg.deleted)
                    .unwrap_or(false)
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Derived-state maintenance
    // ------------------------------------------------------------------

    fn runs(&self) -> Vec<Run> {
        let mut runs = Vec::new();
        let mut cur: Option<Run> = None;
        for (i, el) in self.elements.iter().enumerate() {
            match el {
                Element::Separator(_) => {
                    if let Some(r) = cur.take() {
                        runs.push(r);
                    }
                    cur = Some(Run {
                        sep: Some(i),
                        pages: Vec::new(),
                    });
                }
                Element::Page(_) => match &mut cur {
                    Some(r) => r.pages.push(i),
                    None => {
                        cur = Some(Run {
                            sep: None,
                            pages: vec![i],
                        })
                    }
                },
                Element::LoadNext { .. } => {}
            }
        }
        if let Some(r) = cur {
            runs.push(r);
        }
        runs
    }

    /// Remove redundant elements: documents whose every instance is a
    /// deleted ghost, and separators left with an empty run (except the
    /// transient one standing before the load-next sentinel).
    ///
    /// Returns whether anything was removed.
    pub fn cleanup(&mut self, store: &PageStore) -> bool {
        let mut remove_ids: Vec<ElementId> = Vec::new();

        for run in self.runs() {
            if run.pages.is_empty() {
                continue;
            }
            let all_ghosts = run.pages.iter().all(|&i| {
                self.elements[i]
                    .as_page()
                    .and_then(|p| store.page(p.page))
                    .map(|pg| pg.deleted)
                    .unwrap_or(false)
            });
            if all_ghosts {
                for &i in &run.pages {
                    remove_ids.push(self.elements[i].id());
                }
            }
        }
        let mut changed = !remove_ids.is_empty();
        for id in remove_ids {
            let _ = self.remove(id);
        }

        // Drop separators with no trailing pages, keeping only the one
        // directly before the sentinel (transient, doc = None).
        loop {
            let mut redundant = None;
            for run in self.runs() {
                if !run.pages.is_empty() {
                    continue;
                }
                if let Some(si) = run.sep {
                    let next_is_sentinel = matches!(
                        self.elements.get(si + 1),
                        Some(Element::LoadNext { .. })
                    );
                    if !next_is_sentinel {
                        redundant = Some(self.elements[si].id());
                        break;
                    }
                }
            }
            match redundant {
                Some(id) => {
                    log::debug!("removing redundant separator {id:?}");
                    let _ = self.remove(id);
                    changed = true;
                }
                None => break,
            }
        }
        changed
    }

    /// Recompute document membership from element order.
    ///
    /// Identity rules keep split and merge stable: a run first reclaims the
    /// document recorded on its separator, then the document of its first
    /// previously-assigned instance; a run that can claim neither gets a new
    /// document named after its first page's source. Documents no run claims
    /// are disposed. A document whose first page changed has its filename
    /// regenerated from the new first page's source name.
    pub fn recompute_membership(&mut self, store: &PageStore) -> Vec<Notification> {
        let mut notes = Vec::new();

        // Snapshot the previous assignment for identity reuse and change
        // detection.
        let mut prev_doc_of: HashMap<ElementId, DocId> = HashMap::new();
        for el in &self.elements {
            if let Element::Page(p) = el {
                if let Some(d) = p.doc {
                    prev_doc_of.insert(p.id, d);
                }
            }
        }
        let mut prev_first: HashMap<DocId, Option<PageId>> = HashMap::new();
        let mut prev_pages: HashMap<DocId, Vec<ElementId>> = HashMap::new();
        for slot in self.docs.iter().flatten() {
            let first = slot.pages.first().and_then(|e| self.page_of(*e));
            prev_first.insert(slot.id, first);
            prev_pages.insert(slot.id, slot.pages.clone());
        }

        let runs = self.runs();
        let mut claimed: HashSet<DocId> = HashSet::new();
        let mut fresh: HashSet<DocId> = HashSet::new();
        let mut assigns: Vec<(usize, DocId)> = Vec::new();

        for (ri, run) in runs.iter().enumerate() {
            if run.pages.is_empty() {
                // Transient separator (for example before the sentinel):
                // carries no document and joins no document operation.
                if let Some(si) = run.sep {
                    if let Element::Separator(s) = &mut self.elements[si] {
                        s.doc = None;
                    }
                }
                continue;
            }

            let mut chosen: Option<DocId> = None;
            if let Some(si) = run.sep {
                if let Element::Separator(s) = &self.elements[si] {
                    if let Some(d) = s.doc {
                        if self.doc_alive(d) && !claimed.contains(&d) {
                            chosen = Some(d);
                        }
                    }
                }
            }
            if chosen.is_none() {
                // Tie-break: a fresh instance standing after a bare
                // separator joins the following document instead of
                // spawning an empty one.
                for &pi in &run.pages {
                    if let Element::Page(p) = &self.elements[pi] {
                        if let Some(d) = prev_doc_of.get(&p.id) {
                            if self.doc_alive(*d) && !claimed.contains(d) {
                                chosen = Some(*d);
                                break;
                            }
                        }
                    }
                }
            }
            let doc_id = match chosen {
                Some(d) => d,
                None => {
                    let states: Vec<(PageId, Rotation)> = run
                        .pages
                        .iter()
                        .filter_map(|&i| self.elements[i].as_page().map(|p| p.page))
                        .filter_map(|p| store.page(p).map(|pg| (p, pg.rotation)))
                        .collect();
                    let filename = states
                        .first()
                        .and_then(|(p, _)| store.page(*p))
                        .map(|pg| pg.key.source.clone())
                        .unwrap_or_default();
                    let d = self.create_document(filename, states);
                    fresh.insert(d);
                    notes.push(Notification::DocumentCreated(d));
                    d
                }
            };
            claimed.insert(doc_id);
            assigns.push((ri, doc_id));
        }

        for (ri, doc_id) in assigns {
            let run = &runs[ri];
            let mut page_elems = Vec::with_capacity(run.pages.len());
            let mut first_page = None;
            for (ord, &pi) in run.pages.iter().enumerate() {
                if let Element::Page(p) = &mut self.elements[pi] {
                    p.doc = Some(doc_id);
                    p.doc_page_index = ord;
                    if ord == 0 {
                        first_page = Some(p.page);
                    }
                    page_elems.push(p.id);
                }
            }
            let sep_id = run.sep.map(|si| {
                if let Element::Separator(s) = &mut self.elements[si] {
                    s.doc = Some(doc_id);
                }
                self.elements[si].id()
            });

            let was_fresh = fresh.contains(&doc_id);
            let first_changed = prev_first.get(&doc_id).copied().flatten() != first_page;
            let pages_changed = prev_pages.get(&doc_id) != Some(&page_elems);
            let new_name = if !was_fresh && first_changed {
                first_page
                    .and_then(|p| store.page(p))
                    .map(|pg| pg.key.source.clone())
            } else {
                None
            };

            if let Some(doc) = self.docs.get_mut(doc_id.0 as usize).and_then(|s| s.as_mut()) {
                doc.pages = page_elems;
                doc.separator = sep_id;
                if let Some(name) = new_name {
                    log::debug!("document {doc_id:?} renamed to {name}");
                    doc.filename = name;
                }
                if !was_fresh && pages_changed {
                    notes.push(Notification::DocumentChanged(doc_id));
                }
            }
        }

        debug_assert!(
            self.elements
                .iter()
                .all(|e| !e.is_page() || e.document().is_some()),
            "every page instance must belong to a document after recompute"
        );

        // Dispose documents no run claimed.
        for i in 0..self.docs.len() {
            let d = DocId(i as u32);
            if self.docs[i].is_some() && !claimed.contains(&d) {
                self.docs[i] = None;
                notes.push(Notification::DocumentRemoved(d));
            }
        }

        notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageKey;

    fn store_with(sources: &[(&str, u32)]) -> PageStore {
        let mut store = PageStore::new();
        for (name, count) in sources {
            store.open_source(name, *count);
        }
        store
    }

    fn load(seq: &mut Sequence, store: &PageStore, name: &str, count: u32) -> Vec<ElementId> {
        seq.insert_separator(Position::End).unwrap();
        let mut ids = Vec::new();
        for n in 1..=count {
            let page = store.resolve(&PageKey::new(name, n)).unwrap();
            ids.push(seq.insert_page(page, Position::End).unwrap());
        }
        ids
    }

    #[test]
    fn test_load_two_sources_forms_two_documents() {
        let store = store_with(&[("a.tif", 3), ("b.tif", 2)]);
        let mut seq = Sequence::new();
        load(&mut seq, &store, "a.tif", 3);
        load(&mut seq, &store, "b.tif", 2);
        seq.recompute_membership(&store);

        let docs: Vec<_> = seq.documents().collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].page_count(), 3);
        assert_eq!(docs[1].page_count(), 2);
        assert_eq!(docs[0].filename, "a.tif");
        assert_eq!(docs[1].filename, "b.tif");

        // Invariant: every instance's doc matches its run.
        for el in seq.elements() {
            if let Some(p) = el.as_page() {
                assert!(p.doc.is_some());
            }
        }
    }

    #[test]
    fn test_split_creates_new_document() {
        let store = store_with(&[("a.tif", 3)]);
        let mut seq = Sequence::new();
        let pages = load(&mut seq, &store, "a.tif", 3);
        seq.recompute_membership(&store);
        let original_doc = seq.document_of(pages[0]).unwrap();

        // Separator before page 2 splits [1] / [2, 3].
        let idx = seq.index_of(pages[1]).unwrap();
        seq.insert_separator(Position::At(idx)).unwrap();
        let notes = seq.recompute_membership(&store);

        assert!(notes
            .iter()
            .any(|n| matches!(n, Notification::DocumentCreated(_))));
        let first = seq.document_of(pages[0]).unwrap();
        let second = seq.document_of(pages[1]).unwrap();
        assert_eq!(first, original_doc);
        assert_ne!(first, second);
        assert_eq!(seq.document(first).unwrap().page_count(), 1);
        assert_eq!(seq.document(second).unwrap().page_count(), 2);
        assert_eq!(seq.document_of(pages[2]).unwrap(), second);
    }

    #[test]
    fn test_split_then_merge_is_inverse() {
        let store = store_with(&[("a.tif", 3)]);
        let mut seq = Sequence::new();
        let pages = load(&mut seq, &store, "a.tif", 3);
        seq.recompute_membership(&store);
        let doc = seq.document_of(pages[0]).unwrap();
        let before: Vec<_> = seq.document(doc).unwrap().pages.clone();

        let idx = seq.index_of(pages[1]).unwrap();
        let sep = seq.insert_separator(Position::At(idx)).unwrap();
        seq.recompute_membership(&store);
        assert_eq!(seq.document(doc).unwrap().page_count(), 1);

        seq.remove(sep).unwrap();
        let notes = seq.recompute_membership(&store);

        assert!(notes
            .iter()
            .any(|n| matches!(n, Notification::DocumentRemoved(_))));
        let after = seq.document(doc).unwrap();
        assert_eq!(after.pages, before);
        for p in &pages {
            assert_eq!(seq.document_of(*p).unwrap(), doc);
        }
    }

    #[test]
    fn test_remove_separator_merges_into_preceding() {
        let store = store_with(&[("a.tif", 2), ("b.tif", 2)]);
        let mut seq = Sequence::new();
        let a = load(&mut seq, &store, "a.tif", 2);
        let b = load(&mut seq, &store, "b.tif", 2);
        seq.recompute_membership(&store);
        let doc_a = seq.document_of(a[0]).unwrap();
        let doc_b = seq.document_of(b[0]).unwrap();
        assert_ne!(doc_a, doc_b);

        let sep_b = seq.document(doc_b).unwrap().separator.unwrap();
        seq.remove(sep_b).unwrap();
        seq.recompute_membership(&store);

        assert_eq!(seq.document_of(b[0]).unwrap(), doc_a);
        assert_eq!(seq.document_of(b[1]).unwrap(), doc_a);
        assert_eq!(seq.document(doc_a).unwrap().page_count(), 4);
        assert!(seq.document(doc_b).is_none());
    }

    #[test]
    fn test_adjacent_separator_rejected() {
        let store = store_with(&[("a.tif", 1)]);
        let mut seq = Sequence::new();
        load(&mut seq, &store, "a.tif", 1);
        seq.recompute_membership(&store);
        let len = seq.len();

        // Directly after the existing separator at index 0.
        let result = seq.insert_separator(Position::At(0));
        assert!(matches!(result, Err(Error::InvalidAdjacency)));
        let result = seq.insert_separator(Position::At(1));
        assert!(matches!(result, Err(Error::InvalidAdjacency)));
        assert_eq!(seq.len(), len);
    }

    #[test]
    fn test_capacity_enforced_at_end_only() {
        let store = store_with(&[("big.tif", 1)]);
        let page = store.resolve(&PageKey::new("big.tif", 1)).unwrap();
        let mut seq = Sequence::new();
        seq.insert_separator(Position::End).unwrap();
        for _ in 0..MAX_LOADED_PAGES {
            seq.insert_page(page, Position::End).unwrap();
        }
        let len = seq.len();

        let result = seq.insert_page(page, Position::End);
        assert!(matches!(result, Err(Error::CapacityExceeded { limit: MAX_LOADED_PAGES })));
        assert_eq!(seq.len(), len, "failed insert must leave sequence unchanged");

        // Explicit position bypasses the ceiling (caller already validated).
        seq.insert_page(page, Position::At(1)).unwrap();
        assert_eq!(seq.page_instance_count(), MAX_LOADED_PAGES + 1);
    }

    #[test]
    fn test_sentinel_stays_last() {
        let store = store_with(&[("a.tif", 1)]);
        let page = store.resolve(&PageKey::new("a.tif", 1)).unwrap();
        let mut seq = Sequence::new();
        seq.set_load_next(true);
        seq.insert_separator(Position::End).unwrap();
        seq.insert_page(page, Position::End).unwrap();

        assert!(seq.at(seq.len() - 1).unwrap().is_load_next());
        assert!(seq.at(0).unwrap().is_separator());
    }

    #[test]
    fn test_transient_separator_has_no_document() {
        let store = store_with(&[("a.tif", 1)]);
        let mut seq = Sequence::new();
        load(&mut seq, &store, "a.tif", 1);
        seq.insert_separator(Position::End).unwrap();
        seq.set_load_next(true);
        seq.recompute_membership(&store);

        let last_sep = seq
            .elements()
            .filter_map(|e| e.as_separator())
            .last()
            .unwrap();
        assert_eq!(last_sep.doc, None);
    }

    #[test]
    fn test_instance_joins_following_document() {
        // A page inserted between a bare separator and an existing run must
        // join the following document rather than spawn a new one.
        let store = store_with(&[("a.tif", 2)]);
        let mut seq = Sequence::new();
        let pages = load(&mut seq, &store, "a.tif", 2);
        seq.recompute_membership(&store);
        let doc = seq.document_of(pages[0]).unwrap();

        let extra = store.resolve(&PageKey::new("a.tif", 1)).unwrap();
        let inserted = seq.insert_page(extra, Position::At(1)).unwrap();
        let notes = seq.recompute_membership(&store);

        assert!(!notes
            .iter()
            .any(|n| matches!(n, Notification::DocumentCreated(_))));
        assert_eq!(seq.document_of(inserted).unwrap(), doc);
        assert_eq!(seq.document(doc).unwrap().page_count(), 3);
    }

    #[test]
    fn test_filename_regenerated_when_first_page_changes() {
        let store = store_with(&[("a.tif", 1), ("b.tif", 1)]);
        let mut seq = Sequence::new();
        let a = load(&mut seq, &store, "a.tif", 1);
        seq.recompute_membership(&store);
        let doc = seq.document_of(a[0]).unwrap();
        assert_eq!(seq.document(doc).unwrap().filename, "a.tif");

        // Prepend a page from b.tif; the document's first page changes.
        let b1 = store.resolve(&PageKey::new("b.tif", 1)).unwrap();
        seq.insert_page(b1, Position::At(1)).unwrap();
        seq.recompute_membership(&store);

        assert_eq!(seq.document(doc).unwrap().filename, "b.tif");
    }

    #[test]
    fn test_cleanup_removes_ghost_documents() {
        let mut store = store_with(&[("a.tif", 2), ("b.tif", 1)]);
        let mut seq = Sequence::new();
        let a = load(&mut seq, &store, "a.tif", 2);
        load(&mut seq, &store, "b.tif", 1);
        seq.recompute_membership(&store);
        let doc_a = seq.document_of(a[0]).unwrap();

        for n in 1..=2 {
            let p = store.resolve(&PageKey::new("a.tif", n)).unwrap();
            store.set_deleted(p, true);
        }
        assert!(seq.cleanup(&store));
        seq.recompute_membership(&store);

        assert!(seq.document(doc_a).is_none());
        assert_eq!(seq.documents().count(), 1);
        // The emptied separator went with its run.
        let seps = seq.elements().filter(|e| e.is_separator()).count();
        assert_eq!(seps, 1);
    }

    #[test]
    fn test_cleanup_keeps_partial_ghosts() {
        let mut store = store_with(&[("a.tif", 2)]);
        let mut seq = Sequence::new();
        load(&mut seq, &store, "a.tif", 2);
        seq.recompute_membership(&store);

        let p1 = store.resolve(&PageKey::new("a.tif", 1)).unwrap();
        store.set_deleted(p1, true);
        assert!(!seq.cleanup(&store));
        assert_eq!(seq.page_instance_count(), 2);
    }

    #[test]
    fn test_move_element_reorders() {
        let store = store_with(&[("a.tif", 3)]);
        let mut seq = Sequence::new();
        let pages = load(&mut seq, &store, "a.tif", 3);
        seq.recompute_membership(&store);
        let doc = seq.document_of(pages[0]).unwrap();

        // Move page 3 to the front of the run.
        seq.move_element(pages[2], Position::At(1)).unwrap();
        seq.recompute_membership(&store);

        let states = seq.document_page_states(doc, &store);
        let numbers: Vec<u32> = states
            .iter()
            .map(|(p, _)| store.page(*p).unwrap().key.number)
            .collect();
        assert_eq!(numbers, vec![3, 1, 2]);
    }
}
