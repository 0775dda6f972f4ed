//! Selection state machine over the pagination sequence.
//!
//! Tracks the primary selection (drives page display and keyboard
//! navigation), the shift-range anchor, the command target (subject of
//! context commands, which can differ from the primary right after a context
//! activation), and the selection set itself. Selecting a separator always
//! selects every page of its document and vice versa; the primary selection
//! resolves to a page, never a bare separator, whenever the document offers
//! a candidate.

use crate::model::DocId;
use crate::notify::Notification;
use crate::sequence::{Element, ElementId, Sequence};
use std::collections::{HashMap, HashSet};

/// Keyboard modifiers accompanying a selection gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Control held: existing selection is kept and toggled.
    pub control: bool,

    /// Shift held: the span from the anchor to the active element joins.
    pub shift: bool,
}

impl Modifiers {
    /// No modifiers held.
    pub const NONE: Modifiers = Modifiers {
        control: false,
        shift: false,
    };

    /// Control only.
    pub const CONTROL: Modifiers = Modifiers {
        control: true,
        shift: false,
    };

    /// Shift only.
    pub const SHIFT: Modifiers = Modifiers {
        control: false,
        shift: true,
    };
}

/// Selection, primary-selection, and command-target state.
#[derive(Debug, Default)]
pub struct SelectionState {
    selected: HashSet<ElementId>,
    primary: Option<ElementId>,
    last_selected: Option<ElementId>,
    command_target: Option<ElementId>,
    open_data_panel: Option<DocId>,
    suppress_transient_close: bool,
    last_page_of_doc: HashMap<DocId, ElementId>,
}

impl SelectionState {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// The selected element set.
    pub fn selected(&self) -> &HashSet<ElementId> {
        &self.selected
    }

    /// Whether an element is selected.
    pub fn is_selected(&self, id: ElementId) -> bool {
        self.selected.contains(&id)
    }

    /// The primary selection, if any.
    pub fn primary(&self) -> Option<ElementId> {
        self.primary
    }

    /// The current command target.
    pub fn command_target(&self) -> Option<ElementId> {
        self.command_target
    }

    /// Retarget context commands without touching the selection (context
    /// activation on an unselected element).
    pub fn set_command_target(&mut self, target: Option<ElementId>) {
        self.command_target = target;
    }

    /// Pin navigation inside one document while its data panel is open.
    pub fn set_open_data_panel(&mut self, doc: Option<DocId>) {
        self.open_data_panel = doc;
    }

    /// The document whose data panel is open, if any.
    pub fn open_data_panel(&self) -> Option<DocId> {
        self.open_data_panel
    }

    /// Guard against a close/reopen flicker when the same page will be
    /// reselected immediately after a clear.
    pub fn set_suppress_transient_close(&mut self, suppress: bool) {
        self.suppress_transient_close = suppress;
    }

    /// Clear the whole selection.
    pub fn clear(&mut self) -> Vec<Notification> {
        let mut notes = Vec::new();
        if !self.selected.is_empty() {
            self.selected.clear();
            notes.push(Notification::SelectionChanged);
        }
        let previous = self.primary.take();
        if previous.is_some() && !self.suppress_transient_close {
            notes.push(Notification::PrimarySelectionChanged {
                previous,
                current: None,
            });
        }
        notes
    }

    /// Process one selection gesture.
    ///
    /// `active` is the element the gesture lands on; `additional` carries
    /// extra elements the host includes (a marquee, for example); `select`
    /// chooses select versus deselect. Without Control the existing
    /// selection is cleared first; with Shift the sequence span between the
    /// anchor and `active` joins the target set. Separators expand to their
    /// document's pages, and `active` is applied last so it resets the
    /// shift anchor.
    pub fn process_selection(
        &mut self,
        seq: &Sequence,
        active: ElementId,
        additional: &[ElementId],
        select: bool,
        modifiers: Modifiers,
    ) -> Vec<Notification> {
        let mut notes = Vec::new();
        if seq.element(active).is_none() {
            return notes;
        }
        let before = self.selected.clone();
        let prev_primary = self.primary;

        if !modifiers.control {
            self.selected.clear();
        }

        // Gather the target set: additional, then the shift span.
        let mut targets: Vec<ElementId> = Vec::new();
        let mut seen: HashSet<ElementId> = HashSet::new();
        for &id in additional {
            if id != active && seen.insert(id) {
                targets.push(id);
            }
        }
        if modifiers.shift {
            if let Some(anchor) = self.last_selected {
                if anchor != active {
                    if let (Some(a), Some(b)) = (seq.index_of(anchor), seq.index_of(active)) {
                        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                        for i in lo..=hi {
                            if let Some(el) = seq.at(i) {
                                if el.is_load_next() {
                                    continue;
                                }
                                let id = el.id();
                                if id != active && seen.insert(id) {
                                    targets.push(id);
                                }
                            }
                        }
                    }
                }
            }
        }

        // Expand separators to their document's pages (selection of a
        // separator and of its pages are one and the same).
        let mut expanded = targets.clone();
        for id in targets.iter().copied().chain(std::iter::once(active)) {
            if let Some(Element::Separator(s)) = seq.element(id) {
                if let Some(doc) = s.doc.and_then(|d| seq.document(d)) {
                    for page in &doc.pages {
                        if *page != active && seen.insert(*page) {
                            expanded.push(*page);
                        }
                    }
                }
            }
        }

        // Apply to everything but `active` first, then to `active`, so the
        // gesture's element is authoritative for the anchor reset.
        for id in &expanded {
            self.apply(*id, select);
        }
        self.apply(active, select);
        self.last_selected = Some(active);

        // Re-establish the separator/pages selection invariant per document.
        let doc_states: Vec<(ElementId, bool)> = seq
            .documents()
            .filter_map(|doc| {
                doc.separator.map(|sep| {
                    let all = !doc.pages.is_empty()
                        && doc.pages.iter().all(|p| self.selected.contains(p));
                    (sep, all)
                })
            })
            .collect();
        for (sep, all) in doc_states {
            if all {
                self.selected.insert(sep);
            } else {
                self.selected.remove(&sep);
            }
        }

        // Resolve the primary selection. A selected separator retargets to
        // the previously selected page of its document, or its first page.
        let new_primary = if select {
            match seq.element(active) {
                Some(Element::Separator(s)) => match s.doc {
                    Some(d) => {
                        let remembered = self
                            .last_page_of_doc
                            .get(&d)
                            .copied()
                            .filter(|e| seq.document_of(*e) == Some(d))
                            .filter(|e| self.selected.contains(e));
                        remembered
                            .or_else(|| seq.document(d).and_then(|doc| doc.pages.first().copied()))
                            .or(Some(active))
                    }
                    None => Some(active),
                },
                Some(_) => Some(active),
                None => None,
            }
        } else {
            self.primary.filter(|p| self.selected.contains(p))
        };
        self.primary = new_primary;
        self.command_target = Some(active);
        if let Some(p) = new_primary {
            if let Some(d) = seq.element(p).and_then(|e| e.as_page()).and_then(|pi| pi.doc) {
                self.last_page_of_doc.insert(d, p);
            }
        }

        if before != self.selected {
            notes.push(Notification::SelectionChanged);
        }
        if prev_primary != self.primary {
            notes.push(Notification::PrimarySelectionChanged {
                previous: prev_primary,
                current: self.primary,
            });
        }
        notes
    }

    fn apply(&mut self, id: ElementId, select: bool) {
        if select {
            self.selected.insert(id);
        } else {
            self.selected.remove(&id);
        }
    }

    /// Whether an element can be reached by keyboard navigation.
    ///
    /// The sentinel never is; pages of a collapsed document are invisible;
    /// and an open data panel pins navigation inside its document.
    fn navigable(&self, seq: &Sequence, el: &Element) -> bool {
        match el {
            Element::LoadNext { .. } => false,
            Element::Page(p) => {
                if let Some(panel) = self.open_data_panel {
                    if p.doc != Some(panel) {
                        return false;
                    }
                }
                p.doc
                    .and_then(|d| seq.document(d))
                    .map(|doc| !doc.collapsed)
                    .unwrap_or(true)
            }
            Element::Separator(s) => match self.open_data_panel {
                Some(panel) => s.doc == Some(panel),
                None => true,
            },
        }
    }

    /// Next navigable element in the given direction.
    ///
    /// Returns `None` past either end of the sequence; that is "no further
    /// element", not an error.
    pub fn next_navigable(
        &self,
        seq: &Sequence,
        forward: bool,
        from: Option<ElementId>,
    ) -> Option<ElementId> {
        let len = seq.len();
        if len == 0 {
            return None;
        }
        let start = from.and_then(|f| seq.index_of(f));
        let indices: Box<dyn Iterator<Item = usize>> = match (forward, start) {
            (true, Some(i)) => Box::new((i + 1)..len),
            (true, None) => Box::new(0..len),
            (false, Some(i)) => Box::new((0..i).rev()),
            (false, None) => Box::new((0..len).rev()),
        };
        for i in indices {
            if let Some(el) = seq.at(i) {
                if self.navigable(seq, el) {
                    return Some(el.id());
                }
            }
        }
        None
    }

    /// Next document in the given direction, walking page-by-page from the
    /// primary selection until an instance of a different document appears.
    pub fn next_document(
        &self,
        seq: &Sequence,
        forward: bool,
        skip_processed: bool,
    ) -> Option<DocId> {
        let current = self.primary.and_then(|p| seq.document_of(p));
        let mut cursor = self.primary;
        loop {
            cursor = self.next_navigable(seq, forward, cursor);
            let id = cursor?;
            if let Some(p) = seq.element(id).and_then(|e| e.as_page()) {
                if let Some(d) = p.doc {
                    if Some(d) == current {
                        continue;
                    }
                    let committed = seq.document(d).map(|doc| doc.committed).unwrap_or(false);
                    if skip_processed && committed {
                        continue;
                    }
                    return Some(d);
                }
            }
        }
    }

    /// Drop references to elements no longer in the sequence.
    pub(crate) fn prune(&mut self, seq: &Sequence) -> Vec<Notification> {
        let mut notes = Vec::new();
        let len_before = self.selected.len();
        self.selected.retain(|id| seq.element(*id).is_some());
        if self.selected.len() != len_before {
            notes.push(Notification::SelectionChanged);
        }
        if let Some(p) = self.primary {
            if seq.element(p).is_none() {
                self.primary = None;
                notes.push(Notification::PrimarySelectionChanged {
                    previous: Some(p),
                    current: None,
                });
            }
        }
        if let Some(a) = self.last_selected {
            if seq.element(a).is_none() {
                self.last_selected = None;
            }
        }
        if let Some(t) = self.command_target {
            if seq.element(t).is_none() {
                self.command_target = None;
            }
        }
        self.last_page_of_doc
            .retain(|_, e| seq.element(*e).is_some());
        notes
    }

    /// Selected page instances, in sequence order.
    pub fn selected_pages_in_order(&self, seq: &Sequence) -> Vec<ElementId> {
        seq.elements()
            .filter(|e| e.is_page())
            .map(|e| e.id())
            .filter(|id| self.selected.contains(id))
            .collect()
    }
}
