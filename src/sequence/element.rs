//! Sequence elements.

use crate::model::{DocId, PageId};
use serde::{Deserialize, Serialize};

/// Stable identity of a sequence element, independent of its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub(crate) u32);

/// One occurrence of a page within the sequence.
///
/// `doc` and `doc_page_index` are derived from sequence order; they are
/// `None`/stale between a mutation and the next membership recomputation.
#[derive(Debug, Clone)]
pub struct PageInstance {
    /// Element identity.
    pub id: ElementId,

    /// The authoritative page this instance references.
    pub page: PageId,

    /// Containing document, recomputed from position.
    pub doc: Option<DocId>,

    /// Index within the containing document, recomputed from position.
    pub doc_page_index: usize,
}

/// A boundary marker denoting the start of a logical output document.
///
/// A separator with no trailing page instances (for example the one standing
/// before the load-next sentinel) has `doc = None` and never takes part in
/// selection-based document operations.
#[derive(Debug, Clone)]
pub struct Separator {
    /// Element identity.
    pub id: ElementId,

    /// The document formed by the run immediately following this separator.
    pub doc: Option<DocId>,
}

/// One element of the pagination sequence.
///
/// Position in the sequence is the single source of truth for adjacency;
/// elements never store neighbor links.
#[derive(Debug, Clone)]
pub enum Element {
    /// A page occurrence.
    Page(PageInstance),

    /// A document boundary.
    Separator(Separator),

    /// The trailing "load next document" sentinel. At most one, always last.
    LoadNext {
        /// Element identity.
        id: ElementId,
    },
}

impl Element {
    /// Element identity.
    pub fn id(&self) -> ElementId {
        match self {
            Element::Page(p) => p.id,
            Element::Separator(s) => s.id,
            Element::LoadNext { id } => *id,
        }
    }

    /// Check if this element is a page instance.
    pub fn is_page(&self) -> bool {
        matches!(self, Element::Page(_))
    }

    /// Check if this element is a separator.
    pub fn is_separator(&self) -> bool {
        matches!(self, Element::Separator(_))
    }

    /// Check if this element is the load-next sentinel.
    pub fn is_load_next(&self) -> bool {
        matches!(self, Element::LoadNext { .. })
    }

    /// The page instance, if this element is one.
    pub fn as_page(&self) -> Option<&PageInstance> {
        match self {
            Element::Page(p) => Some(p),
            _ => None,
        }
    }

    /// The separator, if this element is one.
    pub fn as_separator(&self) -> Option<&Separator> {
        match self {
            Element::Separator(s) => Some(s),
            _ => None,
        }
    }

    /// Containing (or opened) document of this element, if assigned.
    pub fn document(&self) -> Option<DocId> {
        match self {
            Element::Page(p) => p.doc,
            Element::Separator(s) => s.doc,
            Element::LoadNext { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_variants() {
        let page = Element::Page(PageInstance {
            id: ElementId(1),
            page: PageId(0),
            doc: None,
            doc_page_index: 0,
        });
        assert!(page.is_page());
        assert!(!page.is_separator());
        assert_eq!(page.id(), ElementId(1));
        assert_eq!(page.document(), None);

        let sep = Element::Separator(Separator {
            id: ElementId(2),
            doc: Some(DocId(0)),
        });
        assert!(sep.is_separator());
        assert_eq!(sep.document(), Some(DocId(0)));

        let sentinel = Element::LoadNext { id: ElementId(3) };
        assert!(sentinel.is_load_next());
        assert_eq!(sentinel.document(), None);
    }
}
