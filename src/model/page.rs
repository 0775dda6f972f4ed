//! Page-level types.
//!
//! A [`Page`] is the atomic unit of content: one page of one source file.
//! There is exactly one authoritative `Page` per (source, page number)
//! identity; every occurrence of that page in the sequence is a separate
//! instance referencing it through its [`PageId`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Stable arena index of a [`Page`] inside the page store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub(crate) u32);

/// Stable arena index of a source document inside the page store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub(crate) u32);

/// Identity of a clipboard (or other) holder keeping pages referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HolderId(pub(crate) u32);

/// Logical identity of a page: source document name plus 1-indexed number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageKey {
    /// Originating source document name.
    pub source: String,

    /// Page number within the source (1-indexed).
    pub number: u32,
}

impl PageKey {
    /// Create a new page key.
    pub fn new(source: impl Into<String>, number: u32) -> Self {
        Self {
            source: source.into(),
            number,
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.source, self.number)
    }
}

/// Page rotation, always a multiple of 90 degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    /// No rotation.
    #[default]
    R0,
    /// 90 degrees clockwise.
    R90,
    /// 180 degrees.
    R180,
    /// 270 degrees clockwise.
    R270,
}

impl Rotation {
    /// Rotation in degrees (0, 90, 180, 270).
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Construct from degrees; accepts any multiple of 90.
    pub fn from_degrees(degrees: u16) -> Self {
        match degrees % 360 {
            90 => Rotation::R90,
            180 => Rotation::R180,
            270 => Rotation::R270,
            _ => Rotation::R0,
        }
    }

    /// One step clockwise.
    pub fn rotated_cw(self) -> Self {
        match self {
            Rotation::R0 => Rotation::R90,
            Rotation::R90 => Rotation::R180,
            Rotation::R180 => Rotation::R270,
            Rotation::R270 => Rotation::R0,
        }
    }

    /// One step counter-clockwise.
    pub fn rotated_ccw(self) -> Self {
        match self {
            Rotation::R0 => Rotation::R270,
            Rotation::R90 => Rotation::R0,
            Rotation::R180 => Rotation::R90,
            Rotation::R270 => Rotation::R180,
        }
    }
}

/// The authoritative record for one source page.
///
/// Created when its source document is opened and destroyed only when the
/// source is disposed, never while any instance or clipboard holder still
/// references it.
#[derive(Debug, Clone)]
pub struct Page {
    /// Logical identity.
    pub key: PageKey,

    /// Owning source document.
    pub source: SourceId,

    /// Current rotation.
    pub rotation: Rotation,

    /// Whether the page is marked deleted.
    pub deleted: bool,

    /// Whether the page has been displayed to the operator.
    pub viewed: bool,

    /// Holders currently referencing this page (counting only, no ownership).
    refs: HashSet<HolderId>,
}

impl Page {
    /// Create a fresh, pristine page.
    pub fn new(key: PageKey, source: SourceId) -> Self {
        Self {
            key,
            source,
            rotation: Rotation::R0,
            deleted: false,
            viewed: false,
            refs: HashSet::new(),
        }
    }

    /// Whether any holder still references this page.
    pub fn is_referenced(&self) -> bool {
        !self.refs.is_empty()
    }

    /// Number of active references.
    pub fn reference_count(&self) -> usize {
        self.refs.len()
    }

    /// Register a holder. Returns `false` if the holder was already counted.
    pub(crate) fn add_reference(&mut self, holder: HolderId) -> bool {
        self.refs.insert(holder)
    }

    /// Drop a holder's reference. Returns `false` if it was not counted.
    pub(crate) fn release_reference(&mut self, holder: HolderId) -> bool {
        self.refs.remove(&holder)
    }

    /// True when the page is exactly as loaded: unrotated and not deleted.
    pub fn is_pristine(&self) -> bool {
        self.rotation == Rotation::R0 && !self.deleted
    }
}
