//! Core editor types: node identity, caret, selection and caret geometry.
//!
//! Offsets are counted in inline units: one per character, one per inline atom
//! (an inline math node). Never byte offsets.

use std::fmt;
use std::ops::Range;

/// Stable identity of a node in a [`Document`](crate::tree::Document).
///
/// Ids are allocated by the document when a node is first inserted and stay
/// fixed for the node's lifetime, including across attribute and kind changes.
/// They are not persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    /// Placeholder carried by nodes that have not been inserted yet.
    pub const UNASSIGNED: NodeId = NodeId(0);

    pub fn is_assigned(self) -> bool {
        self != Self::UNASSIGNED
    }

    /// Raw numeric value, e.g. for `data-node-id` attributes.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Caret position inside a textblock (paragraph or heading).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Caret {
    /// The textblock the caret sits in.
    pub block: NodeId,
    /// Inline unit offset within the block.
    pub offset: usize,
}

impl Caret {
    pub fn new(block: NodeId, offset: usize) -> Self {
        Self { block, offset }
    }
}

/// Text selection with anchor and head positions inside one textblock.
///
/// The anchor is where the selection started, the head is where the caret is now.
/// They may be in any order - use `start()` and `end()` for ordered bounds.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct Selection {
    pub block: NodeId,
    /// Where selection started
    pub anchor: usize,
    /// Where caret is now
    pub head: usize,
}

impl Selection {
    pub fn new(block: NodeId, anchor: usize, head: usize) -> Self {
        Self {
            block,
            anchor,
            head,
        }
    }

    /// Create a collapsed selection (caret position).
    pub fn collapsed(caret: Caret) -> Self {
        Self::new(caret.block, caret.offset, caret.offset)
    }

    /// Get the start (lower bound) of the selection.
    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Get the end (upper bound) of the selection.
    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Convert to an ordered range.
    pub fn to_range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    /// Caret at the head of the selection.
    pub fn caret(&self) -> Caret {
        Caret::new(self.block, self.head)
    }
}

/// Screen rectangle of the caret, used to anchor popups.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CursorRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CursorRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bottom edge, where a popup below the caret should start.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}
