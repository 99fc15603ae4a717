//! Cursor state
//!
//! ```text
//!            seek forward onto a row
//!   Before ─────────────────────────▶ OnRow(n) ──── seek past last ───▶ After
//!     ▲                                 │  ▲                              │
//!     └──── backward past first ────────┘  └──── seek back onto a row ────┘
//! ```
//! Deleting the row under `OnRow(n)` moves to its successor, or `After`.

use crate::tree::{NodeId, Tree};

/// Where a relative seek is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    /// From the first visible row
    Set,
    /// From the cursor, or from a bookmark when one is given
    Current,
    /// From one past the last visible row
    End,
}

/// Cursor position within the ordered rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Before,
    OnRow(NodeId),
    After,
}

impl Cursor {
    /// Visible rows in front of this position
    pub fn ordinal(&self, tree: &Tree) -> u32 {
        match *self {
            Cursor::Before => 0,
            Cursor::OnRow(n) => tree.visible_ordinal(n),
            Cursor::After => tree.len() as u32 - tree.hidden_len(),
        }
    }

    /// Cursor for a visible position in `0..=visible_total`
    pub fn at_position(tree: &Tree, position: u32) -> Self {
        match tree.select(position, false) {
            Some(n) => Cursor::OnRow(n),
            None if tree.len() as u32 == tree.hidden_len() => Cursor::Before,
            None => Cursor::After,
        }
    }

    pub fn node(&self) -> Option<NodeId> {
        match *self {
            Cursor::OnRow(n) => Some(n),
            _ => None,
        }
    }
}
