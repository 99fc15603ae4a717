//! Command definitions
//!
//! One parsed script line.

use crate::bookmark::BookmarkId;
use crate::cursor::SeekOrigin;
use crate::key::{Column, ObjectKey, SortKey};

/// Bookmark sub-commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkOp {
    Create,
    Free(BookmarkId),
    Get(BookmarkId),
}

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Add or move a row
    Upsert {
        id: ObjectKey,
        key: SortKey,
        hidden: bool,
    },

    /// Replace one sort column of a row
    Partial {
        id: ObjectKey,
        column_index: usize,
        column: Column,
        hidden: bool,
    },

    /// Remove a row
    Delete { id: ObjectKey },

    /// Move the cursor by position
    Seek {
        origin: SeekOrigin,
        offset: i32,
        bookmark: Option<BookmarkId>,
    },

    /// Move the cursor onto a row
    SeekId { id: ObjectKey },

    /// Page rows from the cursor
    Query {
        count: u32,
        backward: bool,
        include_hidden: bool,
    },

    /// Visible total and cursor ordinal
    Count,

    Bookmark(BookmarkOp),

    Hide { ids: Vec<ObjectKey> },

    Unhide { ids: Vec<ObjectKey> },

    /// Exact sort key match
    Find { key: SortKey },

    /// First row not less than a sort key
    LowerBound { key: SortKey },

    /// Rows sharing a row's sort key as prefix
    Prefix { id: ObjectKey },

    Clear,

    /// Structural self-check
    Check,
}
