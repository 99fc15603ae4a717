//! Bookmark table
//!
//! A bookmark remembers a cursor position by holding a weak handle to the row
//! it was created on, so it follows the row as rows are inserted, moved or
//! deleted around it. The ordinal at creation time is kept for diagnostics.
//!
//! When the bookmarked row itself is deleted the handle goes stale and every
//! later use of the bookmark fails with `NotFound`; the bookmark keeps its
//! slot until the caller frees it.

use std::collections::HashMap;

use crate::cursor::Cursor;
use crate::error::{KeyTableError, Result};
use crate::tree::{NodeHandle, Tree};

/// Client-visible bookmark identifier
pub type BookmarkId = u32;

/// First id handed out; 0..=2 are reserved for the begin/current/end sentinels
pub const BOOKMARK_BASE: BookmarkId = 3;

/// What a bookmark points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Before,
    Row(NodeHandle),
    After,
}

/// One saved position
#[derive(Debug, Clone, Copy)]
pub struct Bookmark {
    pub first_row_position: u32,
    pub target: Anchor,
}

/// Bounded map of live bookmarks
pub struct BookmarkTable {
    bookmarks: HashMap<BookmarkId, Bookmark>,
    next_id: BookmarkId,
    limit: usize,
}

impl BookmarkTable {
    pub fn new(limit: usize) -> Self {
        Self {
            bookmarks: HashMap::new(),
            next_id: BOOKMARK_BASE,
            limit,
        }
    }

    /// Save `cursor`; fails once `limit` bookmarks are live
    pub fn create(&mut self, tree: &Tree, cursor: Cursor) -> Result<BookmarkId> {
        if self.bookmarks.len() >= self.limit {
            return Err(KeyTableError::ResourceExhausted { limit: self.limit });
        }

        let target = match cursor {
            Cursor::Before => Anchor::Before,
            Cursor::OnRow(n) => Anchor::Row(tree.handle(n)),
            Cursor::After => Anchor::After,
        };
        let bookmark = Bookmark {
            first_row_position: cursor.ordinal(tree),
            target,
        };

        // After wrapping, skip ids still held by old bookmarks
        let mut id = self.next_id;
        while self.bookmarks.contains_key(&id) {
            id = following(id);
        }
        self.next_id = following(id);
        self.bookmarks.insert(id, bookmark);
        Ok(id)
    }

    /// Move the allocation point; ids below the base are raised to it
    pub fn set_next_id(&mut self, id: BookmarkId) {
        self.next_id = id.max(BOOKMARK_BASE);
    }

    pub fn free(&mut self, id: BookmarkId) -> Result<Bookmark> {
        self.bookmarks
            .remove(&id)
            .ok_or(KeyTableError::InvalidBookmark(id))
    }

    pub fn get(&self, id: BookmarkId) -> Result<&Bookmark> {
        self.bookmarks
            .get(&id)
            .ok_or(KeyTableError::InvalidBookmark(id))
    }

    /// Current cursor position of a bookmark
    pub fn resolve(&self, tree: &Tree, id: BookmarkId) -> Result<Cursor> {
        let bookmark = self.get(id)?;
        match bookmark.target {
            Anchor::Before => Ok(Cursor::Before),
            Anchor::After => Ok(Cursor::After),
            Anchor::Row(handle) => tree.resolve(handle).map(Cursor::OnRow).ok_or_else(|| {
                tracing::warn!(
                    bookmark = id,
                    first_row_position = bookmark.first_row_position,
                    "bookmarked row no longer exists"
                );
                KeyTableError::NotFound(format!("row of bookmark {}", id))
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }

    pub fn clear(&mut self) {
        self.bookmarks.clear();
    }
}

fn following(id: BookmarkId) -> BookmarkId {
    id.checked_add(1).unwrap_or(BOOKMARK_BASE)
}
