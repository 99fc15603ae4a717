//! Engine Module
//!
//! `KeyTable` is the facade over one open table view: the ordered tree, the
//! id lookup, the cursor and the bookmarks.
//!
//! ## Responsibilities
//! - Add, move and remove rows as the caller reports object changes
//! - Report the preceding row after each change for notification diffs
//! - Seek, page and count relative to the cursor or a bookmark
//! - Hide rows from scrolling without removing them from the index
//!
//! ## Concurrency Model
//!
//! All state sits behind one `parking_lot::Mutex`. Every public method locks
//! it once for its whole duration, so operations are strictly serialized and
//! a caller always observes its own writes. Callers must not hold other locks
//! (e.g. storage locks) while calling in.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::bookmark::{BookmarkId, BookmarkTable};
use crate::config::{Config, MAX_KEY_GROWTH};
use crate::cursor::{Cursor, SeekOrigin};
use crate::error::{KeyTableError, Result};
use crate::key::{compare_prefix, Column, ObjectKey, SortKey};
use crate::script::{BookmarkOp, Command, Response};
use crate::snapshot::SnapshotRow;
use crate::tree::{NodeId, Tree};

/// Table event kinds shared with the notification layer.
///
/// The engine itself only produces `RowAdded`, `RowDeleted` and `RowModified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateType {
    Changed,
    Error,
    RowAdded,
    RowDeleted,
    RowModified,
    Sorted,
    Restricted,
    ColumnsSet,
    ReloadRequired,
}

/// Outcome of a row upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowChange {
    pub action: UpdateType,
    /// Row now immediately before the affected row (hidden rows included)
    pub previous: Option<ObjectKey>,
}

/// Ordered view over the rows of one open table
pub struct KeyTable {
    /// Table configuration
    config: Config,

    /// Everything mutable, serialized by one lock
    state: Mutex<TableState>,
}

struct TableState {
    tree: Tree,
    lookup: HashMap<ObjectKey, NodeId>,
    cursor: Cursor,
    bookmarks: BookmarkTable,
}

impl KeyTable {
    /// Create an empty table with default config
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create an empty table with the given config
    pub fn with_config(config: Config) -> Self {
        let state = TableState {
            tree: Tree::with_capacity(config.initial_capacity),
            lookup: HashMap::with_capacity(config.initial_capacity),
            cursor: Cursor::Before,
            bookmarks: BookmarkTable::new(config.max_bookmarks),
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    // =========================================================================
    // Row Updates
    // =========================================================================

    /// Add a row, or move/re-flag an existing one.
    ///
    /// A known row keeps its node, so the cursor and bookmarks follow it.
    pub fn upsert(&self, id: ObjectKey, key: SortKey, hidden: bool) -> Result<RowChange> {
        self.check_shape(&key)?;
        let mut state = self.state.lock();
        Ok(state.upsert(id, key, hidden))
    }

    /// Replace a single column of an existing row's sort key.
    ///
    /// An index past the key's end pads with NULL columns, up to
    /// `sort_columns` (or [`MAX_KEY_GROWTH`] columns past the end when the
    /// shape is unconfigured). Anything further is `InvalidArgument`.
    pub fn update_partial_key(
        &self,
        id: ObjectKey,
        column_index: usize,
        column: Column,
        hidden: bool,
    ) -> Result<RowChange> {
        if let (true, Some(columns)) = (self.config.strict_shape, self.config.sort_columns) {
            if column_index >= columns {
                return Err(KeyTableError::InvalidArgument(format!(
                    "column index {} out of range for {} sort columns",
                    column_index, columns
                )));
            }
        }

        let mut state = self.state.lock();
        let node = state.node_of(id)?;
        let mut key = state.tree.node(node).key().clone();

        let limit = match self.config.sort_columns {
            Some(columns) => columns.max(key.len()),
            None => key.len().saturating_add(MAX_KEY_GROWTH),
        };
        if column_index >= limit {
            return Err(KeyTableError::InvalidArgument(format!(
                "column index {} out of range for a {}-column key",
                column_index,
                key.len()
            )));
        }

        key.set_column(column_index, column);
        Ok(state.upsert(id, key, hidden))
    }

    /// Upsert many rows under one lock.
    ///
    /// Every key is shape-checked before any row is touched. Returns the
    /// number of rows that were newly added.
    pub fn upsert_many<I>(&self, rows: I) -> Result<usize>
    where
        I: IntoIterator<Item = (ObjectKey, SortKey, bool)>,
    {
        let rows: Vec<_> = rows.into_iter().collect();
        for (_, key, _) in &rows {
            self.check_shape(key)?;
        }

        let mut state = self.state.lock();
        let added = rows
            .into_iter()
            .map(|(id, key, hidden)| state.upsert(id, key, hidden))
            .filter(|change| change.action == UpdateType::RowAdded)
            .count();
        Ok(added)
    }

    /// Remove a row; returns the row that preceded it
    pub fn delete(&self, id: ObjectKey) -> Result<Option<ObjectKey>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let node = state.node_of(id)?;
        let tree = &mut state.tree;

        let previous = tree.prev(node).map(|p| tree.node(p).id());
        if state.cursor == Cursor::OnRow(node) {
            state.cursor = tree.next(node).map_or(Cursor::After, Cursor::OnRow);
        }
        tree.remove(node);
        state.lookup.remove(&id);

        tracing::debug!(
            object_id = id.object_id,
            suborder_id = id.suborder_id,
            action = ?UpdateType::RowDeleted,
            "row deleted"
        );
        Ok(previous)
    }

    /// Drop every row and bookmark and rewind the cursor
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let rows = state.tree.len();
        state.reset();
        tracing::debug!(rows, "table cleared");
    }

    // =========================================================================
    // Cursor
    // =========================================================================

    /// Move the cursor; returns how many visible rows it actually moved.
    ///
    /// `Set` and `End` count from the first row and from one past the last
    /// row. `Current` counts from the cursor, or from `bookmark` if given.
    /// Seeks clamp at both ends.
    ///
    /// From a hidden row (reached by `seek_id`), `Current, 0` stays put, `+1`
    /// lands on the next visible row and `-1` on the previous one.
    pub fn seek_row(
        &self,
        bookmark: Option<BookmarkId>,
        origin: SeekOrigin,
        offset: i32,
    ) -> Result<i32> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let tree = &state.tree;
        let total = (tree.len() as u32 - tree.hidden_len()) as i64;

        let (base, from) = match (origin, bookmark) {
            (SeekOrigin::Set, _) => (0, None),
            (SeekOrigin::End, _) => (total, None),
            (SeekOrigin::Current, Some(bookmark)) => {
                let cursor = state.bookmarks.resolve(tree, bookmark)?;
                (cursor.ordinal(tree) as i64, Some(cursor))
            }
            (SeekOrigin::Current, None) => (state.cursor.ordinal(tree) as i64, Some(state.cursor)),
        };
        let offset = offset as i64;

        // A hidden row sits between visible positions base - 1 and base
        if let Some(cursor @ Cursor::OnRow(n)) = from {
            if tree.node(n).is_hidden() {
                let moved = if offset == 0 {
                    state.cursor = cursor;
                    0
                } else {
                    let target = if offset > 0 {
                        (base + offset - 1).min(total)
                    } else {
                        (base + offset).max(0)
                    };
                    state.cursor = Cursor::at_position(tree, target as u32);
                    tracing::trace!(?origin, offset, target, "seek from hidden row");
                    if offset > 0 {
                        target - base + 1
                    } else {
                        target - base
                    }
                };
                return Ok(moved as i32);
            }
        }

        let target = (base + offset).clamp(0, total);
        state.cursor = Cursor::at_position(tree, target as u32);
        tracing::trace!(?origin, offset, target, "seek");
        Ok((target - base) as i32)
    }

    /// Put the cursor on a row, hidden or not
    pub fn seek_id(&self, id: ObjectKey) -> Result<()> {
        let mut state = self.state.lock();
        let node = state.node_of(id)?;
        state.cursor = Cursor::OnRow(node);
        Ok(())
    }

    /// Row under the cursor
    pub fn current_row(&self) -> Option<ObjectKey> {
        let state = self.state.lock();
        state.cursor.node().map(|n| state.tree.node(n).id())
    }

    /// Read up to `count` rows from the cursor and move past them.
    ///
    /// Forward reads start at the cursor row and leave the cursor on the row
    /// after the last one returned. Backward reads start at the row before the
    /// cursor, return rows nearest-first, and leave the cursor on the last
    /// row returned.
    pub fn query_rows(&self, count: u32, backward: bool, include_hidden: bool) -> Vec<ObjectKey> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let tree = &state.tree;
        if count == 0 || tree.is_empty() {
            return Vec::new();
        }

        let mut rows = Vec::with_capacity((count as usize).min(tree.len()));
        if backward {
            let mut cur = match state.cursor {
                Cursor::Before => None,
                Cursor::OnRow(n) => tree.prev(n),
                Cursor::After => tree.last(),
            };
            let mut earliest = None;
            while rows.len() < count as usize {
                let Some(n) = tree.skip_backward(cur, include_hidden) else {
                    break;
                };
                rows.push(tree.node(n).id());
                earliest = Some(n);
                cur = tree.prev(n);
            }
            if let Some(n) = earliest {
                state.cursor = Cursor::OnRow(n);
            }
        } else {
            let mut cur = match state.cursor {
                Cursor::Before => tree.first(),
                Cursor::OnRow(n) => Some(n),
                Cursor::After => None,
            };
            while rows.len() < count as usize {
                let Some(n) = tree.skip_forward(cur, include_hidden) else {
                    cur = None;
                    break;
                };
                rows.push(tree.node(n).id());
                cur = tree.next(n);
            }
            state.cursor = cur.map_or(Cursor::After, Cursor::OnRow);
        }
        rows
    }

    // =========================================================================
    // Counting
    // =========================================================================

    /// `(visible rows, visible rows before the cursor)`
    pub fn row_count(&self) -> (u32, u32) {
        let state = self.state.lock();
        let tree = &state.tree;
        (
            tree.len() as u32 - tree.hidden_len(),
            state.cursor.ordinal(tree),
        )
    }

    /// `(all rows, rows before the cursor)`, hidden rows included
    pub fn row_count_including_hidden(&self) -> (u32, u32) {
        let state = self.state.lock();
        let tree = &state.tree;
        let current = match state.cursor {
            Cursor::Before => 0,
            Cursor::OnRow(n) => tree.ordinal(n),
            Cursor::After => tree.len() as u32,
        };
        (tree.len() as u32, current)
    }

    /// Number of rows, hidden included
    pub fn len(&self) -> usize {
        self.state.lock().tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().tree.is_empty()
    }

    // =========================================================================
    // Bookmarks
    // =========================================================================

    /// Bookmark the cursor position
    pub fn create_bookmark(&self) -> Result<BookmarkId> {
        let mut state = self.state.lock();
        let state = &mut *state;
        let id = state
            .bookmarks
            .create(&state.tree, state.cursor)
            .inspect_err(|e| tracing::warn!(error = %e, "bookmark rejected"))?;
        tracing::debug!(bookmark = id, "bookmark created");
        Ok(id)
    }

    pub fn free_bookmark(&self, id: BookmarkId) -> Result<()> {
        self.state.lock().bookmarks.free(id)?;
        tracing::debug!(bookmark = id, "bookmark freed");
        Ok(())
    }

    /// Current visible ordinal of a bookmark
    pub fn get_bookmark(&self, id: BookmarkId) -> Result<u32> {
        let state = self.state.lock();
        Ok(state.bookmarks.resolve(&state.tree, id)?.ordinal(&state.tree))
    }

    /// Number of live bookmarks
    pub fn bookmark_count(&self) -> usize {
        self.state.lock().bookmarks.len()
    }

    // =========================================================================
    // Hidden Rows
    // =========================================================================

    /// Hide rows from scrolling and visible counts; returns rows whose flag
    /// changed. Unknown ids are skipped.
    pub fn hide_rows(&self, ids: &[ObjectKey]) -> Vec<ObjectKey> {
        self.state.lock().set_hidden(ids, true)
    }

    /// Reverse of [`hide_rows`](Self::hide_rows)
    pub fn unhide_rows(&self, ids: &[ObjectKey]) -> Vec<ObjectKey> {
        self.state.lock().set_hidden(ids, false)
    }

    pub fn is_hidden(&self, id: ObjectKey) -> Result<bool> {
        let state = self.state.lock();
        let node = state.node_of(id)?;
        Ok(state.tree.node(node).is_hidden())
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// First row whose sort key equals `key`
    pub fn find(&self, key: &SortKey) -> Option<ObjectKey> {
        let state = self.state.lock();
        state.tree.find(key).map(|n| state.tree.node(n).id())
    }

    /// First row whose sort key is not less than `key`
    pub fn lower_bound(&self, key: &SortKey) -> Option<ObjectKey> {
        let state = self.state.lock();
        state.tree.lower_bound(key).map(|n| state.tree.node(n).id())
    }

    /// Structural predecessor of a row
    pub fn previous_row(&self, id: ObjectKey) -> Result<Option<ObjectKey>> {
        let state = self.state.lock();
        let node = state.node_of(id)?;
        Ok(state.tree.prev(node).map(|p| state.tree.node(p).id()))
    }

    /// Every row whose leading columns match all of `id`'s sort key, in sort
    /// order and including `id` itself. A category header row with a short
    /// key thus yields itself followed by the rows filed under it.
    pub fn rows_by_sort_prefix(&self, id: ObjectKey) -> Result<Vec<ObjectKey>> {
        let state = self.state.lock();
        let tree = &state.tree;
        let node = state.node_of(id)?;
        let prefix = tree.node(node).key();
        let width = prefix.len();
        let matches = |n: NodeId| compare_prefix(tree.node(n).key(), prefix, width).is_eq();

        let mut rows = Vec::new();
        let mut cur = tree.prev(node);
        while let Some(n) = cur.filter(|&n| matches(n)) {
            rows.push(tree.node(n).id());
            cur = tree.prev(n);
        }
        rows.reverse();
        rows.push(tree.node(node).id());

        let mut cur = tree.next(node);
        while let Some(n) = cur.filter(|&n| matches(n)) {
            rows.push(tree.node(n).id());
            cur = tree.next(n);
        }
        Ok(rows)
    }

    // =========================================================================
    // Snapshot / Diagnostics
    // =========================================================================

    /// All rows in sort order
    pub fn snapshot(&self) -> Vec<SnapshotRow> {
        let state = self.state.lock();
        let tree = &state.tree;
        let mut rows = Vec::with_capacity(tree.len());
        let mut cur = tree.first();
        while let Some(n) = cur {
            let node = tree.node(n);
            rows.push(SnapshotRow {
                id: node.id(),
                key: node.key().clone(),
                hidden: node.is_hidden(),
            });
            cur = tree.next(n);
        }
        rows
    }

    /// Replace the whole table with `rows`; no other call sees it half loaded.
    /// Returns the number of distinct rows loaded.
    pub fn restore(&self, rows: Vec<SnapshotRow>) -> Result<usize> {
        for row in &rows {
            self.check_shape(&row.key)?;
        }

        let mut state = self.state.lock();
        state.reset();
        let added = rows
            .into_iter()
            .map(|row| state.upsert(row.id, row.key, row.hidden))
            .filter(|change| change.action == UpdateType::RowAdded)
            .count();
        tracing::debug!(rows = added, "table restored");
        Ok(added)
    }

    /// Verify tree invariants and lookup consistency
    pub fn check_invariants(&self) -> Result<()> {
        let state = self.state.lock();
        let tree = &state.tree;
        tree.validate().map_err(KeyTableError::Corrupted)?;

        if state.lookup.len() != tree.len() {
            return Err(KeyTableError::Corrupted(format!(
                "lookup holds {} rows, tree holds {}",
                state.lookup.len(),
                tree.len()
            )));
        }
        for (id, &node) in &state.lookup {
            if tree.node(node).id() != *id {
                return Err(KeyTableError::Corrupted(format!("lookup entry {} is stale", id)));
            }
        }
        if let Some(n) = state.cursor.node() {
            if state.lookup.get(&tree.node(n).id()) != Some(&n) {
                return Err(KeyTableError::Corrupted("cursor on a dead row".to_string()));
            }
        }
        Ok(())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Command Execution
    // =========================================================================

    /// Execute a script command
    pub fn execute(&self, command: Command) -> Result<Response> {
        match command {
            Command::Upsert { id, key, hidden } => {
                let change = self.upsert(id, key, hidden)?;
                Ok(Response::Change(change))
            }
            Command::Partial {
                id,
                column_index,
                column,
                hidden,
            } => {
                let change = self.update_partial_key(id, column_index, column, hidden)?;
                Ok(Response::Change(change))
            }
            Command::Delete { id } => self.delete(id).map(Response::Row),
            Command::Seek {
                origin,
                offset,
                bookmark,
            } => self.seek_row(bookmark, origin, offset).map(Response::Moved),
            Command::SeekId { id } => self.seek_id(id).map(|_| Response::Ok),
            Command::Query {
                count,
                backward,
                include_hidden,
            } => Ok(Response::Rows(self.query_rows(count, backward, include_hidden))),
            Command::Count => {
                let (total, current) = self.row_count();
                Ok(Response::Count { total, current })
            }
            Command::Bookmark(BookmarkOp::Create) => self.create_bookmark().map(Response::Bookmark),
            Command::Bookmark(BookmarkOp::Free(id)) => self.free_bookmark(id).map(|_| Response::Ok),
            Command::Bookmark(BookmarkOp::Get(id)) => self.get_bookmark(id).map(Response::Position),
            Command::Hide { ids } => Ok(Response::Rows(self.hide_rows(&ids))),
            Command::Unhide { ids } => Ok(Response::Rows(self.unhide_rows(&ids))),
            Command::Find { key } => Ok(Response::Row(self.find(&key))),
            Command::LowerBound { key } => Ok(Response::Row(self.lower_bound(&key))),
            Command::Prefix { id } => self.rows_by_sort_prefix(id).map(Response::Rows),
            Command::Clear => {
                self.clear();
                Ok(Response::Ok)
            }
            Command::Check => self.check_invariants().map(|_| Response::Ok),
        }
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_shape(&self, key: &SortKey) -> Result<()> {
        match self.config.sort_columns {
            Some(columns) if self.config.strict_shape && key.len() != columns => {
                Err(KeyTableError::InvalidArgument(format!(
                    "sort key has {} columns, table expects {}",
                    key.len(),
                    columns
                )))
            }
            _ => Ok(()),
        }
    }
}

impl Default for KeyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TableState {
    /// Drop every row and bookmark and rewind the cursor
    fn reset(&mut self) {
        self.tree.clear();
        self.lookup.clear();
        self.bookmarks.clear();
        self.cursor = Cursor::Before;
    }

    fn node_of(&self, id: ObjectKey) -> Result<NodeId> {
        self.lookup
            .get(&id)
            .copied()
            .ok_or_else(|| KeyTableError::row_not_found(id))
    }

    fn upsert(&mut self, id: ObjectKey, key: SortKey, hidden: bool) -> RowChange {
        let (action, node) = match self.lookup.get(&id).copied() {
            None => {
                let node = self.tree.insert(id, key, hidden);
                self.lookup.insert(id, node);
                (UpdateType::RowAdded, node)
            }
            Some(node) => {
                if *self.tree.node(node).key() != key {
                    self.tree.rekey(node, key);
                }
                self.tree.set_hidden(node, hidden);
                (UpdateType::RowModified, node)
            }
        };

        let previous = self.tree.prev(node).map(|p| self.tree.node(p).id());
        tracing::debug!(
            object_id = id.object_id,
            suborder_id = id.suborder_id,
            ?action,
            hidden,
            "row updated"
        );
        RowChange { action, previous }
    }

    fn set_hidden(&mut self, ids: &[ObjectKey], hidden: bool) -> Vec<ObjectKey> {
        let affected: Vec<_> = ids
            .iter()
            .copied()
            .filter(|id| match self.lookup.get(id) {
                Some(&node) => self.tree.set_hidden(node, hidden),
                None => false,
            })
            .collect();
        tracing::debug!(rows = affected.len(), hidden, "hidden flags changed");
        affected
    }
}
