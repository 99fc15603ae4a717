//! # KeyTable
//!
//! An in-memory ordered view engine for sortable, scrollable tables:
//! - Composite sort keys with per-column direction and NULL ordering
//! - AVL-balanced index with O(log n) insert, delete, rank and seek
//! - Cursor paging, bounded bookmarks and hidden rows
//! - Snapshot codec and a small command language for replaying traces
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Table-view / notification layer              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ upsert / delete / seek / query
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    KeyTable (Mutex)                          │
//! │        lookup: ObjectKey → node   cursor   bookmarks         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!               ┌───────────────┐
//!               │  AVL Tree     │  (SortKey, ObjectKey) order
//!               │  node arena   │  subtree + hidden counts
//!               └───────────────┘
//! ```
//!
//! No component performs I/O except the script file runner.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod key;
pub mod tree;
pub mod cursor;
pub mod bookmark;
pub mod engine;
pub mod snapshot;
pub mod script;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KeyTableError, Result};
pub use config::Config;
pub use key::{Column, ColumnKind, ObjectKey, SortKey};
pub use cursor::SeekOrigin;
pub use bookmark::BookmarkId;
pub use engine::{KeyTable, RowChange, UpdateType};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of KeyTable
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
