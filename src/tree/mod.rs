//! Tree Module
//!
//! Self-balancing ordered index of rows.
//!
//! ## Responsibilities
//! - Keep rows in strict `(SortKey, ObjectKey)` order
//! - Hold the AVL balance invariant after every insert, delete and re-key
//! - Maintain subtree and hidden counts for O(log n) rank and select
//! - Successor/predecessor stepping for cursors
//!
//! ## Node Layout
//! ```text
//!            ┌───────────────────────────────┐
//!            │ RowNode                       │
//!            │  id: ObjectKey   (immutable)  │
//!            │  key: SortKey    (mutable)    │
//!            │  count / hidden_count / height│
//!            └──────┬─────────────────┬──────┘
//!              left │    ▲ parent     │ right
//!                   ▼    │            ▼
//!               RowNode ─┘         RowNode
//! ```
//! Nodes live in an arena and link by index; `parent` never owns.

mod avl;
mod node;
mod traverse;

pub use avl::Tree;
pub use node::{NodeHandle, NodeId, RowNode};
