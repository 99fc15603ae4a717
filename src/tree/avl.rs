//! AVL maintenance: attach, detach, rotations and upward rebalancing
//!
//! All walks are iterative. After any splice the tree is repaired by
//! [`Tree::rebalance_from`], which climbs to the root recomputing height,
//! subtree count and hidden count, rotating wherever the balance factor
//! leaves `{-1, 0, 1}`.

use std::cmp::Ordering;

use crate::key::{compare_rows, ObjectKey, SortKey};

use super::node::{Arena, NodeHandle, NodeId, RowNode};

/// Arena-backed AVL tree ordered by `(SortKey, ObjectKey)`
#[derive(Default)]
pub struct Tree {
    pub(crate) arena: Arena,
    pub(crate) root: Option<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: Arena::with_capacity(capacity),
            root: None,
        }
    }

    /// Number of rows, hidden included
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of hidden rows
    pub fn hidden_len(&self) -> u32 {
        self.hidden_count(self.root)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &RowNode {
        self.arena.get(id)
    }

    pub fn handle(&self, id: NodeId) -> NodeHandle {
        self.arena.handle(id)
    }

    pub fn resolve(&self, handle: NodeHandle) -> Option<NodeId> {
        self.arena.resolve(handle)
    }

    /// Drop every node. Outstanding handles become stale.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
    }

    // =========================================================================
    // Insert / Delete
    // =========================================================================

    /// Insert a new row and return its node
    pub fn insert(&mut self, id: ObjectKey, key: SortKey, hidden: bool) -> NodeId {
        let node = self.arena.alloc(RowNode::new(id, key, hidden));
        self.attach(node);
        node
    }

    /// Remove a row and hand back its node
    pub fn remove(&mut self, node: NodeId) -> RowNode {
        self.detach(node);
        self.arena
            .free(node)
            .expect("removing a node that is not allocated")
    }

    /// Replace a row's sort key, moving it if the order changes.
    /// The node id (and every handle to it) survives the move.
    pub fn rekey(&mut self, node: NodeId, key: SortKey) {
        self.detach(node);
        self.arena.get_mut(node).key = key;
        self.attach(node);
    }

    /// Flip the hidden flag; tree shape and subtree counts are untouched
    pub fn set_hidden(&mut self, node: NodeId, hidden: bool) -> bool {
        if self.arena.get(node).hidden == hidden {
            return false;
        }
        self.arena.get_mut(node).hidden = hidden;

        let mut cur = Some(node);
        while let Some(n) = cur {
            self.update(n);
            cur = self.parent(n);
        }
        true
    }

    /// Link a detached node in as a leaf, then rebalance
    fn attach(&mut self, node: NodeId) {
        self.arena.get_mut(node).unlink();

        let mut parent = None;
        let mut go_left = false;
        let mut cur = self.root;
        while let Some(c) = cur {
            parent = Some(c);
            go_left = self.compare_nodes(node, c) == Ordering::Less;
            cur = if go_left { self.left(c) } else { self.right(c) };
        }

        self.arena.get_mut(node).parent = parent;
        match parent {
            None => self.root = Some(node),
            Some(p) if go_left => self.arena.get_mut(p).left = Some(node),
            Some(p) => self.arena.get_mut(p).right = Some(node),
        }

        self.rebalance_from(parent);
    }

    /// Unlink a node from the tree without freeing it.
    ///
    /// A node with two children is replaced by its in-order successor node
    /// itself (position transplant), so no row identity moves between nodes.
    fn detach(&mut self, z: NodeId) {
        let RowNode {
            left, right, parent, ..
        } = *self.arena.get(z);

        let start = match (left, right) {
            (Some(l), Some(r)) => {
                let y = self.leftmost(r);
                let start = if y == r {
                    y
                } else {
                    let y_parent = self.parent(y).expect("successor below z has a parent");
                    let y_right = self.right(y);
                    self.arena.get_mut(y_parent).left = y_right;
                    if let Some(yr) = y_right {
                        self.arena.get_mut(yr).parent = Some(y_parent);
                    }
                    self.arena.get_mut(y).right = Some(r);
                    self.arena.get_mut(r).parent = Some(y);
                    y_parent
                };
                self.arena.get_mut(y).left = Some(l);
                self.arena.get_mut(l).parent = Some(y);
                self.arena.get_mut(y).parent = parent;
                self.replace_child(parent, z, Some(y));
                Some(start)
            }
            _ => {
                let child = left.or(right);
                if let Some(c) = child {
                    self.arena.get_mut(c).parent = parent;
                }
                self.replace_child(parent, z, child);
                parent
            }
        };

        self.arena.get_mut(z).unlink();
        self.rebalance_from(start);
    }

    // =========================================================================
    // Rebalancing
    // =========================================================================

    /// Climb from `start` to the root fixing aggregates and balance
    fn rebalance_from(&mut self, start: Option<NodeId>) {
        let mut cur = start;
        while let Some(n) = cur {
            self.update(n);
            let balance = self.balance(n);
            let top = if balance > 1 {
                let l = self.left(n).expect("left-heavy node has a left child");
                if self.balance(l) >= 0 {
                    self.rotate_right(n)
                } else {
                    self.rotate_left_right(n)
                }
            } else if balance < -1 {
                let r = self.right(n).expect("right-heavy node has a right child");
                if self.balance(r) <= 0 {
                    self.rotate_left(n)
                } else {
                    self.rotate_right_left(n)
                }
            } else {
                n
            };
            cur = self.parent(top);
        }
    }

    /// Rotate `x` down to the left; returns the new subtree root
    pub(crate) fn rotate_left(&mut self, x: NodeId) -> NodeId {
        let y = self.right(x).expect("rotate_left needs a right child");
        let b = self.left(y);
        let p = self.parent(x);

        self.arena.get_mut(x).right = b;
        if let Some(b) = b {
            self.arena.get_mut(b).parent = Some(x);
        }

        self.arena.get_mut(y).parent = p;
        self.replace_child(p, x, Some(y));

        self.arena.get_mut(y).left = Some(x);
        self.arena.get_mut(x).parent = Some(y);

        self.update(x);
        self.update(y);
        tracing::trace!(pivot = %self.node(y).id, "rotate left");
        y
    }

    /// Rotate `x` down to the right; returns the new subtree root
    pub(crate) fn rotate_right(&mut self, x: NodeId) -> NodeId {
        let y = self.left(x).expect("rotate_right needs a left child");
        let b = self.right(y);
        let p = self.parent(x);

        self.arena.get_mut(x).left = b;
        if let Some(b) = b {
            self.arena.get_mut(b).parent = Some(x);
        }

        self.arena.get_mut(y).parent = p;
        self.replace_child(p, x, Some(y));

        self.arena.get_mut(y).right = Some(x);
        self.arena.get_mut(x).parent = Some(y);

        self.update(x);
        self.update(y);
        tracing::trace!(pivot = %self.node(y).id, "rotate right");
        y
    }

    pub(crate) fn rotate_left_right(&mut self, x: NodeId) -> NodeId {
        let l = self.left(x).expect("rotate_left_right needs a left child");
        self.rotate_left(l);
        self.rotate_right(x)
    }

    pub(crate) fn rotate_right_left(&mut self, x: NodeId) -> NodeId {
        let r = self.right(x).expect("rotate_right_left needs a right child");
        self.rotate_right(r);
        self.rotate_left(x)
    }

    // =========================================================================
    // Link helpers
    // =========================================================================

    /// Point `parent`'s link that referenced `old` at `new` (or the root)
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(p) => {
                let node = self.arena.get_mut(p);
                if node.left == Some(old) {
                    node.left = new;
                } else {
                    node.right = new;
                }
            }
        }
    }

    /// Recompute height and both counts from the children
    fn update(&mut self, n: NodeId) {
        let (l, r) = (self.left(n), self.right(n));
        let height = 1 + self.height(l).max(self.height(r));
        let count = 1 + self.count(l) + self.count(r);
        let hidden = self.hidden_count(l) + self.hidden_count(r);

        let node = self.arena.get_mut(n);
        node.height = height;
        node.count = count;
        node.hidden_count = hidden + node.hidden as u32;
    }

    fn balance(&self, n: NodeId) -> i32 {
        let node = self.arena.get(n);
        self.height(node.left) as i32 - self.height(node.right) as i32
    }

    pub(crate) fn compare_nodes(&self, a: NodeId, b: NodeId) -> Ordering {
        let (a, b) = (self.arena.get(a), self.arena.get(b));
        compare_rows(&a.key, a.id, &b.key, b.id)
    }

    #[inline]
    pub(crate) fn left(&self, n: NodeId) -> Option<NodeId> {
        self.arena.get(n).left
    }

    #[inline]
    pub(crate) fn right(&self, n: NodeId) -> Option<NodeId> {
        self.arena.get(n).right
    }

    #[inline]
    pub(crate) fn parent(&self, n: NodeId) -> Option<NodeId> {
        self.arena.get(n).parent
    }

    #[inline]
    pub(crate) fn height(&self, n: Option<NodeId>) -> u16 {
        n.map_or(0, |n| self.arena.get(n).height)
    }

    #[inline]
    pub(crate) fn count(&self, n: Option<NodeId>) -> u32 {
        n.map_or(0, |n| self.arena.get(n).count)
    }

    #[inline]
    pub(crate) fn hidden_count(&self, n: Option<NodeId>) -> u32 {
        n.map_or(0, |n| self.arena.get(n).hidden_count)
    }

    /// Rows in a subtree that are not hidden
    #[inline]
    pub(crate) fn visible_count(&self, n: Option<NodeId>) -> u32 {
        self.count(n) - self.hidden_count(n)
    }
}
