//! Ordered traversal, rank/select and key search
//!
//! Stepping uses parent links and never allocates. Ordinals come from the
//! subtree counts, so "row number" questions are O(log n).

use std::cmp::Ordering;

use crate::key::{compare, compare_rows, SortKey};

use super::avl::Tree;
use super::node::NodeId;

impl Tree {
    // =========================================================================
    // Stepping
    // =========================================================================

    pub fn first(&self) -> Option<NodeId> {
        self.root.map(|r| self.leftmost(r))
    }

    pub fn last(&self) -> Option<NodeId> {
        self.root.map(|r| self.rightmost(r))
    }

    pub(crate) fn leftmost(&self, mut n: NodeId) -> NodeId {
        while let Some(l) = self.left(n) {
            n = l;
        }
        n
    }

    pub(crate) fn rightmost(&self, mut n: NodeId) -> NodeId {
        while let Some(r) = self.right(n) {
            n = r;
        }
        n
    }

    /// In-order successor
    pub fn next(&self, n: NodeId) -> Option<NodeId> {
        if let Some(r) = self.right(n) {
            return Some(self.leftmost(r));
        }
        let mut child = n;
        while let Some(p) = self.parent(child) {
            if self.left(p) == Some(child) {
                return Some(p);
            }
            child = p;
        }
        None
    }

    /// In-order predecessor
    pub fn prev(&self, n: NodeId) -> Option<NodeId> {
        if let Some(l) = self.left(n) {
            return Some(self.rightmost(l));
        }
        let mut child = n;
        while let Some(p) = self.parent(child) {
            if self.right(p) == Some(child) {
                return Some(p);
            }
            child = p;
        }
        None
    }

    /// First node at or after `n` that passes the visibility filter
    pub fn skip_forward(&self, mut n: Option<NodeId>, include_hidden: bool) -> Option<NodeId> {
        while let Some(c) = n {
            if include_hidden || !self.node(c).hidden {
                return Some(c);
            }
            n = self.next(c);
        }
        None
    }

    /// First node at or before `n` that passes the visibility filter
    pub fn skip_backward(&self, mut n: Option<NodeId>, include_hidden: bool) -> Option<NodeId> {
        while let Some(c) = n {
            if include_hidden || !self.node(c).hidden {
                return Some(c);
            }
            n = self.prev(c);
        }
        None
    }

    // =========================================================================
    // Rank / Select
    // =========================================================================

    /// Number of rows (hidden included) before `n`
    pub fn ordinal(&self, n: NodeId) -> u32 {
        let mut pos = self.count(self.left(n));
        let mut child = n;
        while let Some(p) = self.parent(child) {
            if self.right(p) == Some(child) {
                pos += self.count(self.left(p)) + 1;
            }
            child = p;
        }
        pos
    }

    /// Number of visible rows before `n`
    pub fn visible_ordinal(&self, n: NodeId) -> u32 {
        let mut pos = self.visible_count(self.left(n));
        let mut child = n;
        while let Some(p) = self.parent(child) {
            if self.right(p) == Some(child) {
                pos += self.visible_count(self.left(p)) + !self.node(p).hidden as u32;
            }
            child = p;
        }
        pos
    }

    /// The row at position `k`, counting hidden rows only if asked
    pub fn select(&self, mut k: u32, include_hidden: bool) -> Option<NodeId> {
        let mut cur = self.root;
        while let Some(n) = cur {
            let left = self.left(n);
            let left_count = if include_hidden {
                self.count(left)
            } else {
                self.visible_count(left)
            };
            if k < left_count {
                cur = left;
                continue;
            }
            k -= left_count;
            if include_hidden || !self.node(n).hidden {
                if k == 0 {
                    return Some(n);
                }
                k -= 1;
            }
            cur = self.right(n);
        }
        None
    }

    // =========================================================================
    // Key search
    // =========================================================================

    /// First row whose sort key is not less than `key`
    pub fn lower_bound(&self, key: &SortKey) -> Option<NodeId> {
        let mut found = None;
        let mut cur = self.root;
        while let Some(n) = cur {
            if compare(&self.node(n).key, key) == Ordering::Less {
                cur = self.right(n);
            } else {
                found = Some(n);
                cur = self.left(n);
            }
        }
        found
    }

    /// First row whose sort key equals `key`
    pub fn find(&self, key: &SortKey) -> Option<NodeId> {
        self.lower_bound(key)
            .filter(|&n| compare(&self.node(n).key, key) == Ordering::Equal)
    }

    // =========================================================================
    // Self-check
    // =========================================================================

    /// Verify every structural invariant; returns the number of nodes seen
    pub fn validate(&self) -> Result<usize, String> {
        let Some(root) = self.root else {
            return if self.len() == 0 {
                Ok(0)
            } else {
                Err(format!("empty tree but {} live nodes", self.len()))
            };
        };
        if self.parent(root).is_some() {
            return Err("root has a parent".to_string());
        }

        let mut seen = 0usize;
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            seen += 1;
            let node = self.node(n);
            for child in [node.left, node.right].into_iter().flatten() {
                if self.parent(child) != Some(n) {
                    return Err(format!("broken parent link below {}", node.id));
                }
                stack.push(child);
            }

            let (l, r) = (node.left, node.right);
            let balance = self.height(l) as i32 - self.height(r) as i32;
            if !(-1..=1).contains(&balance) {
                return Err(format!("node {} out of balance ({})", node.id, balance));
            }
            if node.height != 1 + self.height(l).max(self.height(r)) {
                return Err(format!("node {} has stale height", node.id));
            }
            if node.count != 1 + self.count(l) + self.count(r) {
                return Err(format!("node {} has stale subtree count", node.id));
            }
            if node.hidden_count != node.hidden as u32 + self.hidden_count(l) + self.hidden_count(r) {
                return Err(format!("node {} has stale hidden count", node.id));
            }
        }
        if seen != self.len() {
            return Err(format!("reached {} nodes, arena holds {}", seen, self.len()));
        }

        let mut prev = self.first();
        let mut cur = prev.and_then(|n| self.next(n));
        while let (Some(a), Some(b)) = (prev, cur) {
            let (x, y) = (self.node(a), self.node(b));
            if compare_rows(&x.key, x.id, &y.key, y.id) != Ordering::Less {
                return Err(format!("rows {} and {} out of order", x.id, y.id));
            }
            prev = cur;
            cur = self.next(b);
        }
        Ok(seen)
    }
}
