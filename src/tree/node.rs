//! Row nodes and the arena that owns them
//!
//! Nodes are addressed by [`NodeId`] (a slot index). `left`/`right` are the
//! owning links, `parent` is a plain back-reference kept in sync by every
//! splice and rotation. Freed slots are recycled; each slot carries a
//! generation so a [`NodeHandle`] taken before a delete can tell that its row
//! is gone even after the slot is reused.

use crate::key::{ObjectKey, SortKey};

/// Index of a node slot in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Generation-checked weak reference to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub(crate) id: NodeId,
    pub(crate) generation: u32,
}

/// One row of the index
#[derive(Debug, Clone)]
pub struct RowNode {
    pub(crate) id: ObjectKey,
    pub(crate) key: SortKey,
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    /// Nodes in this subtree including self, hidden or not
    pub(crate) count: u32,
    /// Hidden nodes in this subtree including self
    pub(crate) hidden_count: u32,
    pub(crate) height: u16,
    pub(crate) hidden: bool,
}

impl RowNode {
    pub(crate) fn new(id: ObjectKey, key: SortKey, hidden: bool) -> Self {
        Self {
            id,
            key,
            parent: None,
            left: None,
            right: None,
            count: 1,
            hidden_count: hidden as u32,
            height: 1,
            hidden,
        }
    }

    pub fn id(&self) -> ObjectKey {
        self.id
    }

    pub fn key(&self) -> &SortKey {
        &self.key
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn subtree_count(&self) -> u32 {
        self.count
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Reset linkage so the node can be re-attached as a leaf
    pub(crate) fn unlink(&mut self) {
        self.parent = None;
        self.left = None;
        self.right = None;
        self.count = 1;
        self.hidden_count = self.hidden as u32;
        self.height = 1;
    }
}

struct Slot {
    generation: u32,
    node: Option<RowNode>,
}

/// Slab of row nodes with a free list
#[derive(Default)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Arena {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    pub(crate) fn alloc(&mut self, node: RowNode) -> NodeId {
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId(index)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId((self.slots.len() - 1) as u32)
            }
        }
    }

    /// Release a slot; bumps its generation so outstanding handles go stale
    pub(crate) fn free(&mut self, id: NodeId) -> Option<RowNode> {
        let slot = self.slots.get_mut(id.index())?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.0);
        self.live -= 1;
        Some(node)
    }

    pub(crate) fn handle(&self, id: NodeId) -> NodeHandle {
        NodeHandle {
            id,
            generation: self.slots[id.index()].generation,
        }
    }

    pub(crate) fn resolve(&self, handle: NodeHandle) -> Option<NodeId> {
        let slot = self.slots.get(handle.id.index())?;
        (slot.generation == handle.generation && slot.node.is_some()).then_some(handle.id)
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn clear(&mut self) {
        // Keep generations so handles from before the clear stay stale.
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free.push(index as u32);
        }
        self.free.reverse();
        self.live = 0;
    }

    /// Node lookup. Panics on a stale id: the tree never holds one.
    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> &RowNode {
        self.slots[id.index()]
            .node
            .as_ref()
            .expect("tree link to freed node")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut RowNode {
        self.slots[id.index()]
            .node
            .as_mut()
            .expect("tree link to freed node")
    }
}
