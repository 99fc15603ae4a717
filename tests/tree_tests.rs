//! Tree Tests
//!
//! Tests verify:
//! - AVL balance after sequential and interleaved inserts/deletes
//! - Rank (ordinal) and select agree
//! - Re-keying keeps node identity
//! - Hidden flags leave shape and subtree counts untouched

use keytable::key::{ObjectKey, SortKey};
use keytable::tree::{NodeId, Tree};

// =============================================================================
// Helper Functions
// =============================================================================

fn id(n: u32) -> ObjectKey {
    ObjectKey::new(n, 0)
}

fn key(n: u32) -> SortKey {
    SortKey::strings(&[&format!("{:06}", n)])
}

fn in_order(tree: &Tree) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    let mut cur = tree.first();
    while let Some(n) = cur {
        nodes.push(n);
        cur = tree.next(n);
    }
    nodes
}

/// Height, subtree count and ordinal of every node, in order
fn shape(tree: &Tree) -> Vec<(u16, u32, u32)> {
    in_order(tree)
        .into_iter()
        .map(|n| {
            let node = tree.node(n);
            (node.height(), node.subtree_count(), tree.ordinal(n))
        })
        .collect()
}

// =============================================================================
// Balance Tests
// =============================================================================

#[test]
fn test_sequential_inserts_stay_balanced() {
    let mut tree = Tree::new();
    for i in 0..1000 {
        tree.insert(id(i), key(i), false);
    }

    assert_eq!(tree.validate().unwrap(), 1000);
    let root = tree.root().unwrap();
    // AVL height bound: < 1.45 * log2(n + 2)
    assert!(tree.node(root).height() <= 14);
    assert_eq!(tree.node(root).subtree_count(), 1000);
}

#[test]
fn test_descending_inserts_stay_balanced() {
    let mut tree = Tree::new();
    for i in (0..1000).rev() {
        tree.insert(id(i), key(i), false);
    }
    tree.validate().unwrap();
    assert!(tree.node(tree.root().unwrap()).height() <= 14);
}

#[test]
fn test_interleaved_removes_stay_balanced() {
    let mut tree = Tree::new();
    let nodes: Vec<_> = (0..500).map(|i| tree.insert(id(i), key(i * 37 % 500), false)).collect();

    for (i, &n) in nodes.iter().enumerate() {
        if i % 3 != 0 {
            let removed = tree.remove(n);
            assert_eq!(removed.id(), id(i as u32));
            tree.validate().unwrap();
        }
    }
    assert_eq!(tree.len(), 167);
}

#[test]
fn test_remove_node_with_two_children_keeps_other_ids() {
    let mut tree = Tree::new();
    let nodes: Vec<_> = (0..7).map(|i| tree.insert(id(i), key(i), false)).collect();

    let root = tree.root().unwrap();
    assert!(tree.node(root).subtree_count() == 7);
    let root_id = tree.node(root).id();
    tree.remove(root);
    tree.validate().unwrap();

    for (i, &n) in nodes.iter().enumerate() {
        if id(i as u32) != root_id {
            assert_eq!(tree.node(n).id(), id(i as u32));
        }
    }
}

// =============================================================================
// Rank / Select Tests
// =============================================================================

#[test]
fn test_ordinal_and_select_agree() {
    let mut tree = Tree::new();
    for i in 0..300 {
        tree.insert(id(i), key((i * 101) % 300), false);
    }

    for (pos, n) in in_order(&tree).into_iter().enumerate() {
        assert_eq!(tree.ordinal(n), pos as u32);
        assert_eq!(tree.select(pos as u32, true), Some(n));
    }
    assert_eq!(tree.select(300, true), None);
}

#[test]
fn test_visible_select_skips_hidden() {
    let mut tree = Tree::new();
    let nodes: Vec<_> = (0..10).map(|i| tree.insert(id(i), key(i), i % 2 == 0)).collect();

    assert_eq!(tree.hidden_len(), 5);
    for k in 0..5 {
        let n = tree.select(k, false).unwrap();
        assert_eq!(tree.node(n).id(), id(2 * k + 1));
        assert_eq!(tree.visible_ordinal(n), k);
    }
    assert_eq!(tree.visible_ordinal(nodes[4]), 2);
}

#[test]
fn test_next_prev_round_trip() {
    let mut tree = Tree::new();
    for i in 0..64 {
        tree.insert(id(i), key(63 - i), false);
    }

    let forward = in_order(&tree);
    let mut backward = Vec::new();
    let mut cur = tree.last();
    while let Some(n) = cur {
        backward.push(n);
        cur = tree.prev(n);
    }
    backward.reverse();
    assert_eq!(forward, backward);
}

// =============================================================================
// Mutation Tests
// =============================================================================

#[test]
fn test_rekey_keeps_node_and_handle() {
    let mut tree = Tree::new();
    let nodes: Vec<_> = (0..20).map(|i| tree.insert(id(i), key(i), false)).collect();
    let handle = tree.handle(nodes[3]);

    tree.rekey(nodes[3], key(1000));

    tree.validate().unwrap();
    assert_eq!(tree.resolve(handle), Some(nodes[3]));
    assert_eq!(tree.last(), Some(nodes[3]));
    assert_eq!(tree.ordinal(nodes[3]), 19);
}

#[test]
fn test_removed_handle_goes_stale() {
    let mut tree = Tree::new();
    let n = tree.insert(id(1), key(1), false);
    let handle = tree.handle(n);

    tree.remove(n);
    let reused = tree.insert(id(2), key(2), false);

    assert_eq!(reused, n);
    assert_eq!(tree.resolve(handle), None);
}

#[test]
fn test_hidden_flags_do_not_change_shape() {
    let mut tree = Tree::new();
    let nodes: Vec<_> = (0..100).map(|i| tree.insert(id(i), key(i * 7 % 100), false)).collect();
    let before = shape(&tree);

    for &n in nodes.iter().step_by(3) {
        assert!(tree.set_hidden(n, true));
    }
    assert!(!tree.set_hidden(nodes[0], true));
    assert_eq!(tree.hidden_len(), 34);
    assert_eq!(shape(&tree), before);

    for &n in nodes.iter().step_by(3) {
        tree.set_hidden(n, false);
    }
    assert_eq!(tree.hidden_len(), 0);
    assert_eq!(shape(&tree), before);
    tree.validate().unwrap();
}

// =============================================================================
// Search Tests
// =============================================================================

#[test]
fn test_lower_bound_and_find() {
    let mut tree = Tree::new();
    for i in 0..50 {
        tree.insert(id(i), key(i * 2), false);
    }

    let n = tree.lower_bound(&key(31)).unwrap();
    assert_eq!(tree.node(n).id(), id(16));
    assert!(tree.find(&key(31)).is_none());
    assert_eq!(tree.find(&key(32)), Some(n));
    assert!(tree.lower_bound(&key(99)).is_none());
}

#[test]
fn test_clear() {
    let mut tree = Tree::new();
    let n = tree.insert(id(1), key(1), false);
    let handle = tree.handle(n);
    tree.insert(id(2), key(2), true);

    tree.clear();

    assert!(tree.is_empty());
    assert_eq!(tree.len(), 0);
    assert_eq!(tree.hidden_len(), 0);
    assert_eq!(tree.resolve(handle), None);
    tree.validate().unwrap();
}
