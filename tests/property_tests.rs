//! Property-based tests for KeyTable.
//!
//! Random operation sequences are applied both to a table and to a simple
//! map model; the table must stay structurally valid after every step and
//! agree with the model on order and counts.

use std::collections::BTreeMap;

use keytable::engine::KeyTable;
use keytable::key::{compare_rows, Column, ObjectKey, SortKey};
use keytable::SeekOrigin;
use proptest::prelude::*;

// =============================================================================
// Test helpers
// =============================================================================

#[derive(Clone, Debug)]
enum Op {
    Upsert { id: u32, key: SortKey, hidden: bool },
    Partial { id: u32, column: Column },
    Delete { id: u32 },
    Hide { id: u32 },
    Unhide { id: u32 },
}

/// Column 0: small string alphabet or NULL; column 1: descending integer
fn arbitrary_key() -> impl Strategy<Value = SortKey> {
    (
        prop::option::weighted(0.9, 0u8..8),
        prop::option::of(-20i64..20),
    )
        .prop_map(|(first, second)| {
            let mut columns = vec![match first {
                Some(c) => Column::string(&((b'a' + c) as char).to_string()),
                None => Column::null(),
            }];
            if let Some(v) = second {
                columns.push(Column::integer(v).desc());
            }
            SortKey::new(columns)
        })
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u32..150, arbitrary_key(), prop::bool::weighted(0.2))
            .prop_map(|(id, key, hidden)| Op::Upsert { id, key, hidden }),
        1 => (0u32..150, 0u8..8)
            .prop_map(|(id, c)| Op::Partial { id, column: Column::string(&((b'a' + c) as char).to_string()) }),
        2 => (0u32..150).prop_map(|id| Op::Delete { id }),
        1 => (0u32..150).prop_map(|id| Op::Hide { id }),
        1 => (0u32..150).prop_map(|id| Op::Unhide { id }),
    ]
}

type Model = BTreeMap<ObjectKey, (SortKey, bool)>;

fn apply(table: &KeyTable, model: &mut Model, op: &Op) {
    match op {
        Op::Upsert { id, key, hidden } => {
            let id = ObjectKey::new(*id, 0);
            table.upsert(id, key.clone(), *hidden).unwrap();
            model.insert(id, (key.clone(), *hidden));
        }
        Op::Partial { id, column } => {
            let id = ObjectKey::new(*id, 0);
            let result = table.update_partial_key(id, 0, column.clone(), false);
            match model.get_mut(&id) {
                Some((key, hidden)) => {
                    result.unwrap();
                    key.set_column(0, column.clone());
                    *hidden = false;
                }
                None => assert!(result.is_err()),
            }
        }
        Op::Delete { id } => {
            let id = ObjectKey::new(*id, 0);
            let result = table.delete(id);
            assert_eq!(result.is_ok(), model.remove(&id).is_some());
        }
        Op::Hide { id } | Op::Unhide { id } => {
            let id = ObjectKey::new(*id, 0);
            let hide = matches!(op, Op::Hide { .. });
            let affected = if hide {
                table.hide_rows(&[id])
            } else {
                table.unhide_rows(&[id])
            };
            let expected = match model.get_mut(&id) {
                Some((_, hidden)) if *hidden != hide => {
                    *hidden = hide;
                    vec![id]
                }
                _ => vec![],
            };
            assert_eq!(affected, expected);
        }
    }
}

fn model_order(model: &Model) -> Vec<ObjectKey> {
    let mut rows: Vec<_> = model.iter().collect();
    rows.sort_by(|(a_id, (a_key, _)), (b_id, (b_key, _))| compare_rows(a_key, **a_id, b_key, **b_id));
    rows.into_iter().map(|(id, _)| *id).collect()
}

// =============================================================================
// Structural properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_random_ops_keep_invariants(ops in prop::collection::vec(arbitrary_op(), 1..2000)) {
        let table = KeyTable::new();
        let mut model = Model::new();

        for op in &ops {
            apply(&table, &mut model, op);
            prop_assert!(table.check_invariants().is_ok(), "{:?}", table.check_invariants());
        }

        let visible = model.values().filter(|(_, hidden)| !hidden).count() as u32;
        prop_assert_eq!(table.row_count().0, visible);
        prop_assert_eq!(table.len(), model.len());

        let order: Vec<_> = table.snapshot().into_iter().map(|row| row.id).collect();
        prop_assert_eq!(order, model_order(&model));

        let expected_visible: Vec<_> = model_order(&model)
            .into_iter()
            .filter(|id| !model[id].1)
            .collect();
        table.seek_row(None, SeekOrigin::Set, 0).unwrap();
        prop_assert_eq!(table.query_rows(u32::MAX, false, false), expected_visible);
    }

    #[test]
    fn prop_forward_backward_mirror(keys in prop::collection::vec(arbitrary_key(), 0..300)) {
        let table = KeyTable::new();
        for (i, key) in keys.into_iter().enumerate() {
            table.upsert(ObjectKey::new(i as u32, 0), key, false).unwrap();
        }

        table.seek_row(None, SeekOrigin::Set, 0).unwrap();
        let forward = table.query_rows(1000, false, true);
        table.seek_row(None, SeekOrigin::End, 0).unwrap();
        let mut backward = table.query_rows(1000, true, true);
        backward.reverse();

        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn prop_upsert_twice_is_noop(
        keys in prop::collection::vec(arbitrary_key(), 1..100),
        pick in any::<prop::sample::Index>(),
        hidden in any::<bool>(),
    ) {
        let table = KeyTable::new();
        for (i, key) in keys.iter().enumerate() {
            table.upsert(ObjectKey::new(i as u32, 0), key.clone(), false).unwrap();
        }
        let i = pick.index(keys.len());
        let id = ObjectKey::new(i as u32, 0);
        table.seek_row(None, SeekOrigin::Set, (keys.len() / 2) as i32).unwrap();

        let first = table.upsert(id, keys[i].clone(), hidden).unwrap();
        let state = (table.snapshot(), table.row_count(), table.current_row());
        let second = table.upsert(id, keys[i].clone(), hidden).unwrap();

        prop_assert_eq!(first, second);
        prop_assert_eq!(state, (table.snapshot(), table.row_count(), table.current_row()));
    }

    #[test]
    fn prop_bookmark_tracks_inserts_before(n in 1u32..120, k in any::<prop::sample::Index>(), m in 0u32..40) {
        let table = KeyTable::new();
        for i in 0..n {
            table.upsert(ObjectKey::new(i, 0), SortKey::strings(&[&format!("m{:04}", i)]), false).unwrap();
        }
        let k = k.index(n as usize) as i32;
        table.seek_row(None, SeekOrigin::Set, k).unwrap();
        let bookmark = table.create_bookmark().unwrap();

        for j in 0..m {
            table.upsert(ObjectKey::new(10_000 + j, 0), SortKey::strings(&[&format!("a{:04}", j)]), false).unwrap();
        }

        table.seek_row(Some(bookmark), SeekOrigin::Current, 0).unwrap();
        prop_assert_eq!(table.row_count().1, k as u32 + m);
        prop_assert_eq!(table.get_bookmark(bookmark).unwrap(), k as u32 + m);
    }

    #[test]
    fn prop_hide_unhide_conserves_count(
        n in 1u32..200,
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..50),
    ) {
        let table = KeyTable::new();
        for i in 0..n {
            table.upsert(ObjectKey::new(i, 0), SortKey::strings(&[&format!("{:04}", (i * 13) % 211)]), false).unwrap();
        }
        let before = (table.row_count(), table.snapshot());

        let ids: Vec<_> = picks.iter().map(|p| ObjectKey::new(p.index(n as usize) as u32, 0)).collect();
        table.hide_rows(&ids);
        table.unhide_rows(&ids);

        prop_assert_eq!(before, (table.row_count(), table.snapshot()));
        prop_assert!(table.check_invariants().is_ok());
    }
}
