//! Snapshot Tests
//!
//! Tests verify:
//! - Encode/decode of a populated table
//! - Restore rebuilds order, hidden flags and counts
//! - Restore is never observed half done
//! - Corruption detection (magic, version, length, checksum)

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread;

use keytable::engine::KeyTable;
use keytable::key::{Column, ObjectKey, SortKey};
use keytable::snapshot::{self, SnapshotRow, HEADER_SIZE};
use keytable::KeyTableError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn populated_table() -> KeyTable {
    let table = KeyTable::new();
    table
        .upsert(ObjectKey::new(1, 0), SortKey::strings(&["b"]), false)
        .unwrap();
    table
        .upsert(
            ObjectKey::new(2, 1),
            SortKey::new(vec![Column::null(), Column::integer(-4).desc()]),
            true,
        )
        .unwrap();
    table
        .upsert(ObjectKey::new(3, 0), SortKey::new(vec![Column::float(2.5)]), false)
        .unwrap();
    table
}

fn assert_corrupted(result: keytable::Result<Vec<SnapshotRow>>) {
    assert!(
        matches!(result, Err(KeyTableError::Corrupted(_))),
        "expected corruption, got {:?}",
        result
    );
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_restore_rebuilds_table() {
    let table = populated_table();
    let bytes = snapshot::encode(&table.snapshot()).unwrap();

    let restored = KeyTable::new();
    let rows = snapshot::decode(&bytes).unwrap();
    assert_eq!(restored.restore(rows).unwrap(), 3);

    assert_eq!(restored.snapshot(), table.snapshot());
    assert_eq!(restored.row_count(), (2, 0));
    assert!(restored.is_hidden(ObjectKey::new(2, 1)).unwrap());
    restored.check_invariants().unwrap();
}

#[test]
fn test_empty_snapshot() {
    let bytes = snapshot::encode(&[]).unwrap();
    assert!(snapshot::decode(&bytes).unwrap().is_empty());
}

#[test]
fn test_snapshot_file_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("table.ktsn");

    let table = populated_table();
    std::fs::write(&path, snapshot::encode(&table.snapshot()).unwrap()).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(snapshot::decode(&bytes).unwrap(), table.snapshot());
}

#[test]
fn test_restore_is_atomic_for_other_callers() {
    let rows_for = |n: u32| -> Vec<SnapshotRow> {
        (0..n)
            .map(|i| SnapshotRow {
                id: ObjectKey::new(i, 0),
                key: SortKey::strings(&[&format!("{:04}", i)]),
                hidden: false,
            })
            .collect()
    };
    let (small, large) = (rows_for(20), rows_for(50));

    let table = Arc::new(KeyTable::new());
    table.restore(large.clone()).unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let observer = {
        let table = Arc::clone(&table);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(AtomicOrdering::Relaxed) {
                let len = table.len();
                assert!(len == 20 || len == 50, "saw a half-restored table of {} rows", len);
            }
        })
    };

    for round in 0..200 {
        let rows = if round % 2 == 0 { small.clone() } else { large.clone() };
        table.restore(rows).unwrap();
    }
    done.store(true, AtomicOrdering::Relaxed);
    observer.join().unwrap();

    assert_eq!(table.len(), large.len());
    table.check_invariants().unwrap();
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_truncated_frame() {
    let bytes = snapshot::encode(&populated_table().snapshot()).unwrap();
    assert_corrupted(snapshot::decode(&bytes[..5]));
    assert_corrupted(snapshot::decode(&bytes[..bytes.len() - 1]));
}

#[test]
fn test_bad_magic() {
    let mut bytes = snapshot::encode(&populated_table().snapshot()).unwrap().to_vec();
    bytes[0] = b'X';
    assert_corrupted(snapshot::decode(&bytes));
}

#[test]
fn test_bad_version() {
    let mut bytes = snapshot::encode(&populated_table().snapshot()).unwrap().to_vec();
    bytes[5] = 9;
    assert_corrupted(snapshot::decode(&bytes));
}

#[test]
fn test_flipped_payload_bit() {
    let mut bytes = snapshot::encode(&populated_table().snapshot()).unwrap().to_vec();
    bytes[HEADER_SIZE + 2] ^= 0x01;
    assert_corrupted(snapshot::decode(&bytes));
}

#[test]
fn test_row_count_mismatch() {
    let mut bytes = snapshot::encode(&populated_table().snapshot()).unwrap().to_vec();
    bytes[9] = bytes[9].wrapping_add(1);
    assert_corrupted(snapshot::decode(&bytes));
}
