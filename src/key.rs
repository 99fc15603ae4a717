//! Row identity and sort keys
//!
//! Every row in a table is identified by an [`ObjectKey`] and positioned by a
//! [`SortKey`]. The comparator here defines the single total order used by the
//! tree, the cursor and every lookup.
//!
//! ## Ordering Rules
//! - Columns are compared left to right; the first difference decides.
//! - A NULL column sorts before any non-null value, in both directions.
//! - Non-null values compare as unsigned lexicographic bytes; the result is
//!   reversed when either side's column is flagged descending (tables are
//!   expected to flag a given column the same way on every row).
//! - A column missing from a shorter key compares as NULL.
//! - Equal sort keys are tie-broken by `ObjectKey`, so no two rows share a position.
//!
//! Values are never interpreted: callers that want numeric or locale-aware
//! ordering encode into order-preserving bytes first (see [`Column::integer`]
//! and [`Column::float`]).

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// ObjectKey
// =============================================================================

/// Permanent identity of a row: `(object_id, suborder_id)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub object_id: u32,
    pub suborder_id: u32,
}

impl ObjectKey {
    pub const fn new(object_id: u32, suborder_id: u32) -> Self {
        Self {
            object_id,
            suborder_id,
        }
    }
}

impl From<(u32, u32)> for ObjectKey {
    fn from((object_id, suborder_id): (u32, u32)) -> Self {
        Self::new(object_id, suborder_id)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_id, self.suborder_id)
    }
}

// =============================================================================
// Column
// =============================================================================

/// What the column bytes were encoded from.
///
/// Advisory only: the comparator treats every kind as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Bytes,
    String,
    Float,
    Integer,
}

/// One column of a sort key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub kind: ColumnKind,
    pub descending: bool,
    pub is_null: bool,
    pub bytes: Vec<u8>,
}

impl Column {
    /// Raw bytes column
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: ColumnKind::Bytes,
            descending: false,
            is_null: false,
            bytes: bytes.into(),
        }
    }

    /// UTF-8 string column (compared bytewise, not collated)
    pub fn string(value: &str) -> Self {
        Self {
            kind: ColumnKind::String,
            ..Self::bytes(value.as_bytes())
        }
    }

    /// Signed integer, encoded big-endian with the sign bit flipped so that
    /// byte order matches numeric order.
    pub fn integer(value: i64) -> Self {
        let encoded = (value as u64) ^ (1 << 63);
        Self {
            kind: ColumnKind::Integer,
            ..Self::bytes(encoded.to_be_bytes().to_vec())
        }
    }

    /// IEEE-754 double, encoded so that byte order matches numeric order
    /// (negative values have all bits inverted, positive values the sign bit set).
    pub fn float(value: f64) -> Self {
        let bits = value.to_bits();
        let encoded = if bits >> 63 == 1 { !bits } else { bits | (1 << 63) };
        Self {
            kind: ColumnKind::Float,
            ..Self::bytes(encoded.to_be_bytes().to_vec())
        }
    }

    /// NULL column
    pub fn null() -> Self {
        Self {
            kind: ColumnKind::Bytes,
            descending: false,
            is_null: true,
            bytes: Vec::new(),
        }
    }

    /// Same column, sorted descending
    pub fn desc(mut self) -> Self {
        self.descending = true;
        self
    }
}

/// Compare two (possibly missing) columns. Missing means NULL.
fn compare_column(a: Option<&Column>, b: Option<&Column>) -> Ordering {
    let a_null = a.map_or(true, |c| c.is_null);
    let b_null = b.map_or(true, |c| c.is_null);

    match (a, b) {
        (Some(a), Some(b)) if !a_null && !b_null => {
            let ord = a.bytes.cmp(&b.bytes);
            if a.descending || b.descending {
                ord.reverse()
            } else {
                ord
            }
        }
        _ => b_null.cmp(&a_null),
    }
}

// =============================================================================
// SortKey
// =============================================================================

/// Ordered sequence of columns positioning a row
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortKey(Vec<Column>);

impl SortKey {
    pub fn new(columns: Vec<Column>) -> Self {
        Self(columns)
    }

    /// Key of ascending string columns
    pub fn strings(values: &[&str]) -> Self {
        Self(values.iter().map(|v| Column::string(v)).collect())
    }

    pub fn columns(&self) -> &[Column] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Column> {
        self.0.get(index)
    }

    /// Replace one column, padding with NULL columns if the key is shorter
    pub fn set_column(&mut self, index: usize, column: Column) {
        if index >= self.0.len() {
            self.0.resize(index + 1, Column::null());
        }
        self.0[index] = column;
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.0
    }
}

impl From<Vec<Column>> for SortKey {
    fn from(columns: Vec<Column>) -> Self {
        Self(columns)
    }
}

/// Total order over sort keys
pub fn compare(a: &SortKey, b: &SortKey) -> Ordering {
    compare_prefix(a, b, a.len().max(b.len()))
}

/// Compare only the first `n_columns` columns
pub fn compare_prefix(a: &SortKey, b: &SortKey, n_columns: usize) -> Ordering {
    (0..n_columns)
        .map(|i| compare_column(a.get(i), b.get(i)))
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Row order: sort key first, identity as tie-breaker
pub fn compare_rows(a_key: &SortKey, a_id: ObjectKey, b_key: &SortKey, b_id: ObjectKey) -> Ordering {
    compare(a_key, b_key).then_with(|| a_id.cmp(&b_id))
}
