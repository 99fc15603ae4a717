//! Response definitions
//!
//! Results of executed commands, rendered one line each.

use std::fmt;

use crate::bookmark::BookmarkId;
use crate::engine::RowChange;
use crate::key::ObjectKey;

/// Result of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok,
    Change(RowChange),
    Moved(i32),
    Rows(Vec<ObjectKey>),
    Count { total: u32, current: u32 },
    Bookmark(BookmarkId),
    Position(u32),
    Row(Option<ObjectKey>),
}

struct OptRow(Option<ObjectKey>);

impl fmt::Display for OptRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "{}", id),
            None => f.write_str("-"),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => f.write_str("OK"),
            Response::Change(change) => {
                write!(f, "{:?} after {}", change.action, OptRow(change.previous))
            }
            Response::Moved(rows) => write!(f, "MOVED {}", rows),
            Response::Rows(rows) => {
                f.write_str("ROWS")?;
                for id in rows {
                    write!(f, " {}", id)?;
                }
                Ok(())
            }
            Response::Count { total, current } => write!(f, "COUNT {} AT {}", total, current),
            Response::Bookmark(id) => write!(f, "BOOKMARK {}", id),
            Response::Position(pos) => write!(f, "POSITION {}", pos),
            Response::Row(row) => write!(f, "ROW {}", OptRow(*row)),
        }
    }
}
