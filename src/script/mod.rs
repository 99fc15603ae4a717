//! Script Module
//!
//! A line-oriented command language for driving a table by hand: replaying
//! traces, reproducing bug reports and writing readable scenario tests.
//!
//! ## Example
//! ```text
//! upsert 1:0 s:alpha
//! upsert 2:0 hidden s:beta
//! seek set 0
//! query 10 all        # ROWS 1:0 2:0
//! count               # COUNT 1 AT 1
//! ```

mod command;
mod parser;
mod response;

pub use command::{BookmarkOp, Command};
pub use parser::{parse_column, parse_id, parse_line};
pub use response::Response;

use std::fs;
use std::path::Path;

use crate::engine::KeyTable;
use crate::error::Result;

/// Run every line of `text` against `table`, one output line per command.
///
/// Failing lines (parse or execution) produce `ERR <message>` and the script
/// carries on.
pub fn run(table: &KeyTable, text: &str) -> Vec<String> {
    let mut output = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let result = parse_line(index + 1, line).and_then(|command| match command {
            Some(command) => table.execute(command).map(Some),
            None => Ok(None),
        });
        match result {
            Ok(Some(response)) => output.push(response.to_string()),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "script command failed");
                output.push(format!("ERR {}", e));
            }
        }
    }
    output
}

/// Read a script file and [`run`] it
pub fn run_file(table: &KeyTable, path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    Ok(run(table, &text))
}
