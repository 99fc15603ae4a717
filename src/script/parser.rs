//! Script parser
//!
//! ## Grammar
//! ```text
//! line    := command? ('#' comment)?
//! id      := object_id (':' suborder_id)?
//! column  := 'desc:'? ( 'null' | 's:' text | 'x:' hex | 'i:' int | 'f:' float )
//! ```
//! Tokens are whitespace separated, so string columns cannot contain spaces
//! (use `x:` for arbitrary bytes).

use crate::cursor::SeekOrigin;
use crate::error::{KeyTableError, Result};
use crate::key::{Column, ObjectKey, SortKey};

use super::{BookmarkOp, Command};

/// Parse one line; `None` for blank and comment-only lines
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<Command>> {
    let line = line.split('#').next().unwrap_or("");
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&verb, args)) = tokens.split_first() else {
        return Ok(None);
    };
    let err = |message: String| KeyTableError::Parse {
        line: line_no,
        message,
    };

    let command = match verb {
        "upsert" => {
            let (id, rest) = split_id(args).map_err(err)?;
            let (hidden, rest) = match rest.split_first() {
                Some((&"hidden", rest)) => (true, rest),
                _ => (false, rest),
            };
            Command::Upsert {
                id,
                key: parse_key(rest).map_err(err)?,
                hidden,
            }
        }
        "partial" => match args {
            [id, index, column, flags @ ..] => Command::Partial {
                id: parse_id(id).map_err(err)?,
                column_index: parse_num(index).map_err(err)?,
                column: parse_column(column).map_err(err)?,
                hidden: parse_hidden_flag(flags).map_err(err)?,
            },
            _ => return Err(err("usage: partial <id> <index> <column> [hidden]".into())),
        },
        "delete" => Command::Delete {
            id: single_id(args).map_err(err)?,
        },
        "seek" => match args {
            [origin, offset, rest @ ..] => {
                let origin = match *origin {
                    "set" => SeekOrigin::Set,
                    "cur" => SeekOrigin::Current,
                    "end" => SeekOrigin::End,
                    other => return Err(err(format!("unknown seek origin '{}'", other))),
                };
                let bookmark = match rest {
                    [] => None,
                    [bm] => match bm.strip_prefix("bm=") {
                        Some(n) => Some(parse_num(n).map_err(err)?),
                        None => return Err(err(format!("expected bm=<id>, got '{}'", bm))),
                    },
                    _ => return Err(err("too many seek arguments".into())),
                };
                Command::Seek {
                    origin,
                    offset: parse_num(offset).map_err(err)?,
                    bookmark,
                }
            }
            _ => return Err(err("usage: seek set|cur|end <offset> [bm=<id>]".into())),
        },
        "seekid" => Command::SeekId {
            id: single_id(args).map_err(err)?,
        },
        "query" => match args.split_first() {
            Some((count, flags)) => {
                let mut backward = false;
                let mut include_hidden = false;
                for flag in flags {
                    match *flag {
                        "back" => backward = true,
                        "all" => include_hidden = true,
                        other => return Err(err(format!("unknown query flag '{}'", other))),
                    }
                }
                Command::Query {
                    count: parse_num(count).map_err(err)?,
                    backward,
                    include_hidden,
                }
            }
            None => return Err(err("usage: query <count> [back] [all]".into())),
        },
        "count" => Command::Count,
        "bookmark" => match args {
            ["create"] => Command::Bookmark(BookmarkOp::Create),
            ["free", n] => Command::Bookmark(BookmarkOp::Free(parse_num(n).map_err(err)?)),
            ["get", n] => Command::Bookmark(BookmarkOp::Get(parse_num(n).map_err(err)?)),
            _ => return Err(err("usage: bookmark create|free <n>|get <n>".into())),
        },
        "hide" => Command::Hide {
            ids: parse_ids(args).map_err(err)?,
        },
        "unhide" => Command::Unhide {
            ids: parse_ids(args).map_err(err)?,
        },
        "find" => Command::Find {
            key: parse_key(args).map_err(err)?,
        },
        "lower" => Command::LowerBound {
            key: parse_key(args).map_err(err)?,
        },
        "prefix" => Command::Prefix {
            id: single_id(args).map_err(err)?,
        },
        "clear" => Command::Clear,
        "check" => Command::Check,
        other => return Err(err(format!("unknown command '{}'", other))),
    };
    Ok(Some(command))
}

// =============================================================================
// Token Parsers
// =============================================================================

pub fn parse_id(token: &str) -> std::result::Result<ObjectKey, String> {
    let (object, suborder) = token.split_once(':').unwrap_or((token, "0"));
    Ok(ObjectKey::new(parse_num(object)?, parse_num(suborder)?))
}

pub fn parse_column(token: &str) -> std::result::Result<Column, String> {
    if let Some(inner) = token.strip_prefix("desc:") {
        return parse_column(inner).map(Column::desc);
    }
    if token == "null" {
        return Ok(Column::null());
    }

    let Some((kind, value)) = token.split_once(':') else {
        return Err(format!("bad column '{}'", token));
    };
    match kind {
        "s" => Ok(Column::string(value)),
        "x" => parse_hex(value).map(Column::bytes),
        "i" => parse_num(value).map(Column::integer),
        "f" => parse_num(value).map(Column::float),
        _ => Err(format!("unknown column type '{}'", kind)),
    }
}

fn parse_key(tokens: &[&str]) -> std::result::Result<SortKey, String> {
    tokens
        .iter()
        .map(|t| parse_column(t))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(SortKey::new)
}

fn parse_ids(tokens: &[&str]) -> std::result::Result<Vec<ObjectKey>, String> {
    tokens.iter().map(|t| parse_id(t)).collect()
}

fn split_id<'a, 'b>(tokens: &'a [&'b str]) -> std::result::Result<(ObjectKey, &'a [&'b str]), String> {
    match tokens.split_first() {
        Some((id, rest)) => Ok((parse_id(id)?, rest)),
        None => Err("missing row id".to_string()),
    }
}

fn single_id(tokens: &[&str]) -> std::result::Result<ObjectKey, String> {
    match tokens {
        [id] => parse_id(id),
        _ => Err(format!("expected one row id, got {}", tokens.len())),
    }
}

fn parse_hidden_flag(tokens: &[&str]) -> std::result::Result<bool, String> {
    match tokens {
        [] => Ok(false),
        ["hidden"] => Ok(true),
        _ => Err(format!("unexpected arguments {:?}", tokens)),
    }
}

fn parse_num<T: std::str::FromStr>(token: &str) -> std::result::Result<T, String> {
    token
        .parse()
        .map_err(|_| format!("bad number '{}'", token))
}

fn parse_hex(value: &str) -> std::result::Result<Vec<u8>, String> {
    if value.len() % 2 != 0 {
        return Err(format!("odd-length hex '{}'", value));
    }
    (0..value.len())
        .step_by(2)
        .map(|i| {
            value
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("bad hex '{}'", value))
        })
        .collect()
}
