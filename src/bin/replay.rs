//! KeyTable Replay Binary
//!
//! Runs a command script against a fresh table and prints each response.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use keytable::{script, snapshot, Config, KeyTable};
use tracing_subscriber::{fmt, EnvFilter};

/// KeyTable script replayer
#[derive(Parser, Debug)]
#[command(name = "keytable-replay")]
#[command(about = "Replay a command script against an ordered table view")]
#[command(version)]
struct Args {
    /// Command script to run
    #[arg(short, long)]
    script: PathBuf,

    /// Maximum live bookmarks
    #[arg(short, long, default_value = "100")]
    max_bookmarks: usize,

    /// Expected number of sort columns
    #[arg(short, long)]
    columns: Option<usize>,

    /// Reject sort keys that do not have exactly --columns columns
    #[arg(long, requires = "columns")]
    strict: bool,

    /// Snapshot to load before running the script
    #[arg(short, long)]
    load: Option<PathBuf>,

    /// Write a snapshot after the script finishes
    #[arg(long)]
    save: Option<PathBuf>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,keytable=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::info!("KeyTable replay v{}", keytable::VERSION);

    let mut builder = Config::builder()
        .max_bookmarks(args.max_bookmarks)
        .strict_shape(args.strict);
    if let Some(columns) = args.columns {
        builder = builder.sort_columns(columns);
    }
    let table = KeyTable::with_config(builder.build());

    if let Some(path) = &args.load {
        let restored = fs::read(path)
            .map_err(keytable::KeyTableError::from)
            .and_then(|bytes| snapshot::decode(&bytes))
            .and_then(|rows| table.restore(rows));
        match restored {
            Ok(rows) => tracing::info!("Loaded {} rows from {}", rows, path.display()),
            Err(e) => {
                tracing::error!("Failed to load snapshot {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }

    match script::run_file(&table, &args.script) {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
        }
        Err(e) => {
            tracing::error!("Failed to run script {}: {}", args.script.display(), e);
            std::process::exit(1);
        }
    }

    if let Some(path) = &args.save {
        let saved = snapshot::encode(&table.snapshot())
            .and_then(|bytes| fs::write(path, &bytes).map_err(Into::into));
        if let Err(e) = saved {
            tracing::error!("Failed to save snapshot {}: {}", path.display(), e);
            std::process::exit(1);
        }
        tracing::info!("Saved {} rows to {}", table.len(), path.display());
    }
}
