//! DriftKV CLI
//!
//! Command-line interface for operating on a DriftKV log file.

use std::path::Path;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use driftkv::{Config, DriftError, LogStore, SyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// DriftKV CLI
#[derive(Parser, Debug)]
#[command(name = "driftkv-cli")]
#[command(about = "CLI for the DriftKV log-structured key-value store")]
#[command(version)]
struct Args {
    /// Log file
    #[arg(short, long, default_value = "data.db")]
    db: String,

    /// When to fsync: "every-write", "on-close", or a number of appends
    #[arg(short, long, default_value = "every-write", value_parser = parse_sync)]
    sync: SyncStrategy,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Store(StoreCommand),

    /// Replay the log and report what it holds
    Verify,
}

/// Commands that run against an open store
#[derive(Subcommand, Debug)]
enum StoreCommand {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// List live keys
    Keys,
}

fn parse_sync(s: &str) -> Result<SyncStrategy, String> {
    match s {
        "every-write" => Ok(SyncStrategy::EveryWrite),
        "on-close" => Ok(SyncStrategy::OnClose),
        n => n
            .parse::<usize>()
            .map(|count| SyncStrategy::EveryNEntries { count })
            .map_err(|_| format!("expected every-write, on-close or a count, got {:?}", n)),
    }
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(DriftError::KeyNotFound) => {
            println!("(not found)");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> driftkv::Result<()> {
    match args.command {
        // Verify never opens the store, so a corrupt log can still be inspected
        Commands::Verify => verify(Path::new(&args.db)),
        Commands::Store(command) => {
            let config = Config::builder()
                .path(&args.db)
                .sync_strategy(args.sync)
                .build()?;
            let mut store = LogStore::open(config)?;
            apply(&mut store, command)?;
            store.close()
        }
    }
}

fn apply(store: &mut LogStore, command: StoreCommand) -> driftkv::Result<()> {
    match command {
        StoreCommand::Get { key } => {
            let value = store.get(key.as_bytes())?;
            println!("{}", String::from_utf8_lossy(&value));
        }
        StoreCommand::Set { key, value } => {
            store.set(key.as_bytes(), value.as_bytes())?;
        }
        StoreCommand::Del { key } => {
            store.delete(key.as_bytes())?;
        }
        StoreCommand::Keys => {
            let mut keys = store.keys();
            keys.sort();
            for key in keys {
                println!("{}", String::from_utf8_lossy(&key));
            }
        }
    }
    Ok(())
}

fn verify(path: &Path) -> driftkv::Result<()> {
    let stats = LogStore::verify(path)?;
    println!(
        "ok: {} records ({} tombstones), {} live keys, {} bytes",
        stats.records, stats.tombstones, stats.live_keys, stats.bytes
    );
    Ok(())
}
