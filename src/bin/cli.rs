//! flashkv CLI
//!
//! Runs store operations against a flash image file, creating the image
//! fully erased when it does not exist yet.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use flashkv::{Config, Engine, FileFlash, Snapshot};
use tracing_subscriber::{fmt, EnvFilter};

/// flashkv CLI
#[derive(Parser, Debug)]
#[command(name = "flashkv")]
#[command(about = "Key-value store on a flash image file")]
#[command(version)]
struct Args {
    /// Flash image file
    #[arg(short, long, default_value = "flashkv.img")]
    image: PathBuf,

    /// Bytes reserved for the store (both regions)
    #[arg(short, long, default_value = "65536")]
    size: u32,

    /// Erase block size in bytes
    #[arg(short, long, default_value = "2048")]
    block_size: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
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

    /// List every live pair
    List,

    /// Compact the active region
    Gc,

    /// Show space usage and recovery details
    Status,

    /// Remove every key
    Clear,

    /// Write a snapshot of all pairs to a file
    Export {
        /// Snapshot file to create
        file: PathBuf,
    },

    /// Set every pair from a snapshot file
    Import {
        /// Snapshot file to read
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    // Logs go to stderr so command output stays pipeable
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flashkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> flashkv::Result<()> {
    let config = Config::builder()
        .total_size(args.size)
        .block_size(args.block_size)
        .build();

    let flash = FileFlash::open(&args.image, args.size, args.block_size)?;
    let mut engine = Engine::open(flash, config)?;

    match args.command {
        Commands::Get { key } => {
            let value = engine.get(key.as_bytes())?;
            println!("{}", String::from_utf8_lossy(&value));
        }
        Commands::Set { key, value } => {
            engine.set(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Del { key } => {
            engine.delete(key.as_bytes())?;
            println!("OK");
        }
        Commands::List => {
            for item in engine.iter()? {
                let (key, value) = item?;
                println!(
                    "{} = {}",
                    String::from_utf8_lossy(&key),
                    String::from_utf8_lossy(&value)
                );
            }
        }
        Commands::Gc => {
            let stats = engine.gc()?;
            println!(
                "copied {} records, dropped {} slots, reclaimed {} bytes",
                stats.records_copied, stats.slots_dropped, stats.bytes_reclaimed
            );
        }
        Commands::Status => {
            let status = engine.status();
            let report = engine.recovery();
            println!("active region:  {}", engine.active_region());
            println!("version:        {}", engine.version());
            println!("keys:           {}", engine.count());
            println!("used:           {} / {} bytes", status.used, status.total);
            println!("free:           {}%", engine.free_percent());
            if report.corrupt_skipped > 0 || report.scan_truncated {
                println!(
                    "recovery:       {} corrupt records skipped{}",
                    report.corrupt_skipped,
                    if report.scan_truncated { ", scan truncated" } else { "" }
                );
            }
        }
        Commands::Clear => {
            engine.clear()?;
            println!("OK");
        }
        Commands::Export { file } => {
            let snapshot = Snapshot::capture(&mut engine)?;
            fs::write(&file, snapshot.to_bytes()?).map_err(flashkv::FlashError::from)?;
            println!("exported {} pairs to {}", snapshot.len(), file.display());
        }
        Commands::Import { file } => {
            let data = fs::read(&file).map_err(flashkv::FlashError::from)?;
            let restored = Snapshot::from_bytes(&data)?.restore(&mut engine)?;
            println!("imported {} pairs from {}", restored, file.display());
        }
    }

    Ok(())
}
