//! emberkv CLI
//!
//! Runs single operations against a data directory.

use std::process;

use clap::{Parser, Subcommand};
use emberkv::{Config, EmberError, Engine, IndexFormat};
use tracing_subscriber::{fmt, EnvFilter};

/// emberkv CLI
#[derive(Parser, Debug)]
#[command(name = "emberkv-cli")]
#[command(about = "CLI for the emberkv embedded key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./emberkv_data")]
    data_dir: String,

    /// Write the index as text lines instead of binary records
    #[arg(long)]
    text_index: bool,

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
    Put {
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

    /// List live records in key order
    Scan {
        /// Start key (inclusive)
        #[arg(short, long, default_value = "")]
        from: String,

        /// Stop after this many records
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print table statistics
    Stats,
}

fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,emberkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> emberkv::Result<()> {
    let format = if args.text_index {
        IndexFormat::Text
    } else {
        IndexFormat::Binary
    };
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .index_format(format)
        .build();

    let mut engine = Engine::open(config)?;

    match args.command {
        Commands::Get { key } => match engine.get(key.as_bytes()) {
            Ok(value) => println!("{}", String::from_utf8_lossy(&value)),
            Err(EmberError::KeyNotFound) => println!("(not found)"),
            Err(e) => return Err(e),
        },
        Commands::Put { key, value } => {
            engine.upsert(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Del { key } => {
            engine.remove(key.as_bytes())?;
            println!("OK");
        }
        Commands::Scan { from, limit } => {
            let records = engine.range(from.as_bytes()).take(limit.unwrap_or(usize::MAX));
            for record in records {
                let (key, value) = record?;
                println!(
                    "{}\t{}",
                    String::from_utf8_lossy(&key),
                    String::from_utf8_lossy(&value)
                );
            }
        }
        Commands::Stats => {
            println!("emberkv {}", emberkv::VERSION);
            println!("data dir:    {}", engine.data_dir().display());
            println!("index:       {}", engine.index_path().display());
            println!("blob:        {}", engine.blob_path().display());
            println!("generation:  {}", engine.generation());
            println!("entries:     {}", engine.disk_entry_count());
        }
    }

    engine.close()
}
