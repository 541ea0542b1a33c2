//! PStorage CLI
//!
//! Command-line interface for inspecting and editing a PStorage file on disk.

use clap::{Parser, Subcommand, ValueEnum};
use pstorage::{Config, Engine, PStorageError, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// PStorage CLI
#[derive(Parser, Debug)]
#[command(name = "pstorage-cli")]
#[command(about = "CLI for PStorage persistent key-value files")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./pstorage_data")]
    data_dir: String,

    /// Storage file name inside the data directory
    #[arg(short, long, default_value = "pstorage.dat")]
    file: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a fresh storage, discarding any existing one
    Create {
        /// Payload bytes to manage
        size: u32,
    },

    /// Set a value
    Set {
        /// Entry name (at most 5 bytes)
        name: String,

        /// The value to store (hex for bytes)
        value: String,

        /// Value type
        #[arg(short, long, value_enum, default_value = "string")]
        kind: Kind,
    },

    /// Get a value by name
    Get {
        /// Entry name
        name: String,
    },

    /// Remove every entry with this name
    Remove {
        /// Entry name
        name: String,
    },

    /// List every entry
    Dump,

    /// Show size accounting
    Stats,

    /// Check the entry chain
    Verify,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    Int,
    Uint,
    Long,
    Ulong,
    Float,
    String,
    Bytes,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), PStorageError> {
    let builder = Config::builder().data_dir(&args.data_dir).file_name(&args.file);

    match args.command {
        Commands::Create { size } => {
            let engine = Engine::create(builder.region_size(size).build())?;
            println!("Created storage of {} bytes", engine.storage_size());
            engine.close()
        }
        Commands::Set { name, value, kind } => {
            let value = parse_value(&value, kind)?;
            with_engine(builder.build(), |engine| engine.map_value(&name, &value))?;
            println!("OK");
            Ok(())
        }
        Commands::Get { name } => {
            let value = with_engine(builder.build(), |engine| engine.get_value(&name))?;
            println!("{}", value);
            Ok(())
        }
        Commands::Remove { name } => {
            if with_engine(builder.build(), |engine| engine.remove(&name))? {
                println!("OK");
            } else {
                println!("(not found)");
            }
            Ok(())
        }
        Commands::Dump => {
            print!("{}", with_engine(builder.build(), |engine| engine.dump())?);
            Ok(())
        }
        Commands::Stats => {
            let stats = with_engine(builder.build(), |engine| engine.stats())?;
            println!("storage size:   {}", stats.storage_size);
            println!("allocated size: {}", stats.allocated_size);
            println!("free size:      {}", stats.free_size);
            println!("largest free:   {}", stats.largest_free);
            println!(
                "entries:        {} ({} free)",
                stats.entry_count, stats.free_entry_count
            );
            Ok(())
        }
        Commands::Verify => {
            let count = with_engine(builder.build(), |engine| engine.verify())?;
            println!("OK ({} entries)", count);
            Ok(())
        }
    }
}

/// Open the storage, run `f`, and close it again
fn with_engine<T>(
    config: Config,
    f: impl FnOnce(&mut Engine) -> Result<T, PStorageError>,
) -> Result<T, PStorageError> {
    let mut engine = Engine::open(config)?;
    let out = f(&mut engine)?;
    engine.close()?;
    Ok(out)
}

fn parse_value(raw: &str, kind: Kind) -> Result<Value, PStorageError> {
    let invalid = |what: &str| PStorageError::Config(format!("'{}' is not a valid {}", raw, what));

    let value = match kind {
        Kind::Int => Value::Int(raw.parse().map_err(|_| invalid("int"))?),
        Kind::Uint => Value::UInt(raw.parse().map_err(|_| invalid("uint"))?),
        Kind::Long => Value::Long(raw.parse().map_err(|_| invalid("long"))?),
        Kind::Ulong => Value::ULong(raw.parse().map_err(|_| invalid("ulong"))?),
        Kind::Float => Value::Float(raw.parse().map_err(|_| invalid("float"))?),
        Kind::String => Value::String(raw.to_string()),
        Kind::Bytes => Value::Array(parse_hex(raw)?),
    };
    Ok(value)
}

fn parse_hex(raw: &str) -> Result<Vec<u8>, PStorageError> {
    hex::decode(raw)
        .map_err(|e| PStorageError::Config(format!("'{}' is not a valid hex byte string: {}", raw, e)))
}
