use std::fmt;

use sop_core::model::{EnvironmentId, ProcessId};
use storage::demo::seed_demo;
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    environment_id: EnvironmentId,
    process_id: ProcessId,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidEnvironmentId { raw: String },
    InvalidProcessId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidEnvironmentId { raw } => {
                write!(f, "invalid --environment-id value: {raw}")
            }
            ArgsError::InvalidProcessId { raw } => write!(f, "invalid --process-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("SOP_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut environment_id = EnvironmentId::new(1);
        let mut process_id = ProcessId::new(1);

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--environment-id" => {
                    let value = require_value(&mut args, "--environment-id")?;
                    environment_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidEnvironmentId { raw: value.clone() })?;
                }
                "--process-id" => {
                    let value = require_value(&mut args, "--process-id")?;
                    process_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidProcessId { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            environment_id,
            process_id,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --environment-id <id>     Environment to write zones into (default: 1)");
    eprintln!("  --process-id <id>         Process id to upsert (default: 1)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  SOP_DB_URL");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let summary = seed_demo(&storage, args.environment_id, args.process_id).await?;

    println!(
        "Seeded environment {} with {} zones and process {} with {} steps into {}",
        summary.environment_id,
        summary.zones,
        summary.process_id,
        summary.steps,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
