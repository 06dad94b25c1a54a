use std::io::BufReader;

use services::{Clock, TrackingService};
use storage::demo::seed_demo;
use storage::repository::Storage;
use tracing_subscriber::{EnvFilter, fmt};

mod config;
mod replay;

use config::{Args, Input, prepare_sqlite_file};

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app seed   [--db <url>] [--environment-id <id>] [--process-id <id>]");
    eprintln!("  app replay [--db <url>] [--environment-id <id>] [--process-id <id>]");
    eprintln!("             [--input <path>|-] [--confidence <0..1>] [--hand-offset <px>]");
    eprintln!();
    eprintln!("replay reads JSON lines, each either a zone signal");
    eprintln!("  {{\"zone_id\",\"contained\",\"confidence\",\"timestamp\"}}");
    eprintln!("or a pose frame");
    eprintln!("  {{\"timestamp\",\"people\":[[keypoint; 17]]}}");
    eprintln!("and prints the adherence report.");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:dev.sqlite3");
    eprintln!("  --environment-id 1 --process-id 1");
    eprintln!("  --input - (stdin)");
    eprintln!("  --confidence 0.5 --hand-offset 30");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SOP_DB_URL, SOP_CONFIDENCE_THRESHOLD, SOP_HAND_OFFSET_PX, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Seed,
    Replay,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "seed" => Some(Self::Seed),
            "replay" => Some(Self::Replay),
            _ => None,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let first = argv.next();
    let cmd = match first.as_deref() {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(&mut argv, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite here so core and services never touch the filesystem.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    match cmd {
        Command::Seed => {
            let summary = seed_demo(&storage, parsed.environment_id, parsed.process_id).await?;
            println!(
                "Seeded environment {} with {} zones and process {} with {} steps into {}",
                summary.environment_id,
                summary.zones,
                summary.process_id,
                summary.steps,
                parsed.db_url
            );
            Ok(())
        }
        Command::Replay => {
            let lines = match &parsed.input {
                Input::Stdin => replay::read_lines(std::io::stdin().lock())?,
                Input::File(path) => {
                    replay::read_lines(BufReader::new(std::fs::File::open(path)?))?
                }
            };
            let service =
                TrackingService::from_storage(Clock::default(), &storage, parsed.settings);
            let report =
                replay::replay(&service, parsed.environment_id, parsed.process_id, lines).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
