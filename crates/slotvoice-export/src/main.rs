//! Export logged slot commentary exchanges to a CSV file.
//!
//! # Examples
//!
//! ```sh
//! # Everything from March 2024 onward
//! slotvoice-export --start 2024-03-01 --store-dir ./prompts
//!
//! # One week, to march.csv
//! slotvoice-export --start 2024-03-01 --end 2024-03-07 --file march
//!
//! # Records written by the older client
//! slotvoice-export --old --file legacy.csv
//! ```

use std::path::PathBuf;
use std::process;

use chrono::{Local, NaiveDate};
use clap::Parser;
use slotvoice::config::SlotConfig;
use slotvoice::store::FsStore;
use slotvoice_export::{ExportFilter, export_to_file, output_path, parse_date};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Export logged exchanges to CSV.
#[derive(Parser)]
#[command(name = "slotvoice-export")]
struct Cli {
    /// Export records written by the older client (`win*`/`lose*` keys)
    #[arg(long, conflicts_with_all = ["start", "end"])]
    old: bool,

    /// First day to export (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, required_unless_present = "old")]
    start: Option<NaiveDate>,

    /// Last day to export, inclusive (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, requires = "start")]
    end: Option<NaiveDate>,

    /// Output file; `.csv` is appended when the name has no extension
    #[arg(long)]
    file: Option<String>,

    /// Exchange log directory (defaults to SLOTVOICE_STORE_DIR)
    #[arg(long)]
    store_dir: Option<PathBuf>,
}

impl Cli {
    fn filter(&self) -> Result<ExportFilter, String> {
        if self.old {
            return Ok(ExportFilter::Legacy);
        }
        let start = self
            .start
            .ok_or_else(|| "one of --old or --start is required".to_string())?;
        if let Some(end) = self.end
            && end < start
        {
            return Err(format!("--end {end} is before --start {start}"));
        }
        Ok(ExportFilter::DateRange {
            start,
            end: self.end,
        })
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let filter = cli.filter()?;

    let store_dir = cli
        .store_dir
        .clone()
        .or_else(|| SlotConfig::from_env().store_dir)
        .ok_or_else(|| "no store directory: pass --store-dir or set SLOTVOICE_STORE_DIR".to_string())?;
    if !store_dir.is_dir() {
        return Err(format!("store directory {} does not exist", store_dir.display()));
    }
    let store = FsStore::new(&store_dir)
        .map_err(|e| format!("cannot open store at {}: {e}", store_dir.display()))?;

    let path = output_path(cli.file.as_deref());
    let written = export_to_file(&store, &filter, &path, &Local).await?;
    println!("Exported {written} record(s) to {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
