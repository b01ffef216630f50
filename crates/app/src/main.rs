//! Meal log command-line front end.
//!
//! ```bash
//! # Log a meal from grams on the package
//! meallog manual --name "salad chicken" --protein 24 --fat 1.5 --carbs 0.3
//!
//! # Scan a nutrition label photo (needs the `tesseract` feature)
//! meallog scan label.jpg --name "cup noodle"
//!
//! # Extract from text recognized elsewhere
//! meallog parse label.txt
//!
//! meallog list --limit 10
//! meallog export meals.csv --from 2026-10-01
//! ```

mod commands;
mod config;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::{ManualInput, ScanInput};
use config::AppConfig;

#[derive(Parser)]
#[command(name = "meallog", about = "Log meals by macros, typed in or read from a nutrition label")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print records as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Log a meal from manually entered macros
    Manual {
        #[arg(long)]
        name: String,
        #[arg(long, short = 'p')]
        protein: f64,
        #[arg(long, short = 'f')]
        fat: f64,
        #[arg(long, short = 'c')]
        carbs: f64,
        #[arg(long)]
        note: Option<String>,
        /// Show the record without saving it
        #[arg(long)]
        dry_run: bool,
    },

    /// Extract macros from already-recognized label text (`-` for stdin)
    Parse { input: PathBuf },

    /// OCR a nutrition label photo and log the result
    Scan {
        image: PathBuf,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        note: Option<String>,
        /// Corrected protein grams
        #[arg(long)]
        protein: Option<f64>,
        /// Corrected fat grams
        #[arg(long)]
        fat: Option<f64>,
        /// Corrected carbohydrate grams
        #[arg(long)]
        carbs: Option<f64>,
        /// Save even if the scan is flagged for review
        #[arg(long, short = 'y')]
        yes: bool,
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the most recent meals
    List {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Write the meal log as CSV
    Export {
        output: PathBuf,
        /// First day to include (YYYY-MM-DD, UTC)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day to include (YYYY-MM-DD, UTC)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AppConfig::load(cli.config.as_deref())?;
    let json = cli.json;

    match cli.command {
        Command::Parse { input } => commands::parse_text(&input, &config, json),
        Command::Manual { name, protein, fat, carbs, note, dry_run } => {
            let pool = commands::open_db(&config).await?;
            let input = ManualInput {
                food_name: name,
                protein_g: protein,
                fat_g: fat,
                carbs_g: carbs,
                note,
                dry_run,
            };
            commands::log_manual(&pool, input, json).await
        }
        Command::Scan { image, name, note, protein, fat, carbs, yes, dry_run } => {
            let pool = commands::open_db(&config).await?;
            let input = ScanInput {
                image,
                food_name: name,
                note,
                protein_g: protein,
                fat_g: fat,
                carbs_g: carbs,
                yes,
                dry_run,
            };
            commands::scan_photo(&pool, &config, input, json).await
        }
        Command::List { limit } => {
            let pool = commands::open_db(&config).await?;
            commands::list(&pool, limit, json).await
        }
        Command::Export { output, from, to } => {
            let pool = commands::open_db(&config).await?;
            commands::export(&pool, &output, from, to).await
        }
    }
}
