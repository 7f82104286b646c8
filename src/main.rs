use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use scrapetweet::commands::{analyze::AnalyzeCommand, scrape::ScrapeCommand};

#[derive(Parser, Debug)]
#[command(
    name = "scrapetweet",
    version,
    about = "Scrape tweets through the Apify actor API",
    long_about = "A CLI tool that scrapes tweets and profile data for a username through the Apify actor API, and reports basic statistics about shared files"
)]
struct Cli {
    /// Shared directory holding input files and the reports/ output directory
    #[arg(long = "shared-dir", env = "SHARED_DIR", default_value = "/shared", global = true)]
    shared_dir: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report word, line and character statistics for a shared file
    Analyze(AnalyzeCommand),

    /// Scrape tweets and profile data for a username and save a report
    Scrape(ScrapeCommand),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    // Parse command line arguments
    let args = Cli::parse();

    // Initialize logging; stdout is reserved for JSON envelopes
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    debug!(
        "Using shared directory {path}",
        path = args.shared_dir.display()
    );

    match args.command {
        Commands::Analyze(cmd) => cmd.execute(&args.shared_dir),
        Commands::Scrape(cmd) => cmd.execute(&args.shared_dir).await,
    }
}
