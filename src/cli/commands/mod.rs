//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod extract;
mod scrape;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use fsbo::config::Config;

use scrape::ScrapeArgs;

#[derive(Parser)]
#[command(name = "fsbo")]
#[command(about = "Scrape for-sale-by-owner listings into a CSV file")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch result pages, extract listings and export them
    Scrape(ScrapeArgs),

    /// Extract listings from a saved results page (prints CSV to stdout)
    Extract {
        /// HTML file to read
        file: PathBuf,
        /// Page URL used to resolve relative listing links
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Scrape(args) => scrape::cmd_scrape(config, &args).await,
        Commands::Extract { file, base_url } => {
            extract::cmd_extract(&config, &file, base_url.as_deref()).await
        }
        Commands::Config => config_cmd::cmd_config_show(&config),
    }
}
