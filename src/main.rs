//! # pharma_scrape
//!
//! Builds seed CSV files of pharmacy products (title + MRP) from public
//! category pages.
//!
//! ## Jobs
//!
//! - `branded`: renders category pages in headless Chrome and reads the
//!   products out of their embedded JSON-LD, falling back to the Next.js
//!   payload and then to priced text lines (`source,title,mrp,url`)
//! - `otc`: fetches one static category page and keeps the product cards
//!   whose text mentions a keyword (`otc_category,title,mrp`)
//!
//! ## Usage
//!
//! ```sh
//! pharma_scrape branded
//! pharma_scrape otc --category Thermometer
//! RUST_LOG=pharma_scrape=debug pharma_scrape branded --static -s https://www.1mg.com/categories/...
//! ```
//!
//! ## Architecture
//!
//! Each job is a straight line:
//! 1. **Fetch**: get page HTML ([`fetch`])
//! 2. **Extract**: turn HTML into records ([`scrapers`])
//! 3. **Write**: render the CSV in memory and write it in one go ([`outputs`])

use clap::Parser;
use std::error::Error;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod fetch;
mod jobs;
mod models;
mod outputs;
mod scrapers;
mod utils;

use cli::{Cli, Command};
use config::Config;
use jobs::FetchMode;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("pharma_scrape starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = Config::load(args.config.as_deref()).await?;

    let rows = match args.command {
        Command::Branded(ref branded) => {
            branded.apply(&mut config.branded);
            let mode = if branded.static_fetch {
                FetchMode::Static
            } else {
                FetchMode::Browser
            };
            let run = jobs::run_branded(&config.branded, mode).await?;
            info!(
                seeds = run.seeds_visited,
                skipped_blocks = run.skipped_blocks,
                "branded job finished"
            );
            run.records.len()
        }
        Command::Otc(ref otc) => {
            otc.apply(&mut config.otc);
            let run = jobs::run_otc(&config.otc).await?;
            info!(
                strategy = run.strategy.as_deref().unwrap_or("none"),
                cards = run.cards_scanned,
                "otc job finished"
            );
            run.records.len()
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        rows,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
