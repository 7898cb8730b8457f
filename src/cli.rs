//! Command-line interface definitions for pharma_scrape.
//!
//! Flags override whatever the YAML config (or the built-in defaults) say;
//! anything left unset keeps the configured value.

use crate::config::{BrandedConfig, OtcConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for pharma_scrape.
///
/// # Examples
///
/// ```sh
/// # 1mg thermometers via headless Chrome, default output file
/// pharma_scrape branded
///
/// # Several category pages, no browser
/// pharma_scrape branded --static -s https://www.1mg.com/categories/a -s https://www.1mg.com/categories/b
///
/// # Apollo cards for another category
/// pharma_scrape otc --category Nebulizer --url https://www.apollopharmacy.in/shop-by-category/nebulizers
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, global = true, env = "PHARMA_SCRAPE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract products from the JSON-LD of rendered category pages
    Branded(BrandedArgs),
    /// Collect keyword-matching product cards from a static category page
    Otc(OtcArgs),
}

#[derive(Args, Debug, Default)]
pub struct BrandedArgs {
    /// Category page to visit; repeat for several (replaces configured seeds)
    #[arg(short = 's', long = "seed")]
    pub seeds: Vec<String>,

    /// Output CSV path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Source tag for the `source` column (default: 1mg)
    #[arg(long)]
    pub source: Option<String>,

    /// Tag each row with its seed host's label instead of a fixed source
    #[arg(long, conflicts_with = "source")]
    pub source_from_host: bool,

    /// Extra wait after the network settles, in milliseconds
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Fetch raw HTML over HTTP instead of rendering in a headless browser
    #[arg(long = "static")]
    pub static_fetch: bool,
}

impl BrandedArgs {
    pub fn apply(&self, cfg: &mut BrandedConfig) {
        if !self.seeds.is_empty() {
            cfg.seeds = self.seeds.clone();
        }
        if let Some(ref output) = self.output {
            cfg.output = output.clone();
        }
        if self.source.is_some() {
            cfg.source = self.source.clone();
        }
        if self.source_from_host {
            cfg.source = None;
        }
        if let Some(ms) = self.settle_ms {
            cfg.settle_ms = ms;
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct OtcArgs {
    /// Category listing page
    #[arg(short, long)]
    pub url: Option<String>,

    /// Value written to the `otc_category` column
    #[arg(long)]
    pub category: Option<String>,

    /// Text a card must contain (default: the category)
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Output CSV path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl OtcArgs {
    pub fn apply(&self, cfg: &mut OtcConfig) {
        if let Some(ref url) = self.url {
            cfg.url = url.clone();
        }
        if let Some(ref category) = self.category {
            cfg.category = category.clone();
        }
        if self.keyword.is_some() {
            cfg.keyword = self.keyword.clone();
        }
        if let Some(ref output) = self.output {
            cfg.output = output.clone();
        }
        if let Some(secs) = self.timeout_secs {
            cfg.timeout_secs = secs;
        }
    }
}
