//! The two scraping jobs, end to end.
//!
//! Both follow the same straight line: fetch → extract → accumulate → write.
//! The collect step is generic over [`PageSource`] so it can run against a
//! local HTTP fixture as easily as a live browser.
//!
//! A job that collects zero rows still writes its (header-only) file and
//! succeeds; the warning in the log is the only signal that the page layout
//! may have drifted.

use crate::config::{BrandedConfig, OtcConfig};
use crate::error::ScrapeError;
use crate::fetch::{HttpPageSource, PageSource};
use crate::models::{OtcRecord, ProductRecord, source_tag};
use crate::outputs::csv::{write_otc, write_products};
use crate::scrapers::cards::{CardRules, extract_cards};
use crate::scrapers::fallback::extract_page;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// How `branded` pages are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Render in headless Chrome (needs the `browser` feature).
    Browser,
    /// Single HTTP GET, for pages that embed JSON-LD server-side.
    Static,
}

#[derive(Debug, Default)]
pub struct BrandedRun {
    pub records: Vec<ProductRecord>,
    pub seeds_visited: usize,
    pub skipped_blocks: usize,
}

#[derive(Debug, Default)]
pub struct OtcRun {
    pub records: Vec<OtcRecord>,
    pub strategy: Option<String>,
    pub cards_scanned: usize,
}

/// The configured tag, or the seed host's label when the tag is unset.
fn seed_source(cfg: &BrandedConfig, url: &str) -> String {
    cfg.source
        .clone()
        .or_else(|| source_tag(url))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Visit every seed in order and collect product records from its JSON-LD,
/// falling back to the Next.js payload and then page text per seed.
///
/// A fetch failure aborts the run; nothing collected so far is returned.
#[instrument(level = "info", skip_all, fields(seeds = cfg.seeds.len()))]
pub async fn collect_branded<S: PageSource>(
    source: &S,
    cfg: &BrandedConfig,
) -> Result<BrandedRun, ScrapeError> {
    let mut run = BrandedRun::default();

    for url in &cfg.seeds {
        let html = source.fetch(url).await?;
        let tag = seed_source(cfg, url);
        let extraction = extract_page(&tag, url, &html);

        info!(
            %url,
            source = %tag,
            method = %extraction.method,
            records = extraction.records.len(),
            skipped_blocks = extraction.skipped.len(),
            "Extracted products"
        );

        run.seeds_visited += 1;
        run.skipped_blocks += extraction.skipped.len();
        run.records.extend(extraction.records);
    }

    if run.records.is_empty() {
        warn!(seeds = run.seeds_visited, "No products found in any seed page");
    }
    Ok(run)
}

/// Fetch the category page once and collect keyword-matching cards.
#[instrument(level = "info", skip_all, fields(url = %cfg.url, category = %cfg.category))]
pub async fn collect_otc<S: PageSource>(source: &S, cfg: &OtcConfig) -> Result<OtcRun, ScrapeError> {
    let rules = CardRules::from_config(cfg)?;
    let html = source.fetch(&cfg.url).await?;
    let extraction = extract_cards(&rules, &html);

    info!(
        strategy = extraction.strategy.as_deref().unwrap_or("none"),
        scanned = extraction.scanned,
        records = extraction.records.len(),
        "Extracted product cards"
    );
    if extraction.records.is_empty() {
        warn!(keyword = %cfg.keyword(), "No cards matched the keyword");
    }

    Ok(OtcRun {
        records: extraction.records,
        strategy: extraction.strategy,
        cards_scanned: extraction.scanned,
    })
}

/// Run the `branded` job and write its CSV.
#[instrument(level = "info", skip_all, fields(?mode))]
pub async fn run_branded(cfg: &BrandedConfig, mode: FetchMode) -> Result<BrandedRun, ScrapeError> {
    cfg.validate()?;

    let run = match mode {
        FetchMode::Static => {
            let source = HttpPageSource::new(Duration::from_secs(cfg.request_timeout_secs))?;
            collect_branded(&source, cfg).await?
        }
        FetchMode::Browser => collect_with_browser(cfg).await?,
    };

    write_products(&cfg.output, &run.records).await?;
    info!(
        path = %cfg.output.display(),
        rows = run.records.len(),
        skipped_blocks = run.skipped_blocks,
        "Saved branded seed CSV"
    );
    Ok(run)
}

#[cfg(feature = "browser")]
async fn collect_with_browser(cfg: &BrandedConfig) -> Result<BrandedRun, ScrapeError> {
    use crate::fetch::{BrowserPageSource, collect_then_close};

    let browser = BrowserPageSource::launch(cfg).await?;
    collect_then_close(browser, async |b| collect_branded(b, cfg).await).await
}

#[cfg(not(feature = "browser"))]
async fn collect_with_browser(_cfg: &BrandedConfig) -> Result<BrandedRun, ScrapeError> {
    Err(ScrapeError::Config(
        "built without the `browser` feature; rerun with --static".into(),
    ))
}

/// Run the `otc` job and write its CSV.
#[instrument(level = "info", skip_all)]
pub async fn run_otc(cfg: &OtcConfig) -> Result<OtcRun, ScrapeError> {
    cfg.validate()?;
    let source = HttpPageSource::new(Duration::from_secs(cfg.timeout_secs))?;
    let run = collect_otc(&source, cfg).await?;

    write_otc(&cfg.output, &run.records).await?;
    info!(path = %cfg.output.display(), rows = run.records.len(), "Saved OTC CSV");
    Ok(run)
}
