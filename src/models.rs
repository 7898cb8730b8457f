//! Record types produced by the two scraping jobs.
//!
//! - [`ProductRecord`]: one product pulled from embedded JSON-LD (`branded` job)
//! - [`OtcRecord`]: one product card matched by keyword (`otc` job)
//!
//! Records are built once and never mutated; a run keeps them in a `Vec` in
//! discovery order and hands the whole sequence to the CSV writer. Duplicates
//! are kept as-is.

use serde::{Deserialize, Serialize};

/// A product found in a page's structured data.
///
/// # Fields
///
/// * `source` - Short tag for the site the seed belongs to (e.g. `1mg`)
/// * `title` - Trimmed product name, never empty
/// * `mrp` - Price with separators and currency symbols removed; empty when the
///   product had no usable offer price
/// * `url` - The seed URL the product was found on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub source: String,
    pub title: String,
    pub mrp: String,
    pub url: String,
}

impl ProductRecord {
    /// Column order of the `branded` CSV.
    pub const HEADER: [&'static str; 4] = ["source", "title", "mrp", "url"];

    pub fn fields(&self) -> [&str; 4] {
        [&self.source, &self.title, &self.mrp, &self.url]
    }
}

/// A product card matched on a category listing page.
///
/// Field names double as the CSV header (`otc_category,title,mrp`), so the
/// struct is serialized directly by the `csv` crate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OtcRecord {
    /// The fixed category this run is collecting (e.g. `Thermometer`).
    pub otc_category: String,
    /// Collapsed, truncated visible text of the card.
    pub title: String,
    /// First token after a price marker, if any marker was present.
    pub mrp: Option<String>,
}

/// Derive a short source tag from a URL's host.
///
/// `https://www.1mg.com/categories/...` -> `1mg`,
/// `https://www.apollopharmacy.in/...` -> `apollopharmacy`.
pub fn source_tag(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.domain()?;
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() >= 2 {
        return Some(parts[parts.len() - 2].to_string());
    }
    None
}
