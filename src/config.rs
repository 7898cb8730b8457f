//! Job configuration.
//!
//! Every setting has a default matching the stock seed run (1mg thermometers
//! for `branded`, Apollo thermometers for `otc`). A YAML file can override any
//! of them:
//!
//! ```yaml
//! branded:
//!   seeds:
//!     - https://www.1mg.com/categories/health-conditions/fever/thermometers-167
//!     - https://www.1mg.com/categories/health-conditions/pain-relief-88
//!   settle_ms: 3000
//!   source: null   # tag each row with its seed's host instead of `1mg`
//! otc:
//!   url: https://www.apollopharmacy.in/shop-by-category/health-thermometers
//!   category: Thermometer
//!   output: out/otc_thermometers_apollo.csv
//! ```
//!
//! Command-line flags are applied on top of the file (see [`crate::cli`]).

use crate::error::ScrapeError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub branded: BrandedConfig,
    pub otc: OtcConfig,
}

/// Settings for the JSON-LD job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BrandedConfig {
    /// Source tag written to every row. Set to `null` to derive it from each
    /// seed's host instead.
    pub source: Option<String>,
    /// Category pages to visit, in order.
    pub seeds: Vec<String>,
    pub output: PathBuf,
    /// Extra wait after the network settles, for late client-side injection.
    pub settle_ms: u64,
    /// Upper bound on the network-idle wait per page.
    pub network_idle_timeout_secs: u64,
    /// Request timeout when fetching without a browser.
    pub request_timeout_secs: u64,
    /// Upper bound on a single browser navigation.
    pub navigation_timeout_secs: u64,
    /// Browser context presented to the site.
    pub user_agent: String,
    pub locale: String,
    pub timezone: String,
}

impl Default for BrandedConfig {
    fn default() -> Self {
        Self {
            source: Some("1mg".to_string()),
            seeds: vec![
                "https://www.1mg.com/categories/health-conditions/fever/thermometers-167".to_string(),
                "https://www.1mg.com/categories/medical-devices/health-monitors/thermometers-167"
                    .to_string(),
            ],
            output: PathBuf::from("branded_seed_1mg.csv"),
            settle_ms: 2000,
            network_idle_timeout_secs: 20,
            request_timeout_secs: 20,
            navigation_timeout_secs: 60,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/118 Safari/537.36"
                .to_string(),
            locale: "en-IN".to_string(),
            timezone: "Asia/Kolkata".to_string(),
        }
    }
}

/// A named CSS selector tried when looking for product cards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectorConfig {
    pub name: String,
    pub css: String,
}

/// Settings for the product-card job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OtcConfig {
    pub url: String,
    /// Value of the `otc_category` column.
    pub category: String,
    /// Text a card must contain; defaults to `category`.
    pub keyword: Option<String>,
    pub output: PathBuf,
    pub timeout_secs: u64,
    /// Tried in order; the first with any match wins.
    pub selectors: Vec<SelectorConfig>,
    pub price_markers: Vec<String>,
    pub max_title_chars: usize,
}

impl Default for OtcConfig {
    fn default() -> Self {
        Self {
            url: "https://www.apollopharmacy.in/shop-by-category/health-thermometers".to_string(),
            category: "Thermometer".to_string(),
            keyword: None,
            output: PathBuf::from("otc_thermometers_apollo.csv"),
            timeout_secs: 20,
            selectors: vec![
                SelectorConfig {
                    name: "product-card".to_string(),
                    css: "[data-testid='plp-card'], .ProductCard_productCard__".to_string(),
                },
                SelectorConfig {
                    name: "generic-block".to_string(),
                    css: "li, div".to_string(),
                },
            ],
            price_markers: vec!["Rs.".to_string(), "₹".to_string(), "MRP".to_string()],
            max_title_chars: 200,
        }
    }
}

impl OtcConfig {
    pub fn keyword(&self) -> &str {
        self.keyword.as_deref().unwrap_or(&self.category)
    }
}

impl Config {
    /// Load from a YAML file, or fall back to defaults when `path` is `None`.
    #[instrument(level = "info", skip_all, fields(path = ?path))]
    pub async fn load(path: Option<&Path>) -> Result<Config, ScrapeError> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let text = fs::read_to_string(path).await.map_err(|e| {
            ScrapeError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Config::from_yaml(&text)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Config, ScrapeError> {
        // An empty file deserializes to unit, not to an empty mapping.
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(text).map_err(|e| ScrapeError::Config(e.to_string()))
    }
}

impl BrandedConfig {
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.seeds.is_empty() {
            return Err(ScrapeError::Config("branded: no seed URLs".into()));
        }
        for seed in &self.seeds {
            validate_http_url(seed)?;
        }
        if matches!(self.source.as_deref(), Some(s) if s.trim().is_empty()) {
            return Err(ScrapeError::Config("branded: source tag is blank".into()));
        }
        if self.request_timeout_secs == 0
            || self.network_idle_timeout_secs == 0
            || self.navigation_timeout_secs == 0
        {
            return Err(ScrapeError::Config("branded: timeouts must be > 0".into()));
        }
        Ok(())
    }
}

impl OtcConfig {
    pub fn validate(&self) -> Result<(), ScrapeError> {
        validate_http_url(&self.url)?;
        if self.keyword().is_empty() {
            return Err(ScrapeError::Config("otc: keyword is empty".into()));
        }
        if self.selectors.is_empty() {
            return Err(ScrapeError::Config("otc: no card selectors".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ScrapeError::Config("otc: timeout_secs must be > 0".into()));
        }
        if self.max_title_chars == 0 {
            return Err(ScrapeError::Config("otc: max_title_chars must be > 0".into()));
        }
        Ok(())
    }
}

/// Seeds must be absolute `http`/`https` URLs.
pub fn validate_http_url(raw: &str) -> Result<Url, ScrapeError> {
    let url = Url::parse(raw).map_err(|e| ScrapeError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ScrapeError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {other}"),
        }),
    }
}
