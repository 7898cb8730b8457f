//! Keyword-filtered product cards from a static category page.
//!
//! Pharmacy listing pages that render server-side (Apollo's category pages,
//! for one) carry no structured data, only product cards. This module picks
//! the cards out with an ordered list of CSS selector strategies, keeps the
//! ones whose text mentions the category keyword, and takes a crude guess at
//! the price from the card text.
//!
//! The price guess only exists to keep the output comparable with older seed
//! files. It is not an algorithm worth generalizing: it breaks on markers in
//! the middle of words, on alternative currency encodings, and on prices that
//! wrap across lines.

use crate::config::OtcConfig;
use crate::error::ScrapeError;
use crate::models::OtcRecord;
use crate::utils::{collapse_whitespace, truncate_chars};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

/// One named way of finding product cards.
#[derive(Debug, Clone)]
pub struct SelectorStrategy {
    pub name: String,
    pub css: String,
    selector: Selector,
}

impl SelectorStrategy {
    pub fn parse(name: &str, css: &str) -> Result<Self, ScrapeError> {
        let selector = Selector::parse(css).map_err(|e| ScrapeError::Selector {
            selector: css.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name: name.to_string(),
            css: css.to_string(),
            selector,
        })
    }

    fn select<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        document.select(&self.selector).collect()
    }
}

/// Case-sensitive substring test on card text.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    keyword: String,
}

impl RelevanceFilter {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
        }
    }

    pub fn is_relevant(&self, text: &str) -> bool {
        text.contains(&self.keyword)
    }
}

/// Everything needed to turn a page into [`OtcRecord`]s.
#[derive(Debug, Clone)]
pub struct CardRules {
    pub category: String,
    pub strategies: Vec<SelectorStrategy>,
    pub filter: RelevanceFilter,
    pub price_markers: Vec<String>,
    pub max_title_chars: usize,
}

impl CardRules {
    pub fn from_config(cfg: &OtcConfig) -> Result<Self, ScrapeError> {
        let strategies = cfg
            .selectors
            .iter()
            .map(|s| SelectorStrategy::parse(&s.name, &s.css))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            category: cfg.category.clone(),
            strategies,
            filter: RelevanceFilter::new(cfg.keyword()),
            price_markers: cfg.price_markers.clone(),
            max_title_chars: cfg.max_title_chars,
        })
    }
}

#[derive(Debug, Default)]
pub struct CardExtraction {
    /// Name of the strategy that matched, `None` when none did.
    pub strategy: Option<String>,
    /// Elements the winning strategy selected, relevant or not.
    pub scanned: usize,
    pub records: Vec<OtcRecord>,
}

/// Try `strategies` in order and return the index and output of the first
/// one that produced anything.
pub fn first_matching<S, T>(
    strategies: &[S],
    mut attempt: impl FnMut(&S) -> Vec<T>,
) -> Option<(usize, Vec<T>)> {
    strategies.iter().enumerate().find_map(|(i, s)| {
        let found = attempt(s);
        (!found.is_empty()).then_some((i, found))
    })
}

/// Visible text of an element, collapsed to single spaces and cut to `max`
/// characters.
pub fn card_text(el: &ElementRef<'_>, max: usize) -> String {
    let joined = el.text().collect::<Vec<_>>().join(" ");
    let collapsed = collapse_whitespace(&joined);
    truncate_chars(&collapsed, max).to_string()
}

/// Guess a price from free text.
///
/// The first marker (in list order) present in `text` wins; the first
/// whitespace-separated token after its last occurrence is returned.
pub fn pick_price(text: &str, markers: &[String]) -> Option<String> {
    let marker = markers
        .iter()
        .find(|m| !m.is_empty() && text.contains(m.as_str()))?;
    let (_, after) = text.rsplit_once(marker.as_str())?;
    after.split_whitespace().next().map(str::to_string)
}

#[instrument(level = "debug", skip_all, fields(category = %rules.category, html_bytes = html.len()))]
pub fn extract_cards(rules: &CardRules, html: &str) -> CardExtraction {
    let document = Html::parse_document(html);

    let Some((idx, elements)) = first_matching(&rules.strategies, |s| s.select(&document)) else {
        debug!("No selector strategy matched");
        return CardExtraction::default();
    };
    let strategy = &rules.strategies[idx];
    debug!(strategy = %strategy.name, css = %strategy.css, matched = elements.len(), "Selector strategy matched");

    let records = elements
        .iter()
        .map(|el| card_text(el, rules.max_title_chars))
        .filter(|text| rules.filter.is_relevant(text))
        .map(|title| OtcRecord {
            otc_category: rules.category.clone(),
            mrp: pick_price(&title, &rules.price_markers),
            title,
        })
        .collect();

    CardExtraction {
        strategy: Some(strategy.name.clone()),
        scanned: elements.len(),
        records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> CardRules {
        CardRules::from_config(&OtcConfig::default()).unwrap()
    }

    fn markers() -> Vec<String> {
        OtcConfig::default().price_markers
    }

    #[test]
    fn test_first_matching_picks_first_non_empty() {
        let strategies = ["a", "b", "c"];
        let got = first_matching(&strategies, |s| match *s {
            "a" => Vec::<u8>::new(),
            "b" => vec![1, 2],
            _ => vec![9],
        });
        assert_eq!(got, Some((1, vec![1, 2])));
    }

    #[test]
    fn test_first_matching_stops_after_success() {
        let strategies = ["a", "b"];
        let mut tried = Vec::new();
        let got = first_matching(&strategies, |s| {
            tried.push(*s);
            vec![*s]
        });
        assert_eq!(got, Some((0, vec!["a"])));
        assert_eq!(tried, vec!["a"]);
    }

    #[test]
    fn test_first_matching_none() {
        let strategies = ["a", "b"];
        let got = first_matching(&strategies, |_| Vec::<u8>::new());
        assert_eq!(got, None);
    }

    #[test]
    fn test_product_card_strategy_preferred() {
        let html = r#"<html><body>
            <ul>
              <li data-testid="plp-card"><p>Dr. Morepen Digital Thermometer</p><span>₹ 199</span></li>
              <li data-testid="plp-card"><p>Omron Flexible Thermometer</p><span>MRP ₹350</span></li>
              <li data-testid="plp-card"><p>Hand Sanitizer</p><span>₹ 50</span></li>
            </ul>
            <div>Thermometer buying guide</div>
        </body></html>"#;

        let ex = extract_cards(&rules(), html);
        assert_eq!(ex.strategy.as_deref(), Some("product-card"));
        assert_eq!(ex.scanned, 3);
        assert_eq!(
            ex.records,
            vec![
                OtcRecord {
                    otc_category: "Thermometer".into(),
                    title: "Dr. Morepen Digital Thermometer ₹ 199".into(),
                    mrp: Some("199".into()),
                },
                OtcRecord {
                    otc_category: "Thermometer".into(),
                    title: "Omron Flexible Thermometer MRP ₹350".into(),
                    mrp: Some("350".into()),
                },
            ]
        );
    }

    #[test]
    fn test_falls_back_to_generic_blocks() {
        let html = r#"<html><body>
            <div class="grid"><section>Infrared Thermometer Rs. 899</section></div>
        </body></html>"#;
        let ex = extract_cards(&rules(), html);
        assert_eq!(ex.strategy.as_deref(), Some("generic-block"));
        assert_eq!(ex.records.len(), 1);
        assert_eq!(ex.records[0].title, "Infrared Thermometer Rs. 899");
        assert_eq!(ex.records[0].mrp.as_deref(), Some("899"));
    }

    #[test]
    fn test_keyword_is_case_sensitive() {
        let html = r#"<ul><li data-testid="plp-card">digital thermometer ₹ 99</li></ul>"#;
        let ex = extract_cards(&rules(), html);
        assert_eq!(ex.scanned, 1);
        assert!(ex.records.is_empty());
    }

    #[test]
    fn test_relevance_filter() {
        let f = RelevanceFilter::new("Thermometer");
        assert!(f.is_relevant("Omron Digital Thermometer MC-246"));
        assert!(!f.is_relevant("omron digital thermometer"));
        assert!(!f.is_relevant(""));
    }

    #[test]
    fn test_no_keyword_no_record() {
        let html = r#"<ul><li data-testid="plp-card">Pulse Oximeter ₹ 999</li></ul>"#;
        let ex = extract_cards(&rules(), html);
        assert!(ex.records.is_empty());
    }

    #[test]
    fn test_no_strategy_matches() {
        let html = "<html><body><p>Thermometer</p></body></html>";
        let ex = extract_cards(&rules(), html);
        assert_eq!(ex.strategy, None);
        assert_eq!(ex.scanned, 0);
        assert!(ex.records.is_empty());
    }

    #[test]
    fn test_title_truncated_to_max_chars() {
        let mut r = rules();
        r.max_title_chars = 20;
        let html = r#"<ul><li data-testid="plp-card">Thermometer with a very long marketing description</li></ul>"#;
        let ex = extract_cards(&r, html);
        assert_eq!(ex.records[0].title, "Thermometer with a v");
        assert_eq!(ex.records[0].title.chars().count(), 20);
    }

    #[test]
    fn test_pick_price_marker_order() {
        let m = markers();
        // "Rs." outranks "₹" even when "₹" comes first in the text.
        assert_eq!(pick_price("₹ 10 Rs. 20", &m), Some("20".into()));
        assert_eq!(pick_price("MRP ₹499 Thermometer", &m), Some("499".into()));
        assert_eq!(pick_price("MRP 120", &m), Some("120".into()));
        assert_eq!(pick_price("Thermometer", &m), None);
    }

    #[test]
    fn test_pick_price_uses_last_occurrence() {
        let m = markers();
        assert_eq!(
            pick_price("Save Rs. 50 Thermometer Rs. 450", &m),
            Some("450".into())
        );
    }

    #[test]
    fn test_pick_price_marker_at_end() {
        let m = markers();
        assert_eq!(pick_price("Thermometer ₹", &m), None);
        assert_eq!(pick_price("Thermometer ₹   ", &m), None);
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let err = SelectorStrategy::parse("broken", "li[").unwrap_err();
        assert!(matches!(err, ScrapeError::Selector { .. }));
    }
}
