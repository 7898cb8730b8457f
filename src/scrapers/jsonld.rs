//! Product extraction from embedded JSON-LD.
//!
//! Category pages on sites like 1mg describe their listing in one or more
//! `<script type="application/ld+json">` blocks. Most blocks on a page are
//! unrelated (breadcrumbs, site navigation, organization info), so a block
//! that fails to parse or describes something else is skipped, not an error.
//!
//! # Node shapes
//!
//! | Shape | Handling |
//! |-------|----------|
//! | `{"@type": "Product", ...}` | one candidate |
//! | `{"@type": "ItemList", "itemListElement": [...]}` | each element, unwrapping `item` when present |
//! | `{"@graph": [...]}` | members are walked as top-level nodes |
//! | anything else | ignored |
//!
//! A candidate becomes a [`ProductRecord`] only if it has a non-empty trimmed
//! `name`. Price is read from `offers.price`, falling back to
//! `offers[0].price`; a missing price leaves the MRP empty.

use crate::models::ProductRecord;
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use std::fmt;
use tracing::{debug, instrument};

static LD_JSON: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

/// Characters removed from a stringified price.
const PRICE_NOISE: [char; 5] = [',', '₹', '$', '€', '£'];

/// Why a JSON-LD block contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Block held only whitespace.
    Empty,
    /// Block is not valid JSON.
    InvalidJson(String),
    /// Valid JSON but neither an object nor an array.
    UnsupportedShape,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Empty => write!(f, "empty block"),
            SkipReason::InvalidJson(e) => write!(f, "invalid json: {e}"),
            SkipReason::UnsupportedShape => write!(f, "not an object or array"),
        }
    }
}

/// Result of parsing one raw block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockOutcome {
    /// Top-level nodes of the block (a bare object becomes a single node).
    Parsed(Vec<Value>),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBlock {
    /// Position of the block on the page, in document order.
    pub index: usize,
    pub reason: SkipReason,
}

/// Everything pulled out of one page.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<ProductRecord>,
    pub skipped: Vec<SkippedBlock>,
}

/// Raw text of every JSON-LD script block in `html`, in document order.
pub fn script_blocks(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&LD_JSON)
        .map(|el| el.text().collect::<String>())
        .collect()
}

/// Parse one block into its top-level nodes.
pub fn parse_block(raw: &str) -> BlockOutcome {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return BlockOutcome::Skipped(SkipReason::Empty);
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(nodes)) => BlockOutcome::Parsed(nodes),
        Ok(node @ Value::Object(_)) => BlockOutcome::Parsed(vec![node]),
        Ok(_) => BlockOutcome::Skipped(SkipReason::UnsupportedShape),
        Err(e) => BlockOutcome::Skipped(SkipReason::InvalidJson(e.to_string())),
    }
}

/// Extract product records from a page's HTML.
///
/// Every record is tagged with `source` and the page `url`.
#[instrument(level = "debug", skip(html), fields(html_bytes = html.len()))]
pub fn extract_records(source: &str, url: &str, html: &str) -> Extraction {
    let blocks = script_blocks(html);
    debug!(blocks = blocks.len(), "Found JSON-LD blocks");
    extract_from_blocks(source, url, &blocks)
}

/// Extract product records from already collected block texts.
pub fn extract_from_blocks(source: &str, url: &str, blocks: &[String]) -> Extraction {
    let mut out = Extraction::default();

    for (index, raw) in blocks.iter().enumerate() {
        match parse_block(raw) {
            BlockOutcome::Parsed(nodes) => {
                for node in expand_graph(&nodes) {
                    for product in product_candidates(node) {
                        if let Some(record) = record_from_product(source, url, product) {
                            out.records.push(record);
                        }
                    }
                }
            }
            BlockOutcome::Skipped(reason) => {
                debug!(
                    index,
                    %reason,
                    block = %truncate_for_log(raw.trim(), 200),
                    "Skipping JSON-LD block"
                );
                out.skipped.push(SkippedBlock { index, reason });
            }
        }
    }

    out
}

/// Replace `@graph` containers with their members.
fn expand_graph(nodes: &[Value]) -> Vec<&Value> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node.get("@graph") {
            Some(Value::Array(members)) => out.extend(members.iter()),
            _ => out.push(node),
        }
    }
    out
}

/// Product-shaped values reachable from one top-level node.
fn product_candidates(node: &Value) -> Vec<&Value> {
    if has_type(node, "ItemList") {
        if let Some(Value::Array(items)) = node.get("itemListElement") {
            return items
                .iter()
                .map(|item| item.get("item").filter(|v| truthy(v)).unwrap_or(item))
                .filter(|prod| has_type(prod, "Product") || prod.get("name").is_some_and(truthy))
                .collect();
        }
    }
    if has_type(node, "Product") {
        return vec![node];
    }
    Vec::new()
}

fn record_from_product(source: &str, url: &str, product: &Value) -> Option<ProductRecord> {
    let title = product.get("name")?.as_str()?.trim();
    if title.is_empty() {
        return None;
    }
    let mrp = offer_price(product)
        .map(|p| clean_price(&price_text(p)))
        .unwrap_or_default();

    Some(ProductRecord {
        source: source.to_string(),
        title: title.to_string(),
        mrp,
        url: url.to_string(),
    })
}

/// `@type` is either a string or a list of strings.
fn has_type(node: &Value, wanted: &str) -> bool {
    match node.get("@type") {
        Some(Value::String(t)) => t == wanted,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(wanted)),
        _ => false,
    }
}

/// `offers.price`, else `offers[0].price`.
fn offer_price(product: &Value) -> Option<&Value> {
    let offers = product.get("offers")?;
    offers
        .get("price")
        .filter(|v| truthy(v))
        .or_else(|| offers.get(0)?.get("price").filter(|v| truthy(v)))
}

/// JSON-LD publishers write prices as strings or numbers; numbers that hold a
/// whole value are rendered without a fractional part.
fn price_text(price: &Value) -> String {
    match price {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 => format!("{f:.0}"),
                    _ => n.to_string(),
                }
            }
        }
        other => other.to_string(),
    }
}

pub fn clean_price(raw: &str) -> String {
    raw.chars()
        .filter(|c| !PRICE_NOISE.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.1mg.com/categories/health-conditions/fever/thermometers-167";

    fn page(blocks: &[&str]) -> String {
        let scripts: String = blocks
            .iter()
            .map(|b| format!(r#"<script type="application/ld+json">{b}</script>"#))
            .collect();
        format!("<html><head>{scripts}</head><body><h1>Thermometers</h1></body></html>")
    }

    #[test]
    fn test_single_product_node() {
        let html = page(&[
            r#"{"@type":"Product","name":"  Digital Thermometer ","offers":{"price":"₹499"}}"#,
        ]);
        let ex = extract_records("1mg", URL, &html);
        assert_eq!(
            ex.records,
            vec![ProductRecord {
                source: "1mg".into(),
                title: "Digital Thermometer".into(),
                mrp: "499".into(),
                url: URL.into(),
            }]
        );
        assert!(ex.skipped.is_empty());
    }

    #[test]
    fn test_item_list_unwrapping_matches_direct_product() {
        let product = r#"{"@type":"Product","name":"Infrared Thermometer","offers":{"price":"1,299"}}"#;
        let direct = extract_records("1mg", URL, &page(&[product]));

        let wrapped = format!(
            r#"{{"@type":"ItemList","itemListElement":[{{"@type":"ListItem","position":1,"item":{product}}}]}}"#
        );
        let listed = extract_records("1mg", URL, &page(&[&wrapped]));

        let bare = format!(r#"{{"@type":"ItemList","itemListElement":[{product}]}}"#);
        let unwrapped = extract_records("1mg", URL, &page(&[&bare]));

        assert_eq!(direct.records.len(), 1);
        assert_eq!(direct.records, listed.records);
        assert_eq!(direct.records, unwrapped.records);
        assert_eq!(direct.records[0].mrp, "1299");
    }

    #[test]
    fn test_item_list_accepts_untyped_named_items() {
        let block = r#"{"@type":"ItemList","itemListElement":[
            {"item":{"name":"Dr Trust Thermometer","offers":[{"price":249}]}},
            {"item":"https://www.1mg.com/otc/some-product"},
            {"position":3}
        ]}"#;
        let ex = extract_records("1mg", URL, &page(&[block]));
        assert_eq!(ex.records.len(), 1);
        assert_eq!(ex.records[0].title, "Dr Trust Thermometer");
        assert_eq!(ex.records[0].mrp, "249");
    }

    #[test]
    fn test_price_with_symbol_and_separator() {
        let block = r#"{"@type":"Product","name":"BP Monitor","offers":{"price":"₹1,234"}}"#;
        let ex = extract_records("1mg", URL, &page(&[block]));
        assert_eq!(ex.records[0].mrp, "1234");
    }

    #[test]
    fn test_price_falls_back_to_first_offer() {
        let block = r#"{"@type":"Product","name":"Strips","offers":[{"price":"₹99"},{"price":"₹120"}]}"#;
        let ex = extract_records("1mg", URL, &page(&[block]));
        assert_eq!(ex.records[0].mrp, "99");
    }

    #[test]
    fn test_missing_price_yields_empty_mrp() {
        let blocks = [
            r#"{"@type":"Product","name":"No Offers"}"#,
            r#"{"@type":"Product","name":"Empty Offers","offers":{}}"#,
            r#"{"@type":"Product","name":"Blank Price","offers":{"price":""}}"#,
        ];
        let ex = extract_records("1mg", URL, &page(&blocks));
        assert_eq!(ex.records.len(), 3);
        assert!(ex.records.iter().all(|r| r.mrp.is_empty()));
    }

    #[test]
    fn test_numeric_prices() {
        assert_eq!(price_text(&serde_json::json!(499)), "499");
        assert_eq!(price_text(&serde_json::json!(499.0)), "499");
        assert_eq!(price_text(&serde_json::json!(499.5)), "499.5");
    }

    #[test]
    fn test_blank_or_missing_name_is_dropped() {
        let blocks = [
            r#"{"@type":"Product","name":"   ","offers":{"price":"10"}}"#,
            r#"{"@type":"Product","offers":{"price":"10"}}"#,
        ];
        let ex = extract_records("1mg", URL, &page(&blocks));
        assert!(ex.records.is_empty());
        assert!(ex.skipped.is_empty());
    }

    #[test]
    fn test_malformed_block_is_skipped_and_rest_processed() {
        let blocks = [
            r#"{"@type":"Product","name":"Before"}"#,
            r#"{"@type":"Product","name": oops"#,
            r#"{"@type":"Product","name":"After"}"#,
        ];
        let ex = extract_records("1mg", URL, &page(&blocks));
        let titles: Vec<_> = ex.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Before", "After"]);
        assert_eq!(ex.skipped.len(), 1);
        assert_eq!(ex.skipped[0].index, 1);
        assert!(matches!(ex.skipped[0].reason, SkipReason::InvalidJson(_)));
    }

    #[test]
    fn test_unrelated_nodes_ignored() {
        let blocks = [
            r#"{"@type":"BreadcrumbList","itemListElement":[{"name":"Home"}]}"#,
            r#"[{"@type":"Organization","name":"Tata 1mg"},{"@type":"WebSite","name":"1mg"}]"#,
        ];
        let ex = extract_records("1mg", URL, &page(&blocks));
        assert!(ex.records.is_empty());
        assert!(ex.skipped.is_empty());
    }

    #[test]
    fn test_array_block_and_graph() {
        let blocks = [
            r#"[{"@type":"Product","name":"A"},{"@type":"Product","name":"B"}]"#,
            r#"{"@context":"https://schema.org","@graph":[{"@type":"WebPage"},{"@type":["Product","Drug"],"name":"C"}]}"#,
        ];
        let ex = extract_records("1mg", URL, &page(&blocks));
        let titles: Vec<_> = ex.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_parse_block_outcomes() {
        assert_eq!(parse_block("  \n "), BlockOutcome::Skipped(SkipReason::Empty));
        assert_eq!(parse_block("42"), BlockOutcome::Skipped(SkipReason::UnsupportedShape));
        assert!(matches!(
            parse_block("{"),
            BlockOutcome::Skipped(SkipReason::InvalidJson(_))
        ));
        match parse_block(r#"{"@type":"Product"}"#) {
            BlockOutcome::Parsed(nodes) => assert_eq!(nodes.len(), 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_script_blocks_ignores_other_scripts() {
        let html = r#"<html><head>
            <script>var x = 1;</script>
            <script type="application/json">{"a":1}</script>
            <script type="application/ld+json">{"@type":"Product","name":"X"}</script>
        </head></html>"#;
        let blocks = script_blocks(html);
        assert_eq!(blocks, vec![r#"{"@type":"Product","name":"X"}"#.to_string()]);
    }
}
