//! Last-resort extraction for pages whose JSON-LD carries no products.
//!
//! Tried in order, each only when everything before it found nothing on the
//! page:
//!
//! 1. JSON-LD ([`crate::scrapers::jsonld`])
//! 2. the Next.js boot payload in `script#__NEXT_DATA__`
//! 3. visible text lines that mention `₹` or `MRP`
//!
//! Both fallbacks are heuristics. The Next.js one pairs each `"name"` with the
//! next `"price"` within 200 characters of serialized JSON; the text one takes
//! the first digit run on a priced line, which may belong to the title.

use crate::models::ProductRecord;
use crate::scrapers::jsonld::{SkippedBlock, clean_price, extract_records};
use crate::utils::{collapse_whitespace, truncate_chars};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;
use std::fmt;
use tracing::{debug, instrument};

static NEXT_DATA: Lazy<Selector> = Lazy::new(|| Selector::parse("script#__NEXT_DATA__").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

static NAME_THEN_PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""name":"([^"]+)".{0,200}?"price":\s*"?([\d,.]+)"?"#).unwrap()
});
static PRICE_HINT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)MRP|₹").unwrap());
static LINE_PRICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(?:MRP\s*)?₹?\s*([\d,]+)").unwrap());

/// Titles taken from page text are cut to this many characters.
pub const MAX_TEXT_TITLE_CHARS: usize = 200;

/// Elements whose text never reaches `innerText`.
const HIDDEN: [&str; 5] = ["script", "style", "noscript", "template", "head"];

/// Elements that start a new line of rendered text.
const BLOCKS: [&str; 25] = [
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "li", "main", "nav", "p", "section",
];

/// Which method produced a page's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    JsonLd,
    NextData,
    VisibleText,
    /// Every method came up empty.
    Nothing,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::JsonLd => "json-ld",
            Method::NextData => "next-data",
            Method::VisibleText => "visible-text",
            Method::Nothing => "none",
        };
        f.write_str(s)
    }
}

/// Records pulled from one page and how they were found.
#[derive(Debug)]
pub struct PageExtraction {
    pub method: Method,
    pub records: Vec<ProductRecord>,
    /// Malformed JSON-LD blocks, counted even when a fallback succeeded.
    pub skipped: Vec<SkippedBlock>,
}

/// Run the extraction chain over one page.
#[instrument(level = "debug", skip(html), fields(html_bytes = html.len()))]
pub fn extract_page(source: &str, url: &str, html: &str) -> PageExtraction {
    let ld = extract_records(source, url, html);
    if !ld.records.is_empty() {
        return PageExtraction {
            method: Method::JsonLd,
            records: ld.records,
            skipped: ld.skipped,
        };
    }

    let document = Html::parse_document(html);
    let (method, records) = match next_data_records(&document, source, url) {
        found if !found.is_empty() => (Method::NextData, found),
        _ => match text_records(&document, source, url) {
            found if !found.is_empty() => (Method::VisibleText, found),
            _ => (Method::Nothing, Vec::new()),
        },
    };
    debug!(%method, records = records.len(), "JSON-LD empty; used fallback");

    PageExtraction {
        method,
        records,
        skipped: ld.skipped,
    }
}

/// Name/price pairs from the Next.js boot payload.
///
/// A missing or malformed payload yields nothing.
pub fn next_data_records(document: &Html, source: &str, url: &str) -> Vec<ProductRecord> {
    let Some(script) = document.select(&NEXT_DATA).next() else {
        return Vec::new();
    };
    let raw = script.text().collect::<String>();
    let data = match serde_json::from_str::<Value>(raw.trim()) {
        Ok(data) => data,
        Err(e) => {
            debug!(error = %e, "Unparseable __NEXT_DATA__");
            return Vec::new();
        }
    };

    let serialized = data.to_string();
    NAME_THEN_PRICE
        .captures_iter(&serialized)
        .filter_map(|cap| {
            let title = cap.get(1)?.as_str().trim();
            if title.is_empty() {
                return None;
            }
            Some(ProductRecord {
                source: source.to_string(),
                title: title.to_string(),
                mrp: cap.get(2).map(|m| clean_price(m.as_str())).unwrap_or_default(),
                url: url.to_string(),
            })
        })
        .collect()
}

/// Records from visible lines that mention a price.
///
/// The title is the text before the first `MRP`/`₹`, cut to
/// [`MAX_TEXT_TITLE_CHARS`]; lines with nothing before the marker are dropped.
pub fn text_records(document: &Html, source: &str, url: &str) -> Vec<ProductRecord> {
    visible_lines(document)
        .into_iter()
        .filter(|line| PRICE_HINT.is_match(line))
        .filter_map(|line| {
            let title = PRICE_HINT.split(&line).next()?.trim();
            if title.is_empty() {
                return None;
            }
            let mrp = LINE_PRICE
                .captures(&line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().replace(',', ""))
                .unwrap_or_default();
            Some(ProductRecord {
                source: source.to_string(),
                title: truncate_chars(title, MAX_TEXT_TITLE_CHARS).to_string(),
                mrp,
                url: url.to_string(),
            })
        })
        .collect()
}

/// Approximation of `document.body.innerText` split into non-empty lines.
pub fn visible_lines(document: &Html) -> Vec<String> {
    let Some(body) = document.select(&BODY).next() else {
        return Vec::new();
    };
    let mut buf = String::new();
    push_text(body, &mut buf);
    buf.lines()
        .map(collapse_whitespace)
        .filter(|l| !l.is_empty())
        .collect()
}

fn push_text(el: ElementRef<'_>, buf: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => buf.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c })),
            Node::Element(e) if e.name() == "br" => buf.push('\n'),
            Node::Element(e) if HIDDEN.contains(&e.name()) => {}
            Node::Element(e) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCKS.contains(&e.name()) || e.name() == "tr";
                if block {
                    buf.push('\n');
                }
                push_text(child_el, buf);
                if block {
                    buf.push('\n');
                }
            }
            _ => {}
        }
    }
}
