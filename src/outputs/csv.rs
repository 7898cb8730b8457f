//! CSV rendering and writing.
//!
//! The two files have different dialects, kept for compatibility with seed
//! files already in use:
//!
//! - `branded`: `\n` line endings, the title column always double-quoted, the
//!   other columns quoted only when they contain a delimiter, quote or line
//!   break. The `csv` crate applies one quoting style per writer, so this
//!   layout is rendered here directly.
//! - `otc`: written by [`csv::Writer`] with its default (necessary-only)
//!   quoting and CRLF line endings.

use crate::error::ScrapeError;
use crate::models::{OtcRecord, ProductRecord};
use crate::utils::ensure_parent_dir;
use std::borrow::Cow;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

const OTC_HEADER: [&str; 3] = ["otc_category", "title", "mrp"];

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn quote_if_needed(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(quote(field))
    } else {
        Cow::Borrowed(field)
    }
}

/// Render the `branded` file: header plus one line per record.
pub fn render_products(records: &[ProductRecord]) -> String {
    let mut out = ProductRecord::HEADER.join(",");
    out.push('\n');
    for r in records {
        let [source, title, mrp, url] = r.fields();
        out.push_str(&quote_if_needed(source));
        out.push(',');
        out.push_str(&quote(title));
        out.push(',');
        out.push_str(&quote_if_needed(mrp));
        out.push(',');
        out.push_str(&quote_if_needed(url));
        out.push('\n');
    }
    out
}

/// Render the `otc` file. The header is written even when there are no rows.
pub fn render_otc(records: &[OtcRecord]) -> Result<Vec<u8>, ScrapeError> {
    let mut wtr = ::csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(::csv::Terminator::CRLF)
        .from_writer(Vec::new());
    wtr.write_record(OTC_HEADER)?;
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.into_inner().map_err(|e| ScrapeError::Io(e.into_error()))
}

#[instrument(level = "info", skip(records), fields(path = %path.display(), rows = records.len()))]
pub async fn write_products(path: &Path, records: &[ProductRecord]) -> Result<(), ScrapeError> {
    let body = render_products(records);
    ensure_parent_dir(path).await?;
    fs::write(path, body).await?;
    info!("Wrote branded CSV");
    Ok(())
}

#[instrument(level = "info", skip(records), fields(path = %path.display(), rows = records.len()))]
pub async fn write_otc(path: &Path, records: &[OtcRecord]) -> Result<(), ScrapeError> {
    let body = render_otc(records)?;
    ensure_parent_dir(path).await?;
    fs::write(path, body).await?;
    info!("Wrote OTC CSV");
    Ok(())
}
