//! Error type shared by the fetchers, extractors and writers.
//!
//! Extraction itself never fails: blocks and cards that do not fit are
//! reported as skips (see [`crate::scrapers::jsonld::BlockOutcome`]). The
//! variants here cover everything that should abort a run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The HTTP request could not be sent or returned an error status.
    #[error("http request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Headless browser launch, navigation or evaluation failed.
    #[error("browser: {0}")]
    Browser(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    /// Bad or unreadable configuration file / flag combination.
    #[error("config: {0}")]
    Config(String),

    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A CSS selector in the configuration does not parse.
    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },
}

impl ScrapeError {
    pub fn http(url: &str, source: reqwest::Error) -> Self {
        ScrapeError::Http {
            url: url.to_string(),
            source,
        }
    }
}

#[cfg(feature = "browser")]
impl From<chromiumoxide::error::CdpError> for ScrapeError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        ScrapeError::Browser(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let e = ScrapeError::InvalidUrl {
            url: "ftp://x".into(),
            reason: "unsupported scheme".into(),
        };
        assert_eq!(
            e.to_string(),
            r#"invalid url "ftp://x": unsupported scheme"#
        );

        let e = ScrapeError::Selector {
            selector: "li[".into(),
            reason: "unexpected end".into(),
        };
        assert!(e.to_string().starts_with(r#"invalid selector "li[""#));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: ScrapeError = io.into();
        assert!(matches!(e, ScrapeError::Io(_)));
    }
}
