//! Page fetchers.
//!
//! Extraction only ever sees an HTML string; how that string was obtained is
//! behind [`PageSource`]:
//!
//! | Fetcher | Module | Use |
//! |---------|--------|-----|
//! | [`HttpPageSource`] | [`http`] | single GET, fixed timeout; pages rendered server-side |
//! | `BrowserPageSource` | `browser` | headless Chrome; pages that inject JSON-LD client-side |
//!
//! The browser fetcher is behind the `browser` cargo feature (on by default).

pub mod http;

#[cfg(feature = "browser")]
pub mod browser;

pub use http::HttpPageSource;

#[cfg(feature = "browser")]
pub use browser::BrowserPageSource;

use crate::error::ScrapeError;

/// Something that can turn a URL into page HTML.
pub trait PageSource {
    /// Fetch `url` and return the page's HTML.
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;

    /// Release whatever the source holds. Must not fail; problems are logged.
    async fn close(self)
    where
        Self: Sized,
    {
    }
}

/// Run `work` against `source`, then close the source whatever the outcome.
pub async fn collect_then_close<S, T>(
    source: S,
    work: impl AsyncFnOnce(&S) -> Result<T, ScrapeError>,
) -> Result<T, ScrapeError>
where
    S: PageSource,
{
    let result = work(&source).await;
    source.close().await;
    result
}
