//! Plain HTTP fetching with reqwest.
//!
//! One GET per page, no retry, no custom headers. A non-success status is an
//! error so that a blocked or missing page does not masquerade as an empty
//! category.

use super::PageSource;
use crate::error::ScrapeError;
use crate::utils::duration_millis;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new(timeout: Duration) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScrapeError::http("<client>", e))?;
        Ok(Self { client })
    }
}

impl PageSource for HttpPageSource {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ScrapeError::http(url, e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| ScrapeError::http(url, e))?;

        info!(
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = duration_millis(t0.elapsed()),
            "Fetched page"
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shop-by-category/health-thermometers"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpPageSource::new(Duration::from_secs(5)).unwrap();
        let url = format!("{}/shop-by-category/health-thermometers", server.uri());
        let body = source.fetch(&url).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_error_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let source = HttpPageSource::new(Duration::from_secs(5)).unwrap();
        let err = source.fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Http { .. }));
    }

    #[tokio::test]
    async fn test_timeout_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let source = HttpPageSource::new(Duration::from_millis(50)).unwrap();
        assert!(source.fetch(&server.uri()).await.is_err());
    }
}
