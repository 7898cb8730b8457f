//! Headless Chrome fetching with chromiumoxide.
//!
//! Product JSON-LD on some category pages is injected by client-side script
//! after the initial load, so a page is only read once it has settled:
//!
//! 1. navigate and wait for the load event
//! 2. poll in-page until the resource count stops growing (network idle)
//! 3. sleep a fixed settle delay
//! 4. serialize the rendered document
//!
//! One browser and one tab serve the whole run, visited sequentially. The tab
//! presents a desktop Chrome user agent with the configured locale and
//! timezone, and the automation-controlled blink feature is switched off.

use super::PageSource;
use crate::config::BrandedConfig;
use crate::error::ScrapeError;
use crate::utils::duration_millis;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetLocaleOverrideParams, SetTimezoneOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// A launched browser with its single working tab.
pub struct BrowserPageSource {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    settle: Duration,
    idle_timeout: Duration,
}

impl BrowserPageSource {
    #[instrument(level = "info", skip_all)]
    pub async fn launch(cfg: &BrandedConfig) -> Result<Self, ScrapeError> {
        let config = BrowserConfig::builder()
            .arg("--disable-blink-features=AutomationControlled")
            .request_timeout(Duration::from_secs(cfg.navigation_timeout_secs))
            .build()
            .map_err(ScrapeError::Browser)?;
        let (browser, mut handler) = Browser::launch(config).await?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!(error = %e, "chromiumoxide handler event error");
                }
            }
        });

        let page = match open_page(&browser, cfg).await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(e.into());
            }
        };
        info!(locale = %cfg.locale, timezone = %cfg.timezone, "Headless browser ready");

        Ok(Self {
            browser,
            page,
            handler_task,
            settle: Duration::from_millis(cfg.settle_ms),
            idle_timeout: Duration::from_secs(cfg.network_idle_timeout_secs),
        })
    }
}

/// Open the working tab with the configured user agent, locale and timezone.
async fn open_page(browser: &Browser, cfg: &BrandedConfig) -> Result<Page, CdpError> {
    let page = browser.new_page("about:blank").await?;

    let mut agent = SetUserAgentOverrideParams::new(cfg.user_agent.clone());
    agent.accept_language = Some(cfg.locale.clone());
    page.set_user_agent(agent).await?;
    page.execute(SetLocaleOverrideParams {
        locale: Some(cfg.locale.clone()),
    })
    .await?;
    page.execute(SetTimezoneOverrideParams::new(cfg.timezone.clone()))
        .await?;

    Ok(page)
}

impl PageSource for BrowserPageSource {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let t0 = Instant::now();
        self.page.goto(url).await?;
        debug!(elapsed_ms = duration_millis(t0.elapsed()), "Navigation finished");

        wait_for_network_idle(&self.page, self.idle_timeout).await;
        sleep(self.settle).await;

        let html = self.page.content().await?;
        info!(
            bytes = html.len(),
            elapsed_ms = duration_millis(t0.elapsed()),
            "Rendered page"
        );
        Ok(html)
    }

    /// Shut the browser down. Failures are logged, never returned, so the
    /// caller can always report the outcome of the run itself.
    #[instrument(level = "info", skip_all)]
    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Browser close failed");
        }
        if let Err(e) = self.browser.wait().await {
            debug!(error = %e, "Browser process wait failed");
        }
        self.handler_task.abort();
        info!("Headless browser closed");
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdleCheck {
    settled: bool,
    ready_state: String,
    resources: u64,
    waited_ms: u64,
}

/// Poll `performance` resource entries until they hold steady for a second
/// with the document complete, or `timeout` runs out. Never fails the fetch:
/// a page that keeps polling forever is read as-is.
async fn wait_for_network_idle(page: &Page, timeout: Duration) {
    let js = format!(
        r#"(async () => {{
            const timeoutMs = {timeout_ms};
            const quietMs = 1000;
            const step = 250;
            const count = () => {{
                try {{ return performance.getEntriesByType('resource').length; }} catch (_) {{ return 0; }}
            }};
            const start = Date.now();
            let last = count();
            let quiet = 0;
            while (Date.now() - start < timeoutMs) {{
                await new Promise(r => setTimeout(r, step));
                const now = count();
                if (document.readyState === 'complete' && now === last) {{
                    quiet += step;
                    if (quiet >= quietMs) {{
                        return {{ settled: true, readyState: document.readyState, resources: now, waitedMs: Date.now() - start }};
                    }}
                }} else {{
                    quiet = 0;
                }}
                last = now;
            }}
            return {{ settled: false, readyState: document.readyState, resources: last, waitedMs: Date.now() - start }};
        }})()"#,
        timeout_ms = duration_millis(timeout)
    );

    let check = match page.evaluate(js).await {
        Ok(result) => result.into_value::<IdleCheck>(),
        Err(e) => {
            warn!(error = %e, "Network idle check failed");
            return;
        }
    };

    match check {
        Ok(p) if p.settled => debug!(
            ready_state = %p.ready_state,
            resources = p.resources,
            waited_ms = p.waited_ms,
            "Network idle"
        ),
        Ok(p) => warn!(
            ready_state = %p.ready_state,
            resources = p.resources,
            waited_ms = p.waited_ms,
            "Network idle wait timed out; reading page anyway"
        ),
        Err(e) => warn!(error = %e, "Network idle check returned unexpected value"),
    }
}
