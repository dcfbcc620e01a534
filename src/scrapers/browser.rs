use crate::scrapers::traits::PageFetcher;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Page fetcher backed by headless Chrome.
///
/// Every navigation opens a fresh tab and closes it afterwards. A render
/// gives up once `fetch_timeout` plus the settle period has elapsed, so no
/// tab outlives the caller's deadline.
pub struct BrowserFetcher {
    browser: Browser,
    fetch_timeout: Duration,
}

impl BrowserFetcher {
    /// Launch Chrome
    pub fn new(headless: bool, fetch_timeout: Duration) -> Result<Self> {
        info!("Launching Chrome (headless: {})...", headless);

        let options = LaunchOptions::default_builder()
            .headless(headless)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

        Ok(Self {
            browser,
            fetch_timeout,
        })
    }

    async fn render(&self, url: &str, settle: Duration) -> Result<String> {
        let browser = self.browser.clone();
        let url = url.to_string();
        let deadline = Instant::now() + self.fetch_timeout + settle;

        // The CDP client is blocking
        tokio::task::spawn_blocking(move || render_in_new_tab(&browser, &url, settle, deadline))
            .await
            .context("Browser task panicked")?
    }
}

fn render_in_new_tab(
    browser: &Browser,
    url: &str,
    settle: Duration,
    deadline: Instant,
) -> Result<String> {
    let tab = browser.new_tab().context("Failed to open a new tab")?;

    let rendered = (|| -> Result<String> {
        bounded(&tab, url, deadline)?.navigate_to(url)?;
        bounded(&tab, url, deadline)?.wait_until_navigated()?;

        let settle = settle.min(time_left(url, deadline)?);
        if !settle.is_zero() {
            debug!("Waiting {:?} for {} to settle", settle, url);
            thread::sleep(settle);
        }

        let html_result = bounded(&tab, url, deadline)?
            .evaluate("document.documentElement.outerHTML", false)?;
        html_result
            .value
            .as_ref()
            .and_then(|value| value.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Could not get HTML from page"))
    })();

    if let Err(e) = tab.close(true) {
        warn!("Failed to close tab for {}: {}", url, e);
    }

    let html = rendered.with_context(|| format!("Failed to render {url}"))?;
    debug!("Rendered {} ({} bytes)", url, html.len());
    Ok(html)
}

/// Limit the tab's next CDP call to the time left before `deadline`
fn bounded<'t>(tab: &'t Tab, url: &str, deadline: Instant) -> Result<&'t Tab> {
    let left = time_left(url, deadline)?;
    Ok(tab.set_default_timeout(left))
}

fn time_left(url: &str, deadline: Instant) -> Result<Duration> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|left| !left.is_zero())
        .ok_or_else(|| anyhow!("Deadline passed while rendering {url}"))
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn navigate(&self, url: &str) -> Result<String> {
        self.render(url, Duration::ZERO).await
    }

    async fn navigate_and_settle(&self, url: &str, settle: Duration) -> Result<String> {
        self.render(url, settle).await
    }

    fn backend_name(&self) -> &'static str {
        "headless-chrome"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_left_shrinks_to_an_error() {
        let url = "https://immo.test/annonce/1";

        let left = time_left(url, Instant::now() + Duration::from_secs(60)).unwrap();
        assert!(left > Duration::from_secs(59));

        let err = time_left(url, Instant::now() - Duration::from_millis(1)).unwrap_err();
        assert!(err.to_string().contains("Deadline passed"));
    }

    #[test]
    fn settle_is_clamped_to_the_deadline() {
        let deadline = Instant::now() + Duration::from_millis(500);
        let settle = Duration::from_secs(2).min(time_left("u", deadline).unwrap());
        assert!(settle <= Duration::from_millis(500));
    }
}
