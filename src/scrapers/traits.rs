use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Capability to turn a URL into rendered page markup.
///
/// Implementations decide how pages are rendered (headless browser, plain
/// HTTP). Each call uses its own fetch context so listings never share a tab.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Navigate to `url` and return the rendered HTML
    async fn navigate(&self, url: &str) -> Result<String>;

    /// Navigate to `url`, wait `settle` for client-side content, then return the HTML
    async fn navigate_and_settle(&self, url: &str, settle: Duration) -> Result<String>;

    /// Name of the fetch backend, for logs
    fn backend_name(&self) -> &'static str;
}
