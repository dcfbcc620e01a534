use std::time::Duration;
use thiserror::Error;

/// Conditions raised while fetching or reading listing pages.
///
/// Per-field gaps are never errors; they surface as `None` on the record.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("search results container not found on {url}")]
    ResultsNotFound { url: String },

    #[error("body container not found on {url}")]
    ContainerNotFound { url: String },

    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("fetching {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },
}
