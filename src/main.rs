mod config;
mod crawler;
mod models;
mod scrapers;
mod sink;

use anyhow::Context;
use config::{CrawlConfig, FetcherKind};
use crawler::Crawler;
use scrapers::{BrowserFetcher, HttpFetcher, PageFetcher};
use sink::CsvSink;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🏠 Immo Scout - listing crawler");
    info!("==============================");

    let config = CrawlConfig::from_env().context("Invalid crawl configuration")?;
    info!(
        "Pages {}..={}, writing to {}",
        config.start_page,
        config.end_page,
        config.output.display()
    );

    let fetcher: Arc<dyn PageFetcher> = match config.fetcher {
        FetcherKind::Browser => Arc::new(BrowserFetcher::new(config.headless, config.fetch_timeout)?),
        FetcherKind::Http => Arc::new(HttpFetcher::new(config.fetch_timeout)?),
    };

    let sink = CsvSink::new(&config.output);
    let summary = Crawler::new(fetcher, config).run(sink).await?;

    info!(
        "✅ Crawled {} page(s): {} listing(s) saved, {} enriched, {} card-only, {} dropped",
        summary.pages, summary.persisted, summary.enriched, summary.degraded, summary.dropped
    );
    info!("Run summary: {}", serde_json::to_string(&summary)?);

    Ok(())
}
