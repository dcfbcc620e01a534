use crate::config::CrawlConfig;
use crate::models::{BasicRecord, DetailRecord, MergedRecord};
use crate::scrapers::{extract_cards, extract_detail, PageFetcher, ScrapeError};
use crate::sink::{CsvSink, SinkWriter};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Counters for one crawl run
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Results pages whose cards were read
    pub pages: u32,
    /// Results pages skipped (timeout or no results container)
    pub skipped_pages: u32,
    pub cards: usize,
    /// Cards without a link, never persisted
    pub dropped: usize,
    /// Listings persisted with detail fields
    pub enriched: usize,
    /// Listings persisted with card fields only
    pub degraded: usize,
    /// Listings lost to a crashed task
    pub failed: usize,
    /// Rows written by the sink
    pub persisted: usize,
}

impl CrawlSummary {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            pages: 0,
            skipped_pages: 0,
            cards: 0,
            dropped: 0,
            enriched: 0,
            degraded: 0,
            failed: 0,
            persisted: 0,
        }
    }
}

/// Walks the configured results pages and persists one row per listing.
///
/// Pages are processed one after another. Within a page, up to
/// `config.workers` detail pages are fetched at once; all of them finish
/// before the next page is requested. Rows reach the sink as soon as
/// each listing is done.
pub struct Crawler {
    fetcher: Arc<dyn PageFetcher>,
    config: CrawlConfig,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: CrawlConfig) -> Self {
        Self { fetcher, config }
    }

    /// Run the whole page range into `sink`.
    ///
    /// A failed results-page fetch aborts the run: the fetch backend is
    /// unusable. Detail-page problems only degrade the affected listing.
    pub async fn run(&self, sink: CsvSink) -> Result<CrawlSummary> {
        let mut summary = CrawlSummary::new();
        let writer = SinkWriter::spawn(sink, self.config.workers * 2);

        info!(
            "Crawling pages {}..={} with {} worker(s) via {}",
            self.config.start_page,
            self.config.end_page,
            self.config.workers,
            self.fetcher.backend_name()
        );

        let crawled = self.crawl_pages(&writer.sender(), &mut summary).await;
        // Flush what was already sent even if the crawl stopped early
        let persisted = writer.finish().await;

        crawled?;
        summary.persisted = persisted?;
        summary.finished_at = Some(Utc::now());
        Ok(summary)
    }

    async fn crawl_pages(
        &self,
        sink: &mpsc::Sender<MergedRecord>,
        summary: &mut CrawlSummary,
    ) -> Result<()> {
        for page in self.config.pages() {
            let url = self.config.search.page_url(page);
            info!("📄 Fetching results page {}: {}", page, url);

            let html = match timeout(self.config.fetch_timeout, self.fetcher.navigate(&url)).await
            {
                Ok(fetched) => fetched.with_context(|| format!("Results page {page} unavailable"))?,
                Err(_) => {
                    warn!("Results page {} timed out after {:?}, skipping", page, self.config.fetch_timeout);
                    summary.skipped_pages += 1;
                    continue;
                }
            };

            let cards = match extract_cards(&html, &url) {
                Ok(cards) => cards,
                Err(e) => {
                    warn!("{}, skipping page {}", e, page);
                    summary.skipped_pages += 1;
                    continue;
                }
            };

            info!("Found {} cards on page {}", cards.len(), page);
            summary.pages += 1;
            summary.cards += cards.len();
            self.enrich_page(cards, sink, summary).await?;
        }
        Ok(())
    }

    /// Enrich and persist every card of one results page
    async fn enrich_page(
        &self,
        cards: Vec<BasicRecord>,
        sink: &mpsc::Sender<MergedRecord>,
        summary: &mut CrawlSummary,
    ) -> Result<()> {
        let permits = Arc::new(Semaphore::new(self.config.workers));
        let mut tasks = JoinSet::new();

        for basic in cards {
            let Some(url) = basic.url.clone() else {
                debug!("Dropping card without link: {:?}", basic.sub_property_type);
                summary.dropped += 1;
                continue;
            };

            let permit = Arc::clone(&permits)
                .acquire_owned()
                .await
                .context("Worker pool closed")?;
            let fetcher = Arc::clone(&self.fetcher);
            let sink = sink.clone();
            let settle = self.config.settle;
            let deadline = self.config.fetch_timeout + settle;

            tasks.spawn(async move {
                let _permit = permit;
                // Own task, so a crash while reading the page still leaves the card
                let detail_url = url.clone();
                let detail = tokio::spawn(async move {
                    fetch_detail(fetcher.as_ref(), &detail_url, settle, deadline).await
                })
                .await;

                let (record, enriched) = match detail {
                    Ok(Ok(detail)) => (MergedRecord::merge(basic, detail), true),
                    Ok(Err(e)) => {
                        warn!("Error processing {}: {}", url, e);
                        (MergedRecord::from_basic(basic), false)
                    }
                    Err(e) => {
                        error!("Detail extraction crashed for {}: {}", url, e);
                        (MergedRecord::from_basic(basic), false)
                    }
                };
                sink.send(record)
                    .await
                    .map_err(|_| anyhow!("Sink writer stopped before {url} was saved"))?;
                Ok::<bool, anyhow::Error>(enriched)
            });

            // Surface sink failures without waiting for the whole page
            while let Some(joined) = tasks.try_join_next() {
                tally(joined, summary)?;
            }
        }

        while let Some(joined) = tasks.join_next().await {
            tally(joined, summary)?;
        }
        Ok(())
    }
}

fn tally(
    joined: Result<Result<bool>, tokio::task::JoinError>,
    summary: &mut CrawlSummary,
) -> Result<()> {
    match joined {
        Ok(Ok(true)) => summary.enriched += 1,
        Ok(Ok(false)) => summary.degraded += 1,
        Ok(Err(e)) => return Err(e),
        Err(e) => {
            error!("Listing task crashed: {}", e);
            summary.failed += 1;
        }
    }
    Ok(())
}

/// Second round-trip for one listing: fetch its detail page and read it
async fn fetch_detail(
    fetcher: &dyn PageFetcher,
    url: &str,
    settle: Duration,
    deadline: Duration,
) -> Result<DetailRecord, ScrapeError> {
    let html = match timeout(deadline, fetcher.navigate_and_settle(url, settle)).await {
        Ok(Ok(html)) => html,
        Ok(Err(source)) => {
            return Err(ScrapeError::Fetch {
                url: url.to_string(),
                source,
            })
        }
        Err(_) => {
            return Err(ScrapeError::Timeout {
                url: url.to_string(),
                after: deadline,
            })
        }
    };

    extract_detail(&html, url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchParams;
    use crate::models::{KitchenType, PropertyType};
    use anyhow::bail;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::Path;
    use tempfile::TempDir;

    const BASE_URL: &str = "https://immo.test/recherche";

    /// Serves canned pages; unknown URLs fail, `slow` URLs never finish in
    /// time, `broken` URLs panic
    #[derive(Default)]
    struct StaticFetcher {
        pages: HashMap<String, String>,
        slow: Vec<String>,
        broken: Vec<String>,
    }

    impl StaticFetcher {
        fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
            self.pages.insert(url.to_string(), html.into());
            self
        }

        fn with_slow(mut self, url: &str) -> Self {
            self.slow.push(url.to_string());
            self
        }

        fn with_broken(mut self, url: &str) -> Self {
            self.broken.push(url.to_string());
            self
        }
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn navigate(&self, url: &str) -> Result<String> {
            if self.slow.iter().any(|slow| slow == url) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            match self.pages.get(url) {
                Some(html) => Ok(html.clone()),
                None => bail!("no page at {url}"),
            }
        }

        async fn navigate_and_settle(&self, url: &str, _settle: Duration) -> Result<String> {
            if self.broken.iter().any(|broken| broken == url) {
                panic!("renderer crashed on {url}");
            }
            self.navigate(url).await
        }

        fn backend_name(&self) -> &'static str {
            "static"
        }
    }

    fn config(pages: std::ops::RangeInclusive<u32>, workers: usize, output: &Path) -> CrawlConfig {
        CrawlConfig {
            search: SearchParams {
                base_url: BASE_URL.to_string(),
                country: "BE".to_string(),
            },
            start_page: *pages.start(),
            end_page: *pages.end(),
            output: output.to_path_buf(),
            workers,
            settle: Duration::ZERO,
            fetch_timeout: Duration::from_millis(200),
            ..CrawlConfig::default()
        }
    }

    fn page_url(page: u32) -> String {
        format!("{BASE_URL}?countries=BE&page={page}&orderBy=newest")
    }

    fn listing_url(id: u32) -> String {
        format!("https://immo.test/annonce/{id}")
    }

    fn card(id: u32, title: &str) -> String {
        format!(
            r#"<li><article class="card">
                 <a class="card__title-link" href="{}">{title}</a>
                 <p class="card--result__price">{id}00&#x202F;000 €</p>
                 <div class="card__informations">
                   <p class="card__information--property">2 ch. · 90 m²</p>
                   <p class="card__information card--results__information--locality">4000 LIÈGE</p>
                 </div>
               </article></li>"#,
            listing_url(id)
        )
    }

    fn results_page(cards: &[String]) -> String {
        format!(
            r#"<html><body><div id="searchResults"><ul id="main-content"><div>{}</div></ul></div></body></html>"#,
            cards.concat()
        )
    }

    fn detail_page(sections: &str) -> String {
        format!(r#"<html><body><div class="container container--body">{sections}</div></body></html>"#)
    }

    fn section(title: &str, label: &str, value: &str) -> String {
        format!(
            r#"<div class="text-block"><h2 class="text-block__title">{title}</h2>
               <table><tr class="classified-table__row"><th>{label}</th><td>{value}</td></tr></table></div>"#
        )
    }

    fn read_rows(path: &Path) -> Vec<MergedRecord> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader.deserialize().map(|row| row.unwrap()).collect()
    }

    async fn crawl(fetcher: StaticFetcher, config: CrawlConfig) -> Result<CrawlSummary> {
        let sink = CsvSink::new(&config.output);
        Crawler::new(Arc::new(fetcher), config).run(sink).await
    }

    #[tokio::test]
    async fn villa_without_pool_end_to_end() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("listings.csv");
        let fetcher = StaticFetcher::default()
            .with_page(&page_url(1), results_page(&[card(1, "Villa")]))
            .with_page(
                &listing_url(1),
                detail_page(&section("Installations", "Piscine", "non")),
            );

        let summary = crawl(fetcher, config(1..=1, 1, &output)).await.unwrap();
        assert_eq!(summary.enriched, 1);
        assert_eq!(summary.persisted, 1);

        let rows = read_rows(&output);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.url.as_deref(), Some(listing_url(1).as_str()));
        assert_eq!(row.property_type, Some(PropertyType::House));
        assert_eq!(row.sub_property_type.as_deref(), Some("Villa"));
        assert_eq!(row.price.as_deref(), Some("100000"));
        assert_eq!(row.locality.as_deref(), Some("Liège"));
        assert_eq!(row.swimming_pool, Some(false));
        assert_eq!(row.facades, None);
        assert_eq!(row.kitchen_type, None);
        assert_eq!(row.garden, None);
        assert_eq!(row.land_surface, None);
    }

    #[tokio::test]
    async fn detail_failures_degrade_to_card_fields() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("listings.csv");
        let fetcher = StaticFetcher::default()
            .with_page(
                &page_url(1),
                results_page(&[card(1, "Maison"), card(2, "Appartement"), card(3, "Duplex")]),
            )
            // 1: no body container; 2: not served at all; 3: fine
            .with_page(&listing_url(1), "<html><body><p>Bot check</p></body></html>")
            .with_page(
                &listing_url(3),
                detail_page(&section("Intérieur", "Type de cuisine", "Semi équipée")),
            );

        let summary = crawl(fetcher, config(1..=1, 1, &output)).await.unwrap();
        assert_eq!(summary.cards, 3);
        assert_eq!(summary.enriched, 1);
        assert_eq!(summary.degraded, 2);
        assert_eq!(summary.persisted, 3);

        let rows = read_rows(&output);
        let by_url = |id: u32| {
            rows.iter()
                .find(|row| row.url.as_deref() == Some(listing_url(id).as_str()))
                .unwrap()
        };
        assert_eq!(by_url(1).property_type, Some(PropertyType::House));
        assert_eq!(by_url(1).swimming_pool, None);
        assert_eq!(by_url(2).price.as_deref(), Some("200000"));
        assert_eq!(by_url(3).kitchen_type, Some(KitchenType::SemiEquipped));
    }

    #[tokio::test]
    async fn slow_detail_page_times_out_per_listing() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("listings.csv");
        let fetcher = StaticFetcher::default()
            .with_page(&page_url(1), results_page(&[card(1, "Villa"), card(2, "Villa")]))
            .with_page(&listing_url(1), detail_page(""))
            .with_page(&listing_url(2), detail_page(""))
            .with_slow(&listing_url(1));

        let summary = crawl(fetcher, config(1..=1, 2, &output)).await.unwrap();
        assert_eq!(summary.degraded, 1);
        assert_eq!(summary.enriched, 1);
        assert_eq!(read_rows(&output).len(), 2);
    }

    #[tokio::test]
    async fn crashed_detail_extraction_still_persists_the_card() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("listings.csv");
        let fetcher = StaticFetcher::default()
            .with_page(&page_url(1), results_page(&[card(1, "Villa"), card(2, "Villa")]))
            .with_page(&listing_url(1), detail_page(""))
            .with_page(&listing_url(2), detail_page(""))
            .with_broken(&listing_url(1));

        let summary = crawl(fetcher, config(1..=1, 1, &output)).await.unwrap();
        assert_eq!(summary.degraded, 1);
        assert_eq!(summary.enriched, 1);
        assert_eq!(summary.failed, 0);

        let rows = read_rows(&output);
        assert_eq!(rows.len(), 2);
        let crashed = rows
            .iter()
            .find(|row| row.url.as_deref() == Some(listing_url(1).as_str()))
            .unwrap();
        assert_eq!(crashed.property_type, Some(PropertyType::House));
        assert_eq!(crashed.price.as_deref(), Some("100000"));
    }

    #[tokio::test]
    async fn pages_are_walked_in_range_with_a_worker_pool() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("listings.csv");
        let mut fetcher = StaticFetcher::default()
            .with_page(&page_url(2), results_page(&[card(1, "Villa"), card(2, "Ferme")]))
            .with_page(
                &page_url(3),
                results_page(&[card(3, "Studio"), card(4, "Chalet"), card(5, "Loft")]),
            )
            // Page 4 lost its results container; the crawl moves on
            .with_page(&page_url(4), "<html><body>Maintenance</body></html>");
        for id in 1..=5 {
            fetcher = fetcher.with_page(&listing_url(id), detail_page(""));
        }

        let summary = crawl(fetcher, config(2..=4, 3, &output)).await.unwrap();
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.skipped_pages, 1);
        assert_eq!(summary.enriched, 5);
        assert_eq!(summary.persisted, 5);
        assert_eq!(read_rows(&output).len(), 5);
    }

    #[tokio::test]
    async fn unreachable_results_page_aborts_after_flushing() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("listings.csv");
        let fetcher = StaticFetcher::default()
            .with_page(&page_url(1), results_page(&[card(1, "Villa")]))
            .with_page(&listing_url(1), detail_page(""));

        let err = crawl(fetcher, config(1..=2, 1, &output))
            .await
            .expect_err("page 2 is not served");
        assert!(format!("{err:#}").contains("Results page 2 unavailable"));
        assert_eq!(read_rows(&output).len(), 1);
    }

    #[tokio::test]
    async fn cards_without_links_are_dropped() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("listings.csv");
        let linkless = r#"<li><a class="card__title-link">Villa</a></li>"#.to_string();
        let fetcher = StaticFetcher::default()
            .with_page(&page_url(1), results_page(&[linkless, card(1, "Villa")]))
            .with_page(&listing_url(1), detail_page(""));

        let summary = crawl(fetcher, config(1..=1, 1, &output)).await.unwrap();
        assert_eq!(summary.cards, 2);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.persisted, 1);
    }
}
