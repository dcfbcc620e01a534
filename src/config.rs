use anyhow::{bail, Context, Result};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://www.immoweb.be/fr/recherche/maison-et-appartement/a-vendre";

/// Search parameters shared by every results page
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// Search endpoint, without query string
    pub base_url: String,
    /// Country filter, e.g. "BE"
    pub country: String,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            country: "BE".to_string(),
        }
    }
}

impl SearchParams {
    /// Results page `page`, newest listings first
    pub fn page_url(&self, page: u32) -> String {
        format!(
            "{}?countries={}&page={}&orderBy=newest",
            self.base_url, self.country, page
        )
    }
}

/// How pages are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetcherKind {
    Browser,
    Http,
}

impl FromStr for FetcherKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "browser" => Ok(Self::Browser),
            "http" => Ok(Self::Http),
            other => bail!("unknown fetcher {other:?}, expected \"browser\" or \"http\""),
        }
    }
}

/// Everything a crawl run needs to know
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub search: SearchParams,
    /// First results page, inclusive
    pub start_page: u32,
    /// Last results page, inclusive
    pub end_page: u32,
    /// CSV destination, appended to across runs
    pub output: PathBuf,
    /// Concurrent detail fetches per page
    pub workers: usize,
    /// Wait after a detail page loads before reading it
    pub settle: Duration,
    /// Deadline for a single fetch
    pub fetch_timeout: Duration,
    pub fetcher: FetcherKind,
    pub headless: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            search: SearchParams::default(),
            start_page: 1,
            end_page: 15,
            output: PathBuf::from("immoweb_data.csv"),
            workers: 1,
            settle: Duration::from_secs(2),
            fetch_timeout: Duration::from_secs(30),
            fetcher: FetcherKind::Browser,
            headless: true,
        }
    }
}

impl CrawlConfig {
    /// Defaults overridden by `SCRAPER_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("SCRAPER_BASE_URL") {
            config.search.base_url = v;
        }
        if let Some(v) = lookup("SCRAPER_COUNTRY") {
            config.search.country = v;
        }
        if let Some(v) = lookup("SCRAPER_START_PAGE") {
            config.start_page = parse_var("SCRAPER_START_PAGE", &v)?;
        }
        if let Some(v) = lookup("SCRAPER_END_PAGE") {
            config.end_page = parse_var("SCRAPER_END_PAGE", &v)?;
        }
        if let Some(v) = lookup("SCRAPER_OUTPUT") {
            config.output = PathBuf::from(v);
        }
        if let Some(v) = lookup("SCRAPER_WORKERS") {
            config.workers = parse_var("SCRAPER_WORKERS", &v)?;
        }
        if let Some(v) = lookup("SCRAPER_SETTLE_MS") {
            config.settle = Duration::from_millis(parse_var("SCRAPER_SETTLE_MS", &v)?);
        }
        if let Some(v) = lookup("SCRAPER_FETCH_TIMEOUT_SECS") {
            config.fetch_timeout = Duration::from_secs(parse_var("SCRAPER_FETCH_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("SCRAPER_FETCHER") {
            config.fetcher = parse_var("SCRAPER_FETCHER", &v)?;
        }
        if let Some(v) = lookup("SCRAPER_HEADLESS") {
            config.headless = parse_var("SCRAPER_HEADLESS", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_page > self.end_page {
            bail!(
                "start page {} is after end page {}",
                self.start_page,
                self.end_page
            );
        }
        if self.workers == 0 {
            bail!("at least one worker is required");
        }
        Ok(())
    }

    pub fn pages(&self) -> RangeInclusive<u32> {
        self.start_page..=self.end_page
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid value {value:?} for {key}"))
}
