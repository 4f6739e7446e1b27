//! Ecdysis → iNaturalist enrichment crawler
//!
//! Walks the distinct `occurrenceID` values of the exported Ecdysis dataset,
//! fetches each record's detail page (reusing the on-disk [`PageCache`]),
//! extracts the linked iNaturalist observation ID, and writes the
//! occurrence → observation mapping as Parquet. Real network requests are
//! paced by [`Throttle`]; cache hits neither wait nor delay later fetches.
//!
//! Everything runs on one sequential control flow. A transport failure for
//! one record yields a null observation ID and moves on; only cache or
//! output I/O errors abort the crawl.

pub mod cache;
pub mod extract;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use atlas_common::{AtlasError, Result};
use indicatif::ProgressBar;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::export;
use self::cache::PageCache;

const ECDYSIS_RECORD_URL: &str = "https://ecdysis.org/collections/individual/index.php";

/// Default floor between outbound requests (20 requests per second max).
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(50);

/// One row of the crawler's output mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InatLink {
    pub occurrence_id: String,
    /// `None` when the page was unreachable or carried no observation link
    pub observation_id: Option<i64>,
}

/// Crawler configuration; directories and pacing are passed in explicitly
/// so tests can redirect them.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Record page endpoint, queried as `?occid=<key>&clid=0`
    pub base_url: Url,
    pub cache_dir: PathBuf,
    /// Minimum interval between real outbound requests
    pub rate_limit: Duration,
    pub timeout: Duration,
}

impl CrawlerConfig {
    /// Configuration against the live Ecdysis record endpoint.
    pub fn ecdysis(cache_dir: impl Into<PathBuf>, rate_limit: Duration) -> Result<Self> {
        let base_url = Url::parse(ECDYSIS_RECORD_URL)
            .map_err(|e| AtlasError::Config(format!("invalid record url: {e}")))?;
        Ok(Self {
            base_url,
            cache_dir: cache_dir.into(),
            rate_limit,
            timeout: Duration::from_secs(10),
        })
    }
}

/// Enforces a minimum interval between consecutive real requests. The clock
/// starts when a request is released, so slow responses widen the gap and
/// are not compensated for.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_release: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_release: None,
        }
    }

    /// Sleep out the remainder of the interval since the previous release,
    /// then mark this instant as the new release point.
    pub async fn pause(&mut self) {
        if let Some(last) = self.last_release {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        self.last_release = Some(Instant::now());
    }
}

/// Sequential, cache-backed, rate-limited page crawler.
pub struct Crawler {
    client: Client,
    cache: PageCache,
    throttle: Throttle,
    base_url: Url,
    timeout: Duration,
}

impl Crawler {
    pub fn new(client: Client, config: CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client,
            cache: PageCache::open(config.cache_dir)?,
            throttle: Throttle::new(config.rate_limit),
            base_url: config.base_url,
            timeout: config.timeout,
        })
    }

    /// Visit each distinct key once and return one mapping row per key.
    pub async fn crawl(&mut self, keys: &[String]) -> Result<Vec<InatLink>> {
        let distinct = distinct_keys(keys);
        info!(
            records = keys.len(),
            distinct = distinct.len(),
            "Crawling record pages"
        );

        let cached = distinct.iter().filter(|k| self.cache.contains(k)).count();
        let to_fetch = distinct.len() - cached;
        info!(cached, to_fetch, "Cache status");
        if to_fetch > 0 {
            info!(
                estimated_seconds = (to_fetch as f64 * self.throttle.interval.as_secs_f64()),
                "Fetching uncached pages"
            );
        }

        let progress = ProgressBar::new(distinct.len() as u64);
        let mut links = Vec::with_capacity(distinct.len());
        for key in &distinct {
            let body = self.page_for(key).await?;
            let observation_id = body.as_deref().and_then(extract::observation_id);
            links.push(InatLink {
                occurrence_id: key.clone(),
                observation_id,
            });
            progress.inc(1);
        }
        progress.finish_and_clear();

        Ok(links)
    }

    /// Body for one record page: from cache when present, otherwise fetched
    /// under the rate limit and cached. `None` means the fetch failed; no
    /// cache entry is written so the key is retried on a later run.
    async fn page_for(&mut self, occid: &str) -> Result<Option<String>> {
        if let Some(body) = self.cache.get(occid)? {
            return Ok(Some(body));
        }

        self.throttle.pause().await;
        let body = match self.fetch_page(occid).await {
            Ok(body) => body,
            Err(e) => {
                warn!(occid, error = %e, "Record page fetch failed");
                return Ok(None);
            },
        };
        self.cache.put(occid, &body)?;
        Ok(Some(body))
    }

    async fn fetch_page(&self, occid: &str) -> Result<String> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("occid", occid)
            .append_pair("clid", "0");
        debug!(%url, "Fetching record page");

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AtlasError::network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AtlasError::network(format!(
                "occid {occid}: HTTP {}",
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|e| AtlasError::network(e.to_string()))
    }
}

/// Distinct keys in first-seen order.
fn distinct_keys(keys: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.iter()
        .filter(|k| seen.insert(k.as_str()))
        .cloned()
        .collect()
}

/// Full enrichment run: read the exported dataset's keys, crawl, write the
/// mapping file, and report how many records resolved.
pub async fn fetch_links(
    client: &Client,
    input: &Path,
    output: &Path,
    config: CrawlerConfig,
) -> Result<()> {
    info!(path = %input.display(), "Loading exported dataset");
    let keys = export::read_text_column(input, export::OCCURRENCE_ID_COLUMN)?;

    let mut crawler = Crawler::new(client.clone(), config)?;
    let links = crawler.crawl(&keys).await?;

    info!(path = %output.display(), "Writing mapping file");
    export::write_links(&links, output)?;

    let with_links = links.iter().filter(|l| l.observation_id.is_some()).count();
    info!(
        with_links,
        without_links = links.len() - with_links,
        "Enrichment complete"
    );
    Ok(())
}
