use std::sync::Arc;

use chrono::NaiveDate;

mod discovery;
mod reporting_task;
mod stop;
mod worker_pool;
mod worker_task;

use crate::Config;
use crate::error::{Error, Result};
use crate::posting::{DateWindow, JobPosting};
use crate::source::SourceParser;
use crate::stats::Stats;

pub use discovery::{Discovery, discover_category};
pub use stop::{StopHandle, StopListener};
pub use worker_pool::{DescriptionFetcher, FetchReport};
pub use worker_task::{FetchOutcome, RetryPolicy, fetch_with_retry};

/// Runs incremental crawls of a single job board.
///
/// A crawl discovers the postings of each requested category published in
/// the date window, then fetches their descriptions concurrently. Only
/// postings with a description are returned.
pub struct Harvester {
    config: Arc<Config>,
    parser: Arc<dyn SourceParser>,
    stats: Arc<Stats>,
    stop: StopHandle,
}

impl Harvester {
    pub fn new(config: Config, parser: Arc<dyn SourceParser>) -> Self {
        Self {
            config: Arc::new(config),
            parser,
            stats: Arc::new(Stats::new()),
            stop: StopHandle::new(),
        }
    }

    /// Handle that cancels the running (and any later) crawl.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Counters of the most recent crawl.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Crawl every category the source knows about.
    pub async fn run_crawl(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<JobPosting>> {
        let categories: Vec<&str> = self.parser.category_map().categories().collect();
        self.run_crawl_categories(&categories, start, end).await
    }

    pub async fn run_crawl_categories<S: AsRef<str>>(
        &self,
        categories: &[S],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<JobPosting>> {
        let report = self.crawl(categories, start, end).await?;
        Ok(report.completed)
    }

    /// Like [`Harvester::run_crawl_categories`] but also hands back the
    /// postings whose description could not be fetched.
    pub async fn crawl<S: AsRef<str>>(
        &self,
        categories: &[S],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchReport> {
        self.config.sanity_check()?;
        let window = DateWindow::new(start, end)?;

        let source = self.parser.name();
        let category_map = self.parser.category_map();
        if let Some(missing) = categories
            .iter()
            .map(|c| c.as_ref())
            .find(|c| !category_map.contains(c))
        {
            return Err(Error::UnknownCategory {
                source_name: source,
                category: missing.to_owned(),
            });
        }

        self.stats.reset();
        log::info!(
            "[{}] crawling {} categories from {} to {}",
            source,
            categories.len(),
            window.start(),
            window.end(),
        );

        // Scoped to this crawl so a batch deadline does not outlive it.
        let (stop, forward) = self.stop.child();
        let report = self.discover_and_fetch(&source, categories, &window, &stop).await;
        forward.abort();
        let report = report?;

        log::info!(
            "[{}] crawl finished in {}s: {} pages, {} postings discovered, {} with description",
            source,
            self.stats.elapsed_time(),
            self.stats.pages_fetched(),
            self.stats.postings_discovered(),
            report.completed.len(),
        );
        Ok(report)
    }

    async fn discover_and_fetch<S: AsRef<str>>(
        &self,
        source: &str,
        categories: &[S],
        window: &DateWindow,
        stop: &StopHandle,
    ) -> Result<FetchReport> {
        let mut discovered = vec![];
        for category in categories {
            if stop.is_stopped() {
                log::warn!("[{}] stopped during discovery", source);
                break;
            }
            let discovery = discover_category(
                self.parser.as_ref(),
                category.as_ref(),
                window,
                self.config.listing_attempts,
            )
            .await?;
            self.stats.add_pages_fetched(discovery.pages_fetched as u64);
            self.stats.add_postings_discovered(discovery.postings.len() as u64);
            log::info!(
                "[{}] {}: {} postings over {} pages",
                source,
                category.as_ref(),
                discovery.postings.len(),
                discovery.pages_fetched,
            );
            discovered.extend(discovery.postings);
        }

        let fetcher = DescriptionFetcher::new(
            self.config.clone(),
            self.parser.clone(),
            self.stats.clone(),
        );
        Ok(fetcher.fetch_all(discovered, stop).await)
    }
}
