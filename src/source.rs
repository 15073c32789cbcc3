use async_trait::async_trait;

use crate::error::FetchError;
use crate::posting::{CategoryMap, JobPosting};

/// Order in which a board returns postings across pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageOrdering {
    /// Reverse chronological. Discovery may stop at the first page reaching
    /// past the start of the window.
    NewestFirst,
    /// No usable ordering, e.g. promoted postings pinned at the top.
    /// Discovery walks every page.
    Unordered,
}

/// Job board interface
#[async_trait]
pub trait SourceParser: Send + Sync {
    /// Source tag stamped on every posting from this board.
    fn name(&self) -> String;

    /// Categories this board can be crawled by.
    fn category_map(&self) -> CategoryMap;

    fn ordering(&self) -> PageOrdering {
        PageOrdering::NewestFirst
    }

    /// Fetch one page (1-based) of a category's listing.
    ///
    /// Returns an empty list once the page is past the end of the listing.
    /// Postings come back without a description.
    async fn fetch_page(&self, category: &str, page: u32) -> Result<Vec<JobPosting>, FetchError>;

    /// Fetch a listing page, retrying up to `attempts` times.
    ///
    /// A page that keeps failing is reported as empty, which ends discovery
    /// for the category. The failure is logged so it can be told apart from
    /// a listing that genuinely ran out.
    async fn list_postings_by_category(
        &self,
        category: &str,
        page: u32,
        attempts: u32,
    ) -> Vec<JobPosting> {
        for attempt in 1..=attempts {
            match self.fetch_page(category, page).await {
                Ok(postings) => return postings,
                Err(e) => {
                    log::warn!(
                        "[{}] {} page {} attempt {}/{} failed: {}",
                        self.name(),
                        category,
                        page,
                        attempt,
                        attempts,
                        e,
                    );
                }
            }
        }
        log::error!(
            "[{}] giving up on {} page {}, treating it as the last page",
            self.name(),
            category,
            page,
        );
        vec![]
    }

    /// Called once discovery of `category` is over, whether the listing ran
    /// out or a page was given up on. Boards that keep per-category state
    /// between pages drop it here.
    async fn release(&self, _category: &str) {}

    /// Retrieve the normalized full-text description of a posting.
    async fn fetch_description(&self, url: &str) -> Result<String, FetchError>;
}
