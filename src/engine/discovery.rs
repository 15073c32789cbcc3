use crate::error::{Error, Result};
use crate::posting::{DateWindow, JobPosting};
use crate::source::{PageOrdering, SourceParser};

/// In-window postings of one category.
#[derive(Debug, Default)]
pub struct Discovery {
    pub postings: Vec<JobPosting>,
    pub pages_fetched: u32,
}

/// Walk a category's listing and collect the postings published inside
/// `window`.
///
/// Pages are requested one at a time. For newest-first sources the walk
/// ends at the first page whose earliest posting predates the window;
/// otherwise it runs until the source returns an empty page. Every page is
/// filtered by the window, so postings newer than the end date are skipped
/// wherever they appear.
pub async fn discover_category(
    parser: &dyn SourceParser,
    category: &str,
    window: &DateWindow,
    listing_attempts: u32,
) -> Result<Discovery> {
    if !parser.category_map().contains(category) {
        return Err(Error::UnknownCategory {
            source_name: parser.name(),
            category: category.to_owned(),
        });
    }

    let stop_early = parser.ordering() == PageOrdering::NewestFirst;
    let mut discovery = Discovery::default();
    let mut page = 1;
    loop {
        let postings = parser
            .list_postings_by_category(category, page, listing_attempts)
            .await;
        discovery.pages_fetched += 1;

        let earliest = match postings.iter().map(|p| p.published_at).min() {
            Some(date) => date,
            None => break,
        };
        let last_page = stop_early && earliest < window.start();

        discovery.postings.extend(
            postings
                .into_iter()
                .filter(|p| window.contains(p.published_at)),
        );

        if last_page {
            break;
        }
        page += 1;
    }
    parser.release(category).await;

    log::debug!(
        "[{}] {}: {} postings in window after {} pages",
        parser.name(),
        category,
        discovery.postings.len(),
        discovery.pages_fetched,
    );
    Ok(discovery)
}
