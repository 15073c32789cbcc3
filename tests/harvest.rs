use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use jobharvest::{
    CategoryMap, Config, Error, FetchError, Harvester, JobPosting, SourceParser,
};

static CATEGORIES: [(&str, &str); 2] = [("rust", "Rust"), ("python", "Python")];

/// In-memory board: newest-first pages per category, with selected
/// description urls that always fail or never answer.
struct FakeBoard {
    pages: HashMap<&'static str, Vec<Vec<&'static str>>>,
    broken: Vec<String>,
    hanging: Vec<String>,
    page_requests: Mutex<u32>,
    description_attempts: Mutex<HashMap<String, u32>>,
}

impl FakeBoard {
    fn new() -> Self {
        let mut pages = HashMap::new();
        pages.insert(
            "rust",
            vec![
                vec!["2024-05-05", "2024-05-03", "2024-05-03"],
                vec!["2024-05-02", "2024-05-01", "2024-04-30"],
                vec!["2024-04-29"],
            ],
        );
        pages.insert("python", vec![vec!["2024-05-03", "2024-05-02", "2024-04-29"]]);
        Self {
            pages,
            broken: vec![],
            hanging: vec![],
            page_requests: Mutex::new(0),
            description_attempts: Mutex::new(HashMap::new()),
        }
    }

    fn url(category: &str, page: u32, idx: usize) -> String {
        format!("https://board.test/{}/{}/{}", category, page, idx)
    }
}

#[async_trait]
impl SourceParser for FakeBoard {
    fn name(&self) -> String {
        "fake".to_owned()
    }

    fn category_map(&self) -> CategoryMap {
        CategoryMap::new(&CATEGORIES)
    }

    async fn fetch_page(&self, category: &str, page: u32) -> Result<Vec<JobPosting>, FetchError> {
        *self.page_requests.lock().unwrap() += 1;
        let dates = self
            .pages
            .get(category)
            .and_then(|pages| pages.get(page as usize - 1))
            .cloned()
            .unwrap_or_default();
        Ok(dates
            .into_iter()
            .enumerate()
            .map(|(idx, d)| JobPosting {
                category: category.to_owned(),
                company: "Acme".to_owned(),
                title: format!("{} engineer", category),
                url: FakeBoard::url(category, page, idx),
                published_at: NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(),
                source: "fake".to_owned(),
                description: None,
            })
            .collect())
    }

    async fn fetch_description(&self, url: &str) -> Result<String, FetchError> {
        *self
            .description_attempts
            .lock()
            .unwrap()
            .entry(url.to_owned())
            .or_insert(0) += 1;
        if self.broken.iter().any(|b| b == url) {
            return Err(FetchError::Markup {
                url: url.to_owned(),
                what: "description".to_owned(),
            });
        }
        if self.hanging.iter().any(|h| h == url) {
            std::future::pending::<()>().await;
        }
        Ok(jobharvest::normalize::normalize(&format!(
            "<h2>About</h2><p>Posting at <a href=\"{0}\">{0}</a></p>",
            url
        )))
    }
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn config() -> Config {
    Config {
        concurrent_requests: 3,
        retry_backoff_ms: 0,
        ..Config::default()
    }
}

#[tokio::test]
async fn crawl_returns_in_window_postings_with_descriptions() {
    let board = Arc::new(FakeBoard::new());
    let harvester = Harvester::new(config(), board.clone());

    let postings = harvester
        .run_crawl(date("2024-05-01"), date("2024-05-03"))
        .await
        .unwrap();

    // rust: 05-03 x2 from page 1, 05-02 and 05-01 from page 2; python: 05-03, 05-02.
    assert_eq!(postings.len(), 6);
    for p in &postings {
        assert!(date("2024-05-01") <= p.published_at && p.published_at <= date("2024-05-03"));
        let description = p.description.as_deref().unwrap();
        assert!(!description.is_empty());
        assert_eq!(description, description.trim());
        assert!(description.starts_with("About"));
    }
    // Two rust pages and one python page.
    assert_eq!(*board.page_requests.lock().unwrap(), 3);
    assert_eq!(harvester.stats().pages_fetched(), 3);
    assert_eq!(harvester.stats().postings_discovered(), 6);
}

#[tokio::test]
async fn single_category_scenario() {
    let board = Arc::new(FakeBoard::new());
    let harvester = Harvester::new(config(), board.clone());

    let postings = harvester
        .run_crawl_categories(&["python"], date("2024-05-01"), date("2024-05-03"))
        .await
        .unwrap();

    let mut dates: Vec<_> = postings.iter().map(|p| p.published_at).collect();
    dates.sort();
    assert_eq!(dates, vec![date("2024-05-02"), date("2024-05-03")]);
    assert_eq!(*board.page_requests.lock().unwrap(), 1);
}

#[tokio::test]
async fn broken_descriptions_are_dropped_without_failing_the_batch() {
    let mut board = FakeBoard::new();
    let broken = FakeBoard::url("python", 1, 0);
    board.broken.push(broken.clone());
    let board = Arc::new(board);
    let harvester = Harvester::new(config(), board.clone());

    let report = harvester
        .crawl(&["python"], date("2024-05-01"), date("2024-05-03"))
        .await
        .unwrap();

    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.completed[0].url, FakeBoard::url("python", 1, 1));
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].url, broken);
    assert_eq!(report.failed[0].description, None);
    assert_eq!(board.description_attempts.lock().unwrap()[&broken], 3);
}

#[tokio::test]
async fn inverted_window_is_rejected_before_any_request() {
    let board = Arc::new(FakeBoard::new());
    let harvester = Harvester::new(config(), board.clone());

    let result = harvester.run_crawl(date("2024-05-03"), date("2024-05-01")).await;

    assert!(matches!(result, Err(Error::MalformedWindow { .. })));
    assert_eq!(*board.page_requests.lock().unwrap(), 0);
}

#[tokio::test]
async fn unknown_category_is_rejected_before_any_request() {
    let board = Arc::new(FakeBoard::new());
    let harvester = Harvester::new(config(), board.clone());

    let result = harvester
        .run_crawl_categories(&["rust", "cobol"], date("2024-05-01"), date("2024-05-03"))
        .await;

    match result {
        Err(Error::UnknownCategory { category, .. }) => assert_eq!(category, "cobol"),
        other => panic!("unexpected result: {:?}", other.map(|p| p.len())),
    }
    assert_eq!(*board.page_requests.lock().unwrap(), 0);
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let board = Arc::new(FakeBoard::new());
    let harvester = Harvester::new(
        Config {
            retry_budget: 0,
            ..config()
        },
        board,
    );

    let result = harvester.run_crawl(date("2024-05-01"), date("2024-05-03")).await;
    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn stopped_harvester_returns_nothing() {
    let board = Arc::new(FakeBoard::new());
    let harvester = Harvester::new(config(), board.clone());
    harvester.stop_handle().stop();

    let postings = harvester
        .run_crawl(date("2024-05-01"), date("2024-05-03"))
        .await
        .unwrap();

    assert!(postings.is_empty());
    assert!(board.description_attempts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn batch_deadline_only_ends_the_crawl_that_hit_it() {
    let mut board = FakeBoard::new();
    let hanging = FakeBoard::url("python", 1, 0);
    board.hanging.push(hanging.clone());
    let board = Arc::new(board);
    let harvester = Harvester::new(
        Config {
            batch_deadline_secs: Some(1),
            ..config()
        },
        board.clone(),
    );

    let first = harvester
        .crawl(&["python"], date("2024-05-01"), date("2024-05-03"))
        .await
        .unwrap();
    assert_eq!(first.completed.len(), 1);
    assert_eq!(first.cancelled.len(), 1);
    assert_eq!(first.cancelled[0].url, hanging);
    assert!(!harvester.stop_handle().is_stopped());

    let second = harvester
        .crawl(&["python"], date("2024-05-01"), date("2024-05-03"))
        .await
        .unwrap();
    assert_eq!(*board.page_requests.lock().unwrap(), 2);
    assert_eq!(second.completed.len(), 1);
    assert_eq!(second.completed[0].url, FakeBoard::url("python", 1, 1));
    assert_eq!(second.cancelled.len(), 1);
}
