//! DOU job board.
//!
//! The listing is served through an AJAX endpoint that takes an item-count
//! cursor and a CSRF token harvested from the regular listing page. The
//! token is bound to the session cookie, so each category keeps its own
//! session across pages.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use reqwest::header::REFERER;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::Config;
use crate::error::FetchError;
use crate::http::{self, HttpSettings};
use crate::normalize;
use crate::posting::{CategoryMap, JobPosting};
use crate::source::{PageOrdering, SourceParser};
use crate::util;

use super::text_of;

pub const SOURCE: &str = "dou";

const JOBS_URL: &str = "https://jobs.dou.ua/vacancies/";
const SET_LANG_URL: &str = "https://dou.ua/?switch_lang=en";
const DATE_FORMAT: &str = "%d %B %Y";
/// Number of items the AJAX endpoint returns per request.
const PAGE_STRIDE: u32 = 40;

static CATEGORIES: [(&str, &str); 23] = [
    (".NET", ".NET"),
    ("AI/ML", "AI/ML"),
    ("Android", "Android"),
    ("Architect", "Architect"),
    ("Big Data", "Big Data"),
    ("Blockchain", "Blockchain"),
    ("C++", "C%2B%2B"),
    ("Data Engineer", "Data Engineer"),
    ("Data Science", "Data Science"),
    ("DevOps", "DevOps"),
    ("Embedded", "Embedded"),
    ("Flutter", "Flutter"),
    ("Front End", "Front End"),
    ("Golang", "Golang"),
    ("Java", "Java"),
    ("Node.js", "Node.js"),
    ("PHP", "PHP"),
    ("Python", "Python"),
    ("React Native", "React Native"),
    ("Ruby", "Ruby"),
    ("Rust", "Rust"),
    ("Scala", "Scala"),
    ("iOS/macOS", "iOS/macOS"),
];

static ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li.l-vacancy").unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.vt").unwrap());
static COMPANY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.company").unwrap());
static PUBLISHED: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.date").unwrap());
static CSRF_TOKEN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"input[name="csrfmiddlewaretoken"]"#).unwrap());
static VACANCY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.l-vacancy").unwrap());
// Page chrome inside the vacancy block: heading, salary/info bar, share
// buttons, reply form.
static VACANCY_NOISE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["h1.g-h2", "div.sh-info", "div.likely", "div.reply"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

#[derive(Debug, Deserialize)]
struct XhrPage {
    html: String,
    last: bool,
}

struct ListingSession {
    client: Client,
    csrf_token: String,
    referer: String,
}

/// Per-category listing state. A category is either mid-walk (has a
/// session), past its last page (exhausted), or idle.
#[derive(Default)]
struct ListingState {
    sessions: HashMap<String, ListingSession>,
    exhausted: HashSet<String>,
}

impl ListingState {
    fn reset(&mut self, category: &str) {
        self.sessions.remove(category);
        self.exhausted.remove(category);
    }
}

pub struct DouParser {
    http: HttpSettings,
    jobs_url: String,
    set_lang_url: String,
    state: Mutex<ListingState>,
}

impl DouParser {
    pub fn new(config: &Config) -> Self {
        Self::with_urls(config, JOBS_URL, SET_LANG_URL)
    }

    /// Points the parser at alternative endpoints, e.g. a local mirror.
    pub fn with_urls(
        config: &Config,
        jobs_url: impl Into<String>,
        set_lang_url: impl Into<String>,
    ) -> Self {
        Self {
            http: HttpSettings::from(config),
            jobs_url: jobs_url.into(),
            set_lang_url: set_lang_url.into(),
            state: Mutex::new(ListingState::default()),
        }
    }

    async fn open_session(&self, token: &str) -> Result<ListingSession, FetchError> {
        let category_url = format!("{}?category={}", self.jobs_url, token);
        let client = self.http.session()?;

        http::fetch_text(
            &self.set_lang_url,
            client.get(&self.set_lang_url).header(REFERER, &category_url),
        )
        .await?;
        let page = http::fetch_text(
            &category_url,
            client.get(&category_url).header(REFERER, &category_url),
        )
        .await?;

        let csrf_token = {
            let document = Html::parse_document(&page.body);
            document
                .select(&CSRF_TOKEN)
                .next()
                .and_then(|input| input.value().attr("value"))
                .map(|value| value.to_owned())
                .ok_or_else(|| FetchError::markup(&category_url, "csrf token"))?
        };

        Ok(ListingSession {
            client,
            csrf_token,
            referer: category_url,
        })
    }

    fn parse_listing(
        &self,
        html: &str,
        page_url: &str,
        category: &str,
    ) -> Result<Vec<JobPosting>, FetchError> {
        let fragment = Html::parse_fragment(html);
        let mut postings = vec![];
        for item in fragment.select(&ITEM) {
            let title_link = item
                .select(&TITLE)
                .next()
                .ok_or_else(|| FetchError::markup(page_url, "title link"))?;
            let url = title_link
                .value()
                .attr("href")
                .and_then(|href| util::canonical_url(&self.jobs_url, href))
                .ok_or_else(|| FetchError::markup(page_url, "posting url"))?;

            let company = item
                .select(&COMPANY)
                .next()
                .map(|a| trim_quotes(&text_of(a)))
                .ok_or_else(|| FetchError::markup(page_url, "company link"))?;

            let published = item
                .select(&PUBLISHED)
                .next()
                .map(text_of)
                .ok_or_else(|| FetchError::markup(page_url, "publish date"))?;
            let published_at = NaiveDate::parse_from_str(&published, DATE_FORMAT)
                .map_err(|_| FetchError::markup(page_url, format!("date in `{}`", published)))?;

            postings.push(JobPosting {
                category: category.to_owned(),
                company,
                title: trim_quotes(&text_of(title_link)),
                url,
                published_at,
                source: SOURCE.to_owned(),
                description: None,
            });
        }
        Ok(postings)
    }
}

#[async_trait]
impl SourceParser for DouParser {
    fn name(&self) -> String {
        SOURCE.to_owned()
    }

    fn category_map(&self) -> CategoryMap {
        CategoryMap::new(&CATEGORIES)
    }

    fn ordering(&self) -> PageOrdering {
        // Promoted vacancies are pinned to the top regardless of age.
        PageOrdering::Unordered
    }

    async fn fetch_page(&self, category: &str, page: u32) -> Result<Vec<JobPosting>, FetchError> {
        let token = self
            .category_map()
            .token(category)
            .ok_or_else(|| FetchError::UnknownCategory(category.to_owned()))?;

        let mut state = self.state.lock().await;
        if page <= 1 {
            state.reset(category);
        }
        if state.exhausted.contains(category) {
            return Ok(vec![]);
        }
        if !state.sessions.contains_key(category) {
            let session = self.open_session(token).await?;
            state.sessions.insert(category.to_owned(), session);
        }

        let post_url = format!("{}xhr-load/?category={}", self.jobs_url, token);
        let request = {
            let session = match state.sessions.get(category) {
                Some(session) => session,
                None => return Ok(vec![]),
            };
            let count = (page.saturating_sub(1) * PAGE_STRIDE).to_string();
            session
                .client
                .post(&post_url)
                .header(REFERER, &session.referer)
                .form(&[
                    ("csrfmiddlewaretoken", session.csrf_token.as_str()),
                    ("count", count.as_str()),
                ])
        };
        let payload: XhrPage = http::fetch_json(&post_url, request).await?;
        // Only a page that parsed can end the listing; a broken last page
        // has to stay retryable.
        let postings = self.parse_listing(&payload.html, &post_url, category)?;
        if payload.last {
            log::debug!("[{}] {} page {} is the last page", SOURCE, category, page);
            state.sessions.remove(category);
            state.exhausted.insert(category.to_owned());
        }
        Ok(postings)
    }

    async fn release(&self, category: &str) {
        self.state.lock().await.reset(category);
    }

    async fn fetch_description(&self, url: &str) -> Result<String, FetchError> {
        let client = self.http.session()?;
        http::fetch_text(
            &self.set_lang_url,
            client.get(&self.set_lang_url).header(REFERER, url),
        )
        .await?;

        let response = http::fetch_text(url, client.get(url).header(REFERER, url)).await?;
        let html = extract_description(&response.body)
            .ok_or_else(|| FetchError::markup(url, "vacancy block"))?;
        Ok(normalize::normalize(&html))
    }
}

fn trim_quotes(s: &str) -> String {
    s.trim_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '«' | '»'))
        .to_owned()
}

/// HTML of the vacancy block with page chrome detached.
fn extract_description(html: &str) -> Option<String> {
    let mut document = Html::parse_document(html);
    let vacancy_id = document.select(&VACANCY).next()?.id();

    let noise: Vec<_> = {
        let vacancy = document.tree.get(vacancy_id).and_then(ElementRef::wrap)?;
        VACANCY_NOISE
            .iter()
            .filter_map(|selector| vacancy.select(selector).next())
            .map(|element| element.id())
            .collect()
    };
    for id in noise {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    let vacancy = document.tree.get(vacancy_id).and_then(ElementRef::wrap)?;
    Some(vacancy.html())
}
