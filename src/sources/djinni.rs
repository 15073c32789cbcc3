//! Djinni job board.
//!
//! Listing pages are numbered. Asking for a page past the end redirects to
//! the bare listing url, which is how exhaustion is detected.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use scraper::{ElementRef, Html, Node, Selector};

use crate::Config;
use crate::error::FetchError;
use crate::http::{self, HttpSettings};
use crate::normalize;
use crate::posting::{CategoryMap, JobPosting};
use crate::source::SourceParser;
use crate::util;

use super::text_of;

pub const SOURCE: &str = "djinni";

const JOBS_URL: &str = "https://djinni.co/jobs/";
const SET_LANG_URL: &str = "https://djinni.co/set_lang?code=en&next=/";
const DATE_FORMAT: &str = "%H:%M %d.%m.%Y";
const DESCRIPTION_BLOCKS: usize = 2;

static CATEGORIES: [(&str, &str); 7] = [
    ("ai/ml", "ML+AI"),
    ("data engineering", "Data+Engineer"),
    ("data science", "Data+Science"),
    ("java", "Java"),
    ("node.js", "Node.js"),
    ("python", "Python"),
    ("scala", "Scala"),
];

static ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.list-jobs__item.job-list__item").unwrap());
static COMPANY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("header a.mr-2").unwrap());
static PUBLISHED: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span.mr-2.nobr").unwrap());
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.h3.job-list-item__link").unwrap());
static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.mb-4").unwrap());

pub struct DjinniParser {
    http: HttpSettings,
    jobs_url: String,
    set_lang_url: String,
}

impl DjinniParser {
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
        }
    }

    fn page_url(&self, token: &str, page: u32) -> String {
        format!(
            "{}?primary_keyword={}&region=UKR&page={}",
            self.jobs_url, token, page
        )
    }

    fn parse_listing(
        &self,
        html: &str,
        page_url: &str,
        category: &str,
    ) -> Result<Vec<JobPosting>, FetchError> {
        let document = Html::parse_document(html);
        let mut postings = vec![];
        for item in document.select(&ITEM) {
            let company = item
                .select(&COMPANY)
                .next()
                .map(text_of)
                .ok_or_else(|| FetchError::markup(page_url, "company link"))?;

            let published = item
                .select(&PUBLISHED)
                .next()
                .and_then(|span| span.value().attr("title"))
                .ok_or_else(|| FetchError::markup(page_url, "publish date"))?;
            let published_at = NaiveDateTime::parse_from_str(published, DATE_FORMAT)
                .map_err(|_| FetchError::markup(page_url, format!("date in `{}`", published)))?
                .date();

            let title_link = item
                .select(&TITLE)
                .next()
                .ok_or_else(|| FetchError::markup(page_url, "title link"))?;
            let url = title_link
                .value()
                .attr("href")
                .and_then(|href| util::canonical_url(&self.jobs_url, href))
                .ok_or_else(|| FetchError::markup(page_url, "posting url"))?;

            postings.push(JobPosting {
                category: category.to_owned(),
                company,
                title: text_of(title_link),
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
impl SourceParser for DjinniParser {
    fn name(&self) -> String {
        SOURCE.to_owned()
    }

    fn category_map(&self) -> CategoryMap {
        CategoryMap::new(&CATEGORIES)
    }

    async fn fetch_page(&self, category: &str, page: u32) -> Result<Vec<JobPosting>, FetchError> {
        let token = self
            .category_map()
            .token(category)
            .ok_or_else(|| FetchError::UnknownCategory(category.to_owned()))?;
        let url = self.page_url(token, page);

        let session = self.http.session()?;
        let response = http::fetch_text(&url, session.get(&url)).await?;
        if util::same_url(&response.url, &self.jobs_url) {
            log::debug!("[{}] {} page {} redirected to listing root", SOURCE, category, page);
            return Ok(vec![]);
        }

        self.parse_listing(&response.body, &url, category)
    }

    async fn fetch_description(&self, url: &str) -> Result<String, FetchError> {
        let session = self.http.session()?;
        http::fetch_text(&self.set_lang_url, session.get(&self.set_lang_url)).await?;

        let response = http::fetch_text(url, session.get(url)).await?;
        let text = extract_description(&response.body)
            .ok_or_else(|| FetchError::markup(url, "description blocks"))?;
        Ok(normalize::normalize_text(&text))
    }
}

fn extract_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let blocks: Vec<String> = document
        .select(&DESCRIPTION)
        .take(DESCRIPTION_BLOCKS)
        .map(text_with_breaks)
        .collect();
    if blocks.is_empty() {
        return None;
    }
    Some(blocks.join("\n\n"))
}

/// Element text with `<br>` rendered as a newline.
fn text_with_breaks(element: ElementRef) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) if e.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use mockito::Matcher;

    use super::*;

    const LISTING: &str = r#"<html><body><ul>
        <li class="list-jobs__item job-list__item">
          <header><a class="mr-2" href="/companies/acme">  Acme  </a></header>
          <span class="mr-2 nobr" title="14:30 03.05.2024">today</span>
          <a class="h3 job-list-item__link" href="/jobs/101-senior-rust-engineer/"> Senior Rust Engineer </a>
        </li>
        <li class="list-jobs__item job-list__item">
          <header><a class="mr-2" href="/companies/globex">Globex</a></header>
          <span class="mr-2 nobr" title="09:05 29.04.2024">last week</span>
          <a class="h3 job-list-item__link" href="/jobs/102-data-engineer/">Data Engineer</a>
        </li>
    </ul></body></html>"#;

    const POSTING: &str = r#"<html><body>
        <div class="mb-4">We build things.<br>Remote only.<br/>Kyiv office optional.</div>
        <div class="mb-4"><p>  Requirements:   Rust\-lang </p></div>
        <div class="mb-4">Similar jobs</div>
    </body></html>"#;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn parser(server: &mockito::Server) -> DjinniParser {
        DjinniParser::with_urls(
            &Config::default(),
            format!("{}/jobs/", server.url()),
            format!("{}/set_lang?code=en&next=/", server.url()),
        )
    }

    #[tokio::test]
    async fn parses_listing_page() {
        let mut server = mockito::Server::new_async().await;
        let _page = server
            .mock("GET", "/jobs/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("primary_keyword".into(), "Python".into()),
                Matcher::UrlEncoded("region".into(), "UKR".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(LISTING)
            .create_async()
            .await;

        let parser = parser(&server);
        let postings = parser.fetch_page("python", 1).await.unwrap();

        assert_eq!(postings.len(), 2);
        let first = &postings[0];
        assert_eq!(first.company, "Acme");
        assert_eq!(first.title, "Senior Rust Engineer");
        assert_eq!(first.url, format!("{}/jobs/101-senior-rust-engineer/", server.url()));
        assert_eq!(first.published_at, date("2024-05-03"));
        assert_eq!(first.category, "python");
        assert_eq!(first.source, "djinni");
        assert_eq!(first.description, None);
        assert_eq!(postings[1].published_at, date("2024-04-29"));
    }

    #[tokio::test]
    async fn redirect_to_listing_root_means_no_more_pages() {
        let mut server = mockito::Server::new_async().await;
        let _page = server
            .mock("GET", "/jobs/")
            .match_query(Matcher::UrlEncoded("page".into(), "7".into()))
            .with_status(302)
            .with_header("location", "/jobs/")
            .create_async()
            .await;
        let _root = server
            .mock("GET", "/jobs/")
            .with_status(200)
            .with_body(LISTING)
            .create_async()
            .await;

        let parser = parser(&server);
        let postings = parser.fetch_page("python", 7).await.unwrap();
        assert!(postings.is_empty());
    }

    #[tokio::test]
    async fn server_error_is_a_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        let _page = server
            .mock("GET", "/jobs/")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let parser = parser(&server);
        assert!(parser.fetch_page("java", 1).await.is_err());
        assert!(parser.list_postings_by_category("java", 1, 2).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_category_fails_without_request() {
        let server = mockito::Server::new_async().await;
        let parser = parser(&server);
        let result = parser.fetch_page("cobol", 1).await;
        assert!(matches!(result, Err(FetchError::UnknownCategory(_))));
    }

    #[tokio::test]
    async fn description_sets_language_then_joins_first_two_blocks() {
        let mut server = mockito::Server::new_async().await;
        let set_lang = server
            .mock("GET", "/set_lang")
            .match_query(Matcher::UrlEncoded("code".into(), "en".into()))
            .with_status(302)
            .with_header("set-cookie", "lang=en; Path=/")
            .with_header("location", "/")
            .expect(1)
            .create_async()
            .await;
        let _home = server
            .mock("GET", "/")
            .with_status(200)
            .create_async()
            .await;
        let _posting = server
            .mock("GET", "/jobs/101-senior-rust-engineer/")
            .with_status(200)
            .with_body(POSTING)
            .create_async()
            .await;

        let parser = parser(&server);
        let url = format!("{}/jobs/101-senior-rust-engineer/", server.url());
        let description = parser.fetch_description(&url).await.unwrap();

        assert_eq!(
            description,
            "We build things.\nRemote only.\nKyiv office optional.\n\nRequirements: Rust-lang"
        );
        set_lang.assert_async().await;
    }

    #[tokio::test]
    async fn missing_description_markup_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _set_lang = server
            .mock("GET", "/set_lang")
            .match_query(Matcher::Any)
            .with_status(200)
            .create_async()
            .await;
        let _posting = server
            .mock("GET", "/jobs/9/")
            .with_status(200)
            .with_body("<html><body><p>gone</p></body></html>")
            .create_async()
            .await;

        let parser = parser(&server);
        let url = format!("{}/jobs/9/", server.url());
        let result = parser.fetch_description(&url).await;
        assert!(matches!(result, Err(FetchError::Markup { .. })));
    }
}
