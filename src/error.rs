use chrono::NaiveDate;

/// A single failed attempt against a job board.
///
/// Every variant means the same thing to callers: this attempt failed and
/// may be retried.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("expected {what} missing from {url}")]
    Markup { url: String, what: String },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("category `{0}` has no listing token")]
    UnknownCategory(String),
}

impl FetchError {
    pub(crate) fn markup(url: &str, what: impl Into<String>) -> Self {
        FetchError::Markup {
            url: url.to_owned(),
            what: what.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed window: start date {start} is after end date {end}")]
    MalformedWindow { start: NaiveDate, end: NaiveDate },
    #[error("source `{source_name}` has no category `{category}`")]
    UnknownCategory {
        source_name: String,
        category: String,
    },
    #[error("invalid config: {0}")]
    Config(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
