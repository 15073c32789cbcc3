use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::Config;
use crate::error::FetchError;

/// Connection settings shared by every session a source opens.
#[derive(Clone, Debug)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout: Duration,
}

impl From<&Config> for HttpSettings {
    fn from(config: &Config) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.request_timeout(),
        }
    }
}

impl HttpSettings {
    /// Builds a fresh client with its own cookie jar.
    ///
    /// Locale selection on the boards is stored in a session cookie, so a
    /// session lives exactly as long as the operation that opened it.
    pub fn session(&self) -> Result<Client, FetchError> {
        Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .cookie_store(true)
            .build()
            .map_err(FetchError::Client)
    }
}

/// A successfully downloaded page.
#[derive(Debug)]
pub struct Page {
    /// Final url after redirects.
    pub url: String,
    pub body: String,
}

/// Sends `request` and returns the body, failing on transport errors and
/// non-2xx statuses.
pub async fn fetch_text(url: &str, request: RequestBuilder) -> Result<Page, FetchError> {
    let response = request.send().await.map_err(|source| FetchError::Request {
        url: url.to_owned(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_owned(),
            status,
        });
    }

    let final_url = response.url().to_string();
    let body = response.text().await.map_err(|source| FetchError::Request {
        url: url.to_owned(),
        source,
    })?;
    Ok(Page {
        url: final_url,
        body,
    })
}

/// Like [`fetch_text`] but decodes the body as JSON.
pub async fn fetch_json<T: DeserializeOwned>(
    url: &str,
    request: RequestBuilder,
) -> Result<T, FetchError> {
    let page = fetch_text(url, request).await?;
    serde_json::from_str(&page.body)
        .map_err(|e| FetchError::markup(url, format!("JSON payload ({})", e)))
}
