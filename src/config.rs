use std::time::Duration;

use crate::error::{Error, Result};

pub struct Config {
    /// User agent sent with every request. Some boards reject obvious bots,
    /// so this defaults to a desktop browser string.
    pub user_agent: String,
    /// The maximum number of description fetches in flight at once.
    pub concurrent_requests: u32,
    /// Number of attempts allotted to each posting's description fetch
    /// before the posting is dropped.
    pub retry_budget: u32,
    /// Number of attempts a source makes for a single listing page before
    /// treating it as empty.
    pub listing_attempts: u32,
    /// Timeout (in secs) applied to every individual HTTP request.
    pub request_timeout_secs: u64,
    /// Base delay (in millis) of the exponential backoff between retries.
    /// A value of 0 retries immediately.
    pub retry_backoff_ms: u64,
    /// If set, the description batch stops starting new attempts after this
    /// many seconds and returns whatever has completed.
    pub batch_deadline_secs: Option<u64>,
    /// Interval (in secs) between progress reports while fetching
    /// descriptions.
    pub report_interval_secs: u64,
}

impl Config {
    pub fn sanity_check(&self) -> Result<()> {
        if self.concurrent_requests == 0 {
            return Err(Error::Config("concurrent_requests cannot be zero".to_owned()));
        }
        if self.retry_budget == 0 {
            return Err(Error::Config("retry_budget cannot be zero".to_owned()));
        }
        if self.listing_attempts == 0 {
            return Err(Error::Config("listing_attempts cannot be zero".to_owned()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs cannot be zero".to_owned()));
        }
        if self.report_interval_secs == 0 {
            return Err(Error::Config("report_interval_secs cannot be zero".to_owned()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:101.0) Gecko/20100101 Firefox/101.0".to_owned(),
            concurrent_requests: 8,
            retry_budget: 3,
            listing_attempts: 3,
            request_timeout_secs: 30,
            retry_backoff_ms: 500,
            batch_deadline_secs: None,
            report_interval_secs: 60,
        }
    }
}
