mod config;
mod engine;
mod error;
mod http;
mod stats;

pub mod normalize;
pub mod posting;
pub mod source;
pub mod sources;
pub mod util;

// (Re) Exports
pub use config::Config;
pub use engine::{
    DescriptionFetcher, Discovery, FetchOutcome, FetchReport, Harvester, RetryPolicy, StopHandle,
    StopListener, discover_category, fetch_with_retry,
};
pub use error::{Error, FetchError, Result};
pub use http::HttpSettings;
pub use posting::{CategoryMap, DateWindow, JobPosting};
pub use source::{PageOrdering, SourceParser};
pub use stats::Stats;

use std::sync::Arc;

pub fn harvester(parser: Arc<dyn SourceParser>) -> Harvester {
    Harvester::new(Config::default(), parser)
}

pub fn harvester_with_config(config: Config, parser: Arc<dyn SourceParser>) -> Harvester {
    Harvester::new(config, parser)
}
