use std::sync::Arc;

use scraper::ElementRef;

use crate::Config;
use crate::source::SourceParser;

pub mod djinni;
pub mod dou;

pub use djinni::DjinniParser;
pub use dou::DouParser;

/// Looks up a board adapter by its source tag.
pub fn by_name(name: &str, config: &Config) -> Option<Arc<dyn SourceParser>> {
    match name {
        djinni::SOURCE => Some(Arc::new(DjinniParser::new(config))),
        dou::SOURCE => Some(Arc::new(DouParser::new(config))),
        _ => None,
    }
}

/// Concatenated, trimmed text of an element.
pub(crate) fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_owned()
}
