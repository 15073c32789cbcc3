use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One job advertisement.
///
/// Discovery creates postings without a description; the fetch stage either
/// fills it in or drops the posting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub category: String,
    pub company: String,
    pub title: String,
    /// Canonical absolute URL of the posting page.
    pub url: String,
    pub published_at: NaiveDate,
    /// Tag of the board the posting came from, e.g. `djinni`.
    pub source: String,
    pub description: Option<String>,
}

impl JobPosting {
    pub fn with_description(self, description: String) -> Self {
        Self {
            description: Some(description),
            ..self
        }
    }
}

/// Inclusive calendar-date range a crawl is scoped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::MalformedWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Static mapping from a human-readable category name to the token a board
/// expects in its listing URL.
#[derive(Clone, Copy, Debug)]
pub struct CategoryMap {
    entries: &'static [(&'static str, &'static str)],
}

impl CategoryMap {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    pub fn token(&self, category: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(name, _)| *name == category)
            .map(|(_, token)| *token)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.token(category).is_some()
    }

    pub fn categories(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
