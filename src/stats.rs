use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{NaiveDateTime, Utc};

/// Counters for a single crawl run.
pub struct Stats {
    pages_fetched: AtomicU64,
    postings_discovered: AtomicU64,
    fetch_attempts: AtomicU64,
    descriptions_fetched: AtomicU64,
    descriptions_failed: AtomicU64,
    start_time: Mutex<NaiveDateTime>,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            pages_fetched: AtomicU64::new(0),
            postings_discovered: AtomicU64::new(0),
            fetch_attempts: AtomicU64::new(0),
            descriptions_fetched: AtomicU64::new(0),
            descriptions_failed: AtomicU64::new(0),
            start_time: Mutex::new(Utc::now().naive_utc()),
        }
    }

    pub fn reset(&self) {
        let mut start_time = self.start_time.lock().unwrap_or_else(|e| e.into_inner());
        self.pages_fetched.store(0, Ordering::Relaxed);
        self.postings_discovered.store(0, Ordering::Relaxed);
        self.fetch_attempts.store(0, Ordering::Relaxed);
        self.descriptions_fetched.store(0, Ordering::Relaxed);
        self.descriptions_failed.store(0, Ordering::Relaxed);
        *start_time = Utc::now().naive_utc();
    }

    pub fn add_pages_fetched(&self, value: u64) {
        self.pages_fetched.fetch_add(value, Ordering::Relaxed);
    }

    pub fn add_postings_discovered(&self, value: u64) {
        self.postings_discovered.fetch_add(value, Ordering::Relaxed);
    }

    pub fn incr_fetch_attempts(&self) {
        self.fetch_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_descriptions_fetched(&self) {
        self.descriptions_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_descriptions_failed(&self) {
        self.descriptions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched.load(Ordering::Relaxed)
    }

    pub fn postings_discovered(&self) -> u64 {
        self.postings_discovered.load(Ordering::Relaxed)
    }

    pub fn fetch_attempts(&self) -> u64 {
        self.fetch_attempts.load(Ordering::Relaxed)
    }

    pub fn descriptions_fetched(&self) -> u64 {
        self.descriptions_fetched.load(Ordering::Relaxed)
    }

    pub fn descriptions_failed(&self) -> u64 {
        self.descriptions_failed.load(Ordering::Relaxed)
    }

    pub fn fetched_per_minute(&self) -> u64 {
        let fetched = self.descriptions_fetched();
        let elapsed = (self.elapsed_time() / 60) as u64;
        if elapsed > 0 {
            fetched / elapsed
        } else {
            0
        }
    }

    /// Elapsed time for this crawl run in seconds
    pub fn elapsed_time(&self) -> i64 {
        let start_time = self.start_time.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now().naive_utc();
        let elapsed = now - *start_time;
        elapsed.num_seconds()
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
