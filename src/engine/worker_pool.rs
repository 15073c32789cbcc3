use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::Config;
use crate::posting::JobPosting;
use crate::source::SourceParser;
use crate::stats::Stats;

use super::reporting_task::start_reporting_thread;
use super::stop::StopHandle;
use super::worker_task::{
    FetchOutcome, RetryPolicy, WorkerContext, pop_job, start_worker_thread, take_in_flight,
};

/// Postings sorted by how their description fetch ended.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Postings with a populated description.
    pub completed: Vec<JobPosting>,
    /// Postings that used up their retry budget, or whose worker panicked.
    pub failed: Vec<JobPosting>,
    /// Postings not finished before the crawl was stopped.
    pub cancelled: Vec<JobPosting>,
}

/// Fetches descriptions for a batch of postings on a bounded pool of
/// workers.
///
/// Workers pull postings from a shared queue and send each outcome back
/// over a channel; the final sets are only assembled once every worker
/// has exited.
pub struct DescriptionFetcher {
    config: Arc<Config>,
    parser: Arc<dyn SourceParser>,
    stats: Arc<Stats>,
}

impl DescriptionFetcher {
    pub fn new(config: Arc<Config>, parser: Arc<dyn SourceParser>, stats: Arc<Stats>) -> Self {
        Self {
            config,
            parser,
            stats,
        }
    }

    pub async fn fetch_all(&self, postings: Vec<JobPosting>, stop: &StopHandle) -> FetchReport {
        let total = postings.len();
        if total == 0 {
            return FetchReport::default();
        }

        let queue = Arc::new(Mutex::new(VecDeque::from(postings)));
        let in_flight = Arc::new(Mutex::new(HashMap::new()));
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<FetchOutcome>();
        let ctx = Arc::new(WorkerContext {
            parser: self.parser.clone(),
            policy: RetryPolicy {
                budget: self.config.retry_budget,
                backoff_ms: self.config.retry_backoff_ms,
            },
            stats: self.stats.clone(),
            queue: queue.clone(),
            in_flight: in_flight.clone(),
            outcome_tx,
        });

        let reporter = start_reporting_thread(
            self.stats.clone(),
            total,
            Duration::from_secs(self.config.report_interval_secs),
            stop.subscribe(),
        );
        let deadline = self
            .config
            .batch_deadline_secs
            .map(|secs| start_deadline_thread(Duration::from_secs(secs), stop.clone()));

        let num_workers = (self.config.concurrent_requests as usize).min(total);
        log::debug!("fetching {} descriptions with {} workers", total, num_workers);
        let mut handles = vec![];
        for i in 0..num_workers {
            handles.push(start_worker_thread((i + 1) as u32, ctx.clone(), stop.subscribe()));
        }
        // Workers hold the only remaining senders; the channel closes when
        // the last one exits.
        drop(ctx);

        let mut report = FetchReport::default();
        while let Some(outcome) = outcome_rx.recv().await {
            match outcome {
                FetchOutcome::Fetched(posting) => report.completed.push(posting),
                FetchOutcome::Exhausted(posting) => report.failed.push(posting),
                FetchOutcome::Cancelled(posting) => report.cancelled.push(posting),
            }
        }

        for (idx, handle) in handles.into_iter().enumerate() {
            let worker_id = (idx + 1) as u32;
            if let Err(e) = handle.await {
                log::error!("[worker-{}] {}", worker_id, e);
                if let Some(posting) = take_in_flight(&in_flight, worker_id) {
                    self.stats.incr_descriptions_failed();
                    report.failed.push(posting);
                }
            }
        }

        // Left behind when workers stopped early.
        while let Some(posting) = pop_job(&queue) {
            report.cancelled.push(posting);
        }

        reporter.abort();
        if let Some(h) = deadline {
            h.abort();
        }

        log::info!(
            "description batch done: {} fetched, {} failed, {} cancelled",
            report.completed.len(),
            report.failed.len(),
            report.cancelled.len(),
        );
        report
    }
}

fn start_deadline_thread(deadline: Duration, stop: StopHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(deadline).await;
        log::warn!("batch deadline of {:?} reached, stopping", deadline);
        stop.stop();
    })
}
