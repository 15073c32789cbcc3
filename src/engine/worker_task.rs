use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::posting::JobPosting;
use crate::source::SourceParser;
use crate::stats::Stats;

use super::stop::StopListener;

/// Upper bound on a single backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Result of fetching one posting's description.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Description populated.
    Fetched(JobPosting),
    /// Every attempt failed.
    Exhausted(JobPosting),
    /// The crawl was stopped before an attempt succeeded.
    Cancelled(JobPosting),
}

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub budget: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (1-based): exponential in
    /// the attempt number with up to one base interval of jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if self.backoff_ms == 0 {
            return Duration::ZERO;
        }
        let exp = self.backoff_ms.saturating_mul(1 << attempt.saturating_sub(1).min(16));
        let jitter = rand::thread_rng().gen_range(0..self.backoff_ms);
        Duration::from_millis(exp.saturating_add(jitter)).min(MAX_BACKOFF)
    }
}

pub(super) type JobQueue = Arc<Mutex<VecDeque<JobPosting>>>;

pub(super) fn pop_job(queue: &JobQueue) -> Option<JobPosting> {
    let mut queue = queue.lock().unwrap_or_else(|e| e.into_inner());
    queue.pop_front()
}

/// Posting each worker is currently working on, by worker id.
pub(super) type InFlight = Arc<Mutex<HashMap<u32, JobPosting>>>;

pub(super) fn take_in_flight(in_flight: &InFlight, worker_id: u32) -> Option<JobPosting> {
    let mut in_flight = in_flight.lock().unwrap_or_else(|e| e.into_inner());
    in_flight.remove(&worker_id)
}

pub(super) struct WorkerContext {
    pub parser: Arc<dyn SourceParser>,
    pub policy: RetryPolicy,
    pub stats: Arc<Stats>,
    pub queue: JobQueue,
    pub in_flight: InFlight,
    pub outcome_tx: mpsc::UnboundedSender<FetchOutcome>,
}

/// Fetch a description, retrying up to the policy's budget.
///
/// Failed attempts are logged and never abort the caller. Stopping the
/// crawl abandons the in-flight attempt.
pub async fn fetch_with_retry(
    parser: &dyn SourceParser,
    posting: JobPosting,
    policy: &RetryPolicy,
    stats: &Stats,
    stop: &mut StopListener,
) -> FetchOutcome {
    let url = posting.url.clone();
    for attempt in 1..=policy.budget {
        if stop.is_stopped() {
            return FetchOutcome::Cancelled(posting);
        }

        stats.incr_fetch_attempts();
        let result = tokio::select! {
            result = parser.fetch_description(&url) => Some(result),
            _ = stop.stopped() => None,
        };
        match result {
            None => return FetchOutcome::Cancelled(posting),
            Some(Ok(description)) => {
                let description = description.trim();
                if !description.is_empty() {
                    return FetchOutcome::Fetched(posting.with_description(description.to_owned()));
                }
                log::warn!("{} attempt {}/{}: empty description", url, attempt, policy.budget);
            }
            Some(Err(e)) => {
                log::warn!("{} attempt {}/{}: {}", url, attempt, policy.budget, e);
            }
        }

        if attempt < policy.budget {
            let delay = policy.backoff(attempt);
            if !delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = stop.stopped() => return FetchOutcome::Cancelled(posting),
                }
            }
        }
    }

    log::error!("{} dropped after {} failed attempts", url, policy.budget);
    FetchOutcome::Exhausted(posting)
}

pub(super) fn start_worker_thread(
    worker_id: u32,
    ctx: Arc<WorkerContext>,
    mut stop: StopListener,
) -> JoinHandle<()> {
    log::debug!("[worker-{}] start", worker_id);
    tokio::spawn(async move {
        'run: loop {
            if stop.is_stopped() {
                break 'run;
            }

            let posting = match pop_job(&ctx.queue) {
                Some(posting) => posting,
                None => break 'run,
            };
            log::info!("[worker-{}] {}", worker_id, &posting.url);
            ctx.in_flight
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(worker_id, posting.clone());

            let outcome = fetch_with_retry(
                ctx.parser.as_ref(),
                posting,
                &ctx.policy,
                &ctx.stats,
                &mut stop,
            )
            .await;
            take_in_flight(&ctx.in_flight, worker_id);
            match &outcome {
                FetchOutcome::Fetched(_) => ctx.stats.incr_descriptions_fetched(),
                FetchOutcome::Exhausted(_) => ctx.stats.incr_descriptions_failed(),
                FetchOutcome::Cancelled(_) => {}
            }

            // The coordinator only goes away once every worker has exited.
            if ctx.outcome_tx.send(outcome).is_err() {
                break 'run;
            }
        }
        log::debug!("[worker-{}] exit", worker_id);
    })
}
