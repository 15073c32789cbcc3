use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::stats::Stats;

use super::stop::StopListener;

/// Periodically logs progress of a description batch of `total` postings.
pub(super) fn start_reporting_thread(
    stats: Arc<Stats>,
    total: usize,
    interval: Duration,
    mut stop: StopListener,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        'run: loop {
            let sleep = tokio::time::sleep(interval);
            tokio::pin!(sleep);

            tokio::select! {
                _ = stop.stopped() => {
                    break 'run;
                }
                _ = &mut sleep => {
                    let fetched = stats.descriptions_fetched();
                    let failed = stats.descriptions_failed();
                    let fpm = stats.fetched_per_minute();
                    log::info!(
                        "{}/{} descriptions fetched at {} postings/minute, {} failed, {} attempts",
                        fetched,
                        total,
                        fpm,
                        failed,
                        stats.fetch_attempts(),
                    );
                }
            }
        }
    })
}
