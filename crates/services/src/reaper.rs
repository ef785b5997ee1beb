//! Stale-job reaper (`spec.md` §5): a process restart discards queued jobs
//! but leaves `processing` rows orphaned, since nothing is left running the
//! runner that owned them. Periodically sweeps `processing` rows whose
//! per-quality timeout has elapsed and reclaims them as `timed-out`.

use chrono::Utc;
use database::JobRepository;
use domain::job::{JobStatus, Quality};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long a `processing` row may sit with no activity before the reaper
/// considers the owning process dead, mirroring the poll ceiling a live
/// runner would itself give up at (`spec.md` §4.8 step 4).
fn stale_timeout(quality: Quality) -> chrono::Duration {
    let seconds = quality.poll_interval_ms() * quality.max_poll_attempts() as u64 / 1000;
    chrono::Duration::seconds(seconds as i64)
}

pub struct Reaper {
    jobs: Arc<JobRepository>,
    sweep_interval: Duration,
}

impl Reaper {
    pub fn new(jobs: Arc<JobRepository>, sweep_interval: Duration) -> Self {
        Self { jobs, sweep_interval }
    }

    /// Runs until `cancel` fires, sweeping once per `sweep_interval`.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.sweep_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("reaper shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    let reclaimed = self.sweep_once().await;
                    if reclaimed > 0 {
                        info!(reclaimed, "reaper reclaimed orphaned processing jobs");
                    }
                }
            }
        }
    }

    /// One sweep pass. Fetches every `processing` row older than the most
    /// lenient per-quality timeout, then re-checks each against its own
    /// quality's timeout before reclaiming it.
    pub async fn sweep_once(&self) -> usize {
        let most_lenient = stale_timeout(Quality::High);
        let candidates = match self.jobs.list_stale_processing(Utc::now() - most_lenient).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "reaper failed to list stale processing jobs");
                return 0;
            }
        };

        let mut reclaimed = 0;
        for job in candidates {
            let timeout = stale_timeout(job.quality);
            if Utc::now() - job.created_at < timeout {
                continue;
            }

            match self
                .jobs
                .transition(
                    job.id,
                    JobStatus::TimedOut,
                    None,
                    None,
                    Some("reclaimed by reaper: processing row exceeded per-quality timeout".to_string()),
                    Some(Utc::now()),
                )
                .await
            {
                Ok(Some(_)) => reclaimed += 1,
                Ok(None) => {
                    // already moved to a terminal state by a live runner; nothing to do
                }
                Err(e) => warn!(job_id = %job.id, error = %e, "reaper failed to reclaim stale job"),
            }
        }
        reclaimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_quality_timeout_is_longer_than_fast() {
        assert!(stale_timeout(Quality::High) > stale_timeout(Quality::Fast));
    }

    #[test]
    fn standard_shares_fasts_timeout() {
        assert_eq!(stale_timeout(Quality::Standard), stale_timeout(Quality::Fast));
    }
}
