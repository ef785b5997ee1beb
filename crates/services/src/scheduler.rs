//! `JobScheduler` (`spec.md` §4.6): a FIFO queue paired with a bounded pool
//! of `W` workers. `submit` is non-blocking; `drain` waits for in-flight
//! work and refuses further submits.

use crate::error::JobError;
use async_trait::async_trait;
use chrono::Utc;
use database::JobRepository;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Executes one job to completion. Implementations are responsible for
/// progress updates and the terminal state transition; the scheduler only
/// performs the initial `queued -> processing` transition.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job_id: Uuid, cancel: CancellationToken) -> Result<(), JobError>;
}

struct Inner {
    tx: Mutex<Option<mpsc::Sender<Uuid>>>,
    rx: tokio::sync::Mutex<mpsc::Receiver<Uuid>>,
    jobs: Arc<JobRepository>,
    runner: Arc<dyn JobRunner>,
    cancellations: Mutex<HashMap<Uuid, CancellationToken>>,
    shutdown: CancellationToken,
    draining: AtomicBool,
    workers: tokio::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

/// FIFO queue + bounded worker pool. `W` is the only global backpressure
/// knob (`spec.md` §5) — the process never overcommits upstreams beyond it.
#[derive(Clone)]
pub struct JobScheduler {
    inner: Arc<Inner>,
}

impl JobScheduler {
    pub fn new(workers: usize, queue_bound: usize, jobs: Arc<JobRepository>, runner: Arc<dyn JobRunner>) -> Self {
        let (tx, rx) = mpsc::channel(queue_bound.max(1));
        let inner = Arc::new(Inner {
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            jobs,
            runner,
            cancellations: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
            draining: AtomicBool::new(false),
            workers: tokio::sync::Mutex::new(Vec::new()),
        });

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                let inner = inner.clone();
                tokio::spawn(async move { Self::worker_loop(worker_id, inner).await })
            })
            .collect();
        // Uncontended: nothing else can reach `inner.workers` before `new`
        // returns and hands out the first `JobScheduler` clone.
        *inner.workers.try_lock().expect("uncontended at construction time") = handles;

        Self { inner }
    }

    /// Non-blocking. The job row must already be `queued` in storage.
    pub fn submit(&self, job_id: Uuid) -> Result<(), JobError> {
        if self.inner.draining.load(Ordering::SeqCst) {
            return Err(JobError::Internal("scheduler is draining, refusing submit".to_string()));
        }
        let token = CancellationToken::new();
        self.inner.cancellations.lock().unwrap().insert(job_id, token);
        match self.inner.tx.lock().unwrap().as_ref() {
            Some(tx) => tx
                .try_send(job_id)
                .map_err(|_| JobError::Internal("job queue is full".to_string())),
            None => Err(JobError::Internal("scheduler is draining, refusing submit".to_string())),
        }
    }

    pub fn cancel(&self, job_id: Uuid) {
        if let Some(token) = self.inner.cancellations.lock().unwrap().get(&job_id) {
            token.cancel();
        }
    }

    /// Stops accepting new submits, cancels every in-flight job, and waits
    /// for every worker task to actually exit (`spec.md` §5) — including the
    /// `failed(ShutdownAborted)` write each cancelled job's `fail_job` call
    /// performs, so that row lands before this returns rather than racing
    /// process exit.
    pub async fn drain(&self) {
        self.inner.draining.store(true, Ordering::SeqCst);
        self.inner.shutdown.cancel();
        for (_, token) in self.inner.cancellations.lock().unwrap().iter() {
            token.cancel();
        }
        // Dropping the sender closes the channel once already-queued jobs
        // drain, so every worker's `rx.recv()` eventually returns `None` and
        // the loop exits instead of waiting forever for more submits.
        self.inner.tx.lock().unwrap().take();

        let handles = std::mem::take(&mut *self.inner.workers.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "scheduler worker task panicked during drain");
            }
        }
    }

    async fn worker_loop(worker_id: usize, inner: Arc<Inner>) {
        loop {
            let job_id = {
                let mut rx = inner.rx.lock().await;
                rx.recv().await
            };
            let Some(job_id) = job_id else {
                break;
            };

            let cancel = inner
                .cancellations
                .lock()
                .unwrap()
                .get(&job_id)
                .cloned()
                .unwrap_or_else(CancellationToken::new);

            if inner.shutdown.is_cancelled() {
                Self::fail_job(&inner, job_id, JobError::ShutdownAborted).await;
                continue;
            }

            if let Err(e) = inner
                .jobs
                .transition(job_id, domain::job::JobStatus::Processing, Some(20), None, None, None)
                .await
            {
                error!(worker_id, %job_id, error = %e, "failed to transition job to processing, skipping");
                continue;
            }

            let runner = inner.runner.clone();
            let run_cancel = cancel.clone();
            let result = AssertUnwindSafe(runner.run(job_id, run_cancel)).catch_unwind().await;

            match result {
                Ok(Ok(())) => {
                    info!(worker_id, %job_id, "job completed");
                }
                Ok(Err(e)) => {
                    warn!(worker_id, %job_id, error = %e, "job failed");
                    Self::fail_job(&inner, job_id, e).await;
                }
                Err(_) => {
                    error!(worker_id, %job_id, "job runner panicked");
                    Self::fail_job(&inner, job_id, JobError::Internal("job runner panicked".to_string())).await;
                }
            }

            inner.cancellations.lock().unwrap().remove(&job_id);
        }
    }

    async fn fail_job(inner: &Arc<Inner>, job_id: Uuid, error: JobError) {
        if let Err(e) = inner
            .jobs
            .transition(
                job_id,
                domain::job::JobStatus::Failed,
                Some(0),
                None,
                Some(error.message()),
                Some(Utc::now()),
            )
            .await
        {
            error!(%job_id, error = %e, "failed to persist job failure");
        }
    }
}
