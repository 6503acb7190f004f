use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::metrics::{CompletionTally, RunClock, Summary};
use crate::worker::{run_worker, WorkerContext, WorkerReport};

/// Shape of the load a run generates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    /// Total number of open/cancel sequences.
    pub requests: usize,
    /// Pause before each worker launch.
    pub wait: Duration,
    /// Pause between a worker's HEADERS and its RST_STREAM.
    pub delay: Duration,
    /// Cap on simultaneously running workers; `None` is unbounded.
    pub concurrency: Option<NonZeroUsize>,
}

impl Default for LoadPlan {
    fn default() -> Self {
        Self {
            requests: 5,
            wait: Duration::ZERO,
            delay: Duration::ZERO,
            concurrency: None,
        }
    }
}

/// Launches the workers of one run and aggregates what they did.
pub struct Coordinator {
    ctx: Arc<WorkerContext>,
    plan: LoadPlan,
}

impl Coordinator {
    pub fn new(ctx: Arc<WorkerContext>, plan: LoadPlan) -> Self {
        Self { ctx, plan }
    }

    /// Runs every worker to completion and returns the summary.
    ///
    /// With a concurrency cap, a permit is taken before each launch and
    /// released when that worker finishes, so the launch loop stalls while
    /// the cap is reached.
    pub async fn run(&self) -> Summary {
        let limiter = self.plan.concurrency.map(|c| Arc::new(Semaphore::new(c.get())));
        let mut workers = JoinSet::new();
        let mut tally = CompletionTally::default();

        info!(
            requests = self.plan.requests,
            wait_ms = self.plan.wait.as_millis() as u64,
            delay_ms = self.plan.delay.as_millis() as u64,
            concurrency = self.plan.concurrency.map_or(0, NonZeroUsize::get),
            "Starting workers"
        );

        let clock = RunClock::start();

        for _ in 0..self.plan.requests {
            if !self.plan.wait.is_zero() {
                tokio::time::sleep(self.plan.wait).await;
            }

            let permit = match &limiter {
                Some(limiter) => limiter.clone().acquire_owned().await.ok(),
                None => None,
            };

            let ctx = self.ctx.clone();
            let delay = self.plan.delay;
            workers.spawn(async move {
                let report = run_worker(ctx, delay).await;
                drop(permit);
                report
            });

            // reap finished workers so a long run does not hold every report
            while let Some(joined) = workers.try_join_next() {
                record(&mut tally, joined);
            }
        }

        while let Some(joined) = workers.join_next().await {
            record(&mut tally, joined);
        }

        let window = clock.stop();
        let summary = Summary::new(self.plan.requests, self.ctx.metrics.snapshot(), tally, window);

        if summary.shortfall() > 0 {
            warn!(
                "{} of {} HEADERS frames were not sent",
                summary.shortfall(),
                self.plan.requests
            );
        }
        summary
    }
}

fn record(tally: &mut CompletionTally, joined: Result<WorkerReport, JoinError>) {
    tally.completed += 1;
    match joined {
        Ok(WorkerReport::Completed {
            stream_id,
            headers,
            reset,
        }) => {
            if headers.is_err() {
                tally.headers_failed += 1;
            }
            if reset.is_err() {
                tally.resets_failed += 1;
            }
            debug!("[{}] Worker finished", stream_id);
        }
        Ok(WorkerReport::Exhausted) => tally.exhausted += 1,
        Err(e) => {
            tally.panicked += 1;
            error!("Worker task failed: {}", e);
        }
    }
}
