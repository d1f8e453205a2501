//! A tiny in-process job queue for the fire-and-forget work named in spec
//! §4.10.1 step 4 and §7: city-name translation and embedding inference
//! after ingest, and anything else that must never fail the request that
//! scheduled it. Jobs are pushed onto an unbounded `mpsc` channel and
//! drained sequentially by one worker task; a failing job is logged and
//! dropped, not retried or surfaced.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

type BoxedJob = Pin<Box<dyn Future<Output = JobOutcome> + Send>>;

struct JobOutcome {
    name: &'static str,
    result: Result<(), String>,
}

/// A cheaply-cloneable handle used to enqueue jobs. The actual worker loop
/// lives in the [`JoinHandle`] returned by [`BackgroundJobs::start`].
#[derive(Clone)]
pub struct BackgroundJobs {
    tx: mpsc::UnboundedSender<BoxedJob>,
}

impl BackgroundJobs {
    /// Spawns the draining worker task and returns a handle to enqueue jobs
    /// plus the task's [`JoinHandle`] (kept alive by the composition root
    /// for the process lifetime).
    pub fn start() -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<BoxedJob>();

        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let outcome = job.await;
                if let Err(message) = outcome.result {
                    error!(job = outcome.name, error = %message, "background job failed");
                }
            }
        });

        (Self { tx }, worker)
    }

    /// Enqueues `fut` under `name` (used only for the failure log line).
    /// Never blocks the caller; if the worker has already shut down the job
    /// is silently dropped, matching "failures are logged, not propagated"
    /// — there is no caller left to propagate to at that point.
    pub fn spawn<F, E>(&self, name: &'static str, fut: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::fmt::Display,
    {
        let boxed: BoxedJob = Box::pin(async move {
            JobOutcome {
                name,
                result: fut.await.map_err(|err| err.to_string()),
            }
        });
        let _ = self.tx.send(boxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn drains_jobs_in_the_background() {
        let (jobs, _worker) = BackgroundJobs::start();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = counter.clone();
        jobs.spawn::<_, std::convert::Infallible>("increment", async move {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_failing_job_does_not_panic_the_worker() {
        let (jobs, _worker) = BackgroundJobs::start();
        jobs.spawn::<_, &str>("doomed", async { Err("boom") });

        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        jobs.spawn::<_, std::convert::Infallible>("after", async move {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
