//! Background work that runs after a request has been answered.
//!
//! Producers hand follow-up work (timeline fan-out, notifications) to a
//! [`Fanout`] handle. A single [`FanoutWorker`] task runs those jobs with a
//! bounded queue and a cap on how many run at once. Failures are logged and
//! never retried.
use crate::error::Error;
use log::*;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle, JoinSet};

type Job = Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'static>>;

struct Submission {
    name: &'static str,
    job: Job,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanoutConfig {
    /// Jobs waiting to start. Submissions beyond this are dropped.
    pub queue_capacity: usize,
    /// Jobs running at the same time.
    pub concurrency: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            concurrency: 8,
        }
    }
}

/// Cloneable handle for submitting background jobs.
#[derive(Clone)]
pub struct Fanout {
    sender: mpsc::Sender<Submission>,
}

impl Fanout {
    /// Spawns the worker task. Must be called from within a tokio runtime.
    pub fn start(config: FanoutConfig) -> (Fanout, FanoutShutdown) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let (stop, stopped) = oneshot::channel();

        let worker = FanoutWorker {
            receiver,
            jobs: JoinSet::new(),
            concurrency: config.concurrency.max(1),
        };
        let task = tokio::spawn(worker.run(stopped));

        (Fanout { sender }, FanoutShutdown { stop, task })
    }

    /// Queues `job` without waiting. When the queue is full or the worker has
    /// shut down the job is dropped and the drop is logged.
    pub fn submit<F>(&self, name: &'static str, job: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let submission = Submission {
            name,
            job: Box::pin(job),
        };

        match self.sender.try_send(submission) {
            Ok(()) => trace!("Queued background job {name}"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                error!("Background job queue is full, dropping {name}")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("Background worker has shut down, dropping {name}")
            }
        }
    }
}

/// Stops the worker. Owned by whoever started it.
pub struct FanoutShutdown {
    stop: oneshot::Sender<Duration>,
    task: JoinHandle<()>,
}

impl FanoutShutdown {
    /// Stops accepting jobs, runs the ones already queued and waits up to
    /// `grace` for everything to finish. Jobs still running after that are
    /// aborted.
    pub async fn shutdown(self, grace: Duration) {
        if self.stop.send(grace).is_err() {
            warn!("Background worker stopped before shutdown was requested");
        }
        if let Err(e) = self.task.await {
            error!("Background worker task failed: {e}");
        }
    }
}

pub struct FanoutWorker {
    receiver: mpsc::Receiver<Submission>,
    jobs: JoinSet<()>,
    concurrency: usize,
}

impl FanoutWorker {
    async fn run(mut self, mut stopped: oneshot::Receiver<Duration>) {
        debug!("Background worker started");

        let grace = loop {
            tokio::select! {
                biased;
                grace = &mut stopped => break grace.unwrap_or(Duration::ZERO),
                Some(outcome) = self.jobs.join_next(), if !self.jobs.is_empty() => {
                    Self::finished(outcome)
                }
                Some(submission) = self.receiver.recv(), if self.jobs.len() < self.concurrency => {
                    self.begin(submission)
                }
            }
        };

        info!("Background worker draining with a grace period of {grace:?}");
        if tokio::time::timeout(grace, self.drain()).await.is_err() {
            let mut queued = 0;
            while self.receiver.try_recv().is_ok() {
                queued += 1;
            }
            let running = self.jobs.len();
            self.jobs.abort_all();
            error!("Abandoned {running} running and {queued} queued background jobs at shutdown");
        }
        info!("Background worker stopped");
    }

    /// Runs every queued job to completion. The receiver is closed first, so
    /// this ends once the queue is empty even while `Fanout` handles live on.
    async fn drain(&mut self) {
        self.receiver.close();

        loop {
            while self.jobs.len() < self.concurrency {
                match self.receiver.recv().await {
                    Some(submission) => self.begin(submission),
                    None => break,
                }
            }

            match self.jobs.join_next().await {
                Some(outcome) => Self::finished(outcome),
                None => break,
            }
        }
    }

    fn begin(&mut self, submission: Submission) {
        let Submission { name, job } = submission;

        self.jobs.spawn(async move {
            match job.await {
                Ok(()) => debug!("Background job {name} finished"),
                Err(e) => error!("Background job {name} failed: {e}"),
            }
        });
    }

    fn finished(outcome: Result<(), JoinError>) {
        if let Err(e) = outcome {
            if e.is_panic() {
                error!("Background job panicked: {e}");
            }
        }
    }
}
