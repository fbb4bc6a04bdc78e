//! Replication engine - bounded fan-out of numbered copies
//!
//! The engine launches one task per identifier, never lets more than
//! `max_parallel` of them run at once, waits for every launched task to reach
//! a terminal state and reports the first failure it observed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

use super::{Identifier, ReplicationError, ReplicationJob, Result, RunReport, RunState, TaskResult};
use crate::ports::{ArtifactProducer, ArtifactWriter};

/// Service that replicates a set of artifacts `total_count` times
///
/// ## Concurrency
///
/// Slots are permits of a counting semaphore. The dispatcher acquires a
/// permit *before* spawning a task and the task holds it until it returns,
/// so no more than `max_parallel` tasks are ever running. Spawned tasks are
/// tracked in a `JoinSet`, which is the completion barrier of the run.
///
/// ## Failure policy
///
/// The first failing task records its error and raises the abort flag. The
/// dispatcher then stops launching new tasks, but every task already launched
/// runs to completion (it is never interrupted mid-write). No task is retried.
///
/// ## Static Dispatch
///
/// The engine is generic over its producer and writer; both are shared with
/// the spawned tasks through an `Arc`.
pub struct ReplicationEngine<P, W> {
    job: Arc<ReplicationJob>,
    producer: Arc<P>,
    writer: Arc<W>,
    state: Mutex<RunState>,
}

impl<P, W> ReplicationEngine<P, W>
where
    P: ArtifactProducer + 'static,
    W: ArtifactWriter + 'static,
{
    /// Create a new engine for the given job
    pub fn new(job: ReplicationJob, producer: P, writer: W) -> Self {
        Self {
            job: Arc::new(job),
            producer: Arc::new(producer),
            writer: Arc::new(writer),
            state: Mutex::new(RunState::Idle),
        }
    }

    /// Get the job this engine runs
    pub fn job(&self) -> &ReplicationJob {
        &self.job
    }

    /// Get the producer
    pub fn producer(&self) -> &P {
        &self.producer
    }

    /// Get the writer
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Current lifecycle state of the run
    ///
    /// `Idle` until [`run`](Self::run) is called, then `Dispatching` and
    /// `Draining`, and finally `Completed` or `Aborted` once it returns.
    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the job to completion
    ///
    /// # Returns
    ///
    /// A `RunReport` once every copy has been written
    ///
    /// # Errors
    ///
    /// - `ReplicationError::InvalidJob` if the job is invalid (nothing is dispatched)
    /// - `ReplicationError::Io` if a producer destination cannot be created
    /// - `ReplicationError::TaskFailed` carrying the first observed task failure
    /// - `ReplicationError::TaskPanicked` if a task panicked
    pub async fn run(&self) -> Result<RunReport> {
        self.job.validate()?;

        let started_at = Utc::now();
        let total_count = self.job.total_count();
        let max_parallel = self.job.max_parallel().min(Semaphore::MAX_PERMITS);

        info!(
            total_count,
            max_parallel,
            delimiter = %self.job.delimiter(),
            "Starting replication run"
        );

        for destination in self.producer.destinations() {
            if let Err(err) = self.writer.ensure_dir(&destination).await {
                self.transition(RunState::Aborted);
                return Err(err);
            }
        }

        let slots = Arc::new(Semaphore::new(max_parallel));
        let failure = Arc::new(FirstFailure::default());
        let mut tasks: JoinSet<TaskResult> = JoinSet::new();
        let mut tally = Tally::default();

        self.transition(RunState::Dispatching);

        for index in 0..total_count {
            if failure.is_aborted() {
                break;
            }

            // Never closed, so acquisition only fails if the semaphore is dropped.
            let Ok(permit) = slots.clone().acquire_owned().await else {
                break;
            };

            if failure.is_aborted() {
                break;
            }

            let job = Arc::clone(&self.job);
            let producer = Arc::clone(&self.producer);
            let writer = Arc::clone(&self.writer);
            let task_failure = Arc::clone(&failure);

            tasks.spawn(async move {
                let result = replicate_one(index, &job, producer.as_ref(), writer.as_ref()).await;

                // Record before releasing the slot so the dispatcher sees the abort.
                if let Some(err) = &result.error {
                    task_failure.record(ReplicationError::task_failed(
                        result.index,
                        result.identifier.as_str(),
                        err.clone(),
                    ));
                }
                drop(permit);
                result
            });
            tally.dispatched += 1;

            while let Some(joined) = tasks.try_join_next() {
                tally.collect(joined, &failure);
            }
        }

        self.transition(RunState::Draining);
        debug!(dispatched = tally.dispatched, "Waiting for in-flight tasks");

        while let Some(joined) = tasks.join_next().await {
            tally.collect(joined, &failure);
        }

        if let Some(err) = failure.take() {
            self.transition(RunState::Aborted);
            error!(
                error = %err,
                dispatched = tally.dispatched,
                succeeded = tally.succeeded,
                "Replication run aborted"
            );
            return Err(err);
        }

        self.transition(RunState::Completed);

        let report = RunReport {
            total_count,
            max_parallel: self.job.max_parallel(),
            tasks_succeeded: tally.succeeded,
            artifacts_written: tally.artifacts_written,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            tasks = report.tasks_succeeded,
            artifacts = report.artifacts_written,
            elapsed_ms = report.elapsed().as_millis() as u64,
            "Replication run completed"
        );

        Ok(report)
    }

    fn transition(&self, next: RunState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(from = ?*state, to = ?next, "Run state transition");
        *state = next;
    }
}

/// Produce and write every artifact of the copy at `index`
async fn replicate_one<P, W>(index: usize, job: &ReplicationJob, producer: &P, writer: &W) -> TaskResult
where
    P: ArtifactProducer,
    W: ArtifactWriter,
{
    let identifier: Identifier = job.identifier(index);
    info!(index, identifier = %identifier, "Task started");

    let artifacts = match producer.produce(&identifier, job.delimiter()).await {
        Ok(artifacts) => artifacts,
        Err(err) => return TaskResult::failed(index, identifier, 0, err),
    };

    let mut written = 0;
    for artifact in &artifacts {
        match writer.write(artifact).await {
            Ok(path) => {
                debug!(index, path = %path.display(), "Artifact written");
                written += 1;
            }
            Err(err) => return TaskResult::failed(index, identifier, written, err),
        }
    }

    TaskResult::succeeded(index, identifier, written)
}

/// Single "first error wins" cell shared by all tasks
#[derive(Default)]
struct FirstFailure {
    aborted: AtomicBool,
    error: Mutex<Option<ReplicationError>>,
}

impl FirstFailure {
    fn record(&self, err: ReplicationError) {
        let mut slot = self.error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            error!(error = %err, "First task failure, stopping dispatch");
            *slot = Some(err);
        }
        self.aborted.store(true, Ordering::SeqCst);
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    fn take(&self) -> Option<ReplicationError> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[derive(Default)]
struct Tally {
    dispatched: usize,
    succeeded: usize,
    artifacts_written: usize,
}

impl Tally {
    fn collect(&mut self, joined: std::result::Result<TaskResult, JoinError>, failure: &FirstFailure) {
        match joined {
            Ok(result) => {
                if result.is_success() {
                    self.succeeded += 1;
                }
                self.artifacts_written += result.artifacts_written;
            }
            Err(err) => failure.record(ReplicationError::TaskPanicked {
                message: err.to_string(),
            }),
        }
    }
}
