//! Domain entities for replication runs
//!
//! A [`ReplicationJob`] is the immutable description of one batch run. Each
//! task of the run turns its [`Identifier`](super::Identifier) into a set of
//! [`ArtifactSpec`]s, and reports back a [`TaskResult`].

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::error::{ReplicationError, Result};
use super::ids::Identifier;

/// Immutable configuration of one batch generation run
///
/// Built once at startup and shared read-only with every task.
///
/// # Example
///
/// ```rust
/// use stampede_domain::ReplicationJob;
///
/// let job = ReplicationJob::new(2000, 128, "_").unwrap();
/// assert_eq!(job.total_count(), 2000);
/// assert!(ReplicationJob::new(0, 1, "-").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationJob {
    /// Number of copies to produce
    total_count: usize,

    /// Hard ceiling on simultaneously running tasks
    max_parallel: usize,

    /// Inserted between a file stem and its identifier
    #[serde(default)]
    delimiter: String,
}

impl ReplicationJob {
    /// Create a validated job
    ///
    /// # Errors
    ///
    /// Returns `ReplicationError::InvalidJob` if `total_count` or
    /// `max_parallel` is zero.
    pub fn new(total_count: usize, max_parallel: usize, delimiter: impl Into<String>) -> Result<Self> {
        let job = Self {
            total_count,
            max_parallel,
            delimiter: delimiter.into(),
        };
        job.validate()?;
        Ok(job)
    }

    /// Check the job invariants
    ///
    /// Jobs built through [`ReplicationJob::new`] are always valid; this is
    /// for jobs that came in through deserialization.
    pub fn validate(&self) -> Result<()> {
        if self.total_count == 0 {
            return Err(ReplicationError::invalid_job("total_count must be at least 1"));
        }
        if self.max_parallel == 0 {
            return Err(ReplicationError::invalid_job("max_parallel must be at least 1"));
        }
        Ok(())
    }

    /// Get the number of copies to produce
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// Get the concurrency ceiling
    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Get the delimiter
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Identifier of the task at `index`
    pub fn identifier(&self, index: usize) -> Identifier {
        Identifier::format(self.total_count, index)
    }
}

/// An instruction to write one file
///
/// `destination` is relative to the writer's target root; an empty path
/// means the root itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    /// Directory the file lands in, relative to the target root
    pub destination: PathBuf,

    /// File name, including its extension
    pub name: String,

    /// Exact bytes of the file
    pub content: Bytes,
}

impl ArtifactSpec {
    /// Create a new artifact spec
    pub fn new(destination: impl Into<PathBuf>, name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            destination: destination.into(),
            name: name.into(),
            content: content.into(),
        }
    }

    /// Path of the artifact relative to the target root
    pub fn relative_path(&self) -> PathBuf {
        self.destination.join(&self.name)
    }
}

/// Terminal state of a single replication task
///
/// A task that has not been dispatched is still waiting for a slot; a
/// dispatched one holds its slot until it reaches one of these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Succeeded,
    Failed,
}

/// Lifecycle of a whole run, exposed by `ReplicationEngine::state`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Dispatching,
    Draining,
    Completed,
    Aborted,
}

/// Outcome of one replication task
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub index: usize,
    pub identifier: Identifier,
    pub state: TaskState,
    pub artifacts_written: usize,
    pub error: Option<ReplicationError>,
}

impl TaskResult {
    pub(crate) fn succeeded(index: usize, identifier: Identifier, artifacts_written: usize) -> Self {
        Self {
            index,
            identifier,
            state: TaskState::Succeeded,
            artifacts_written,
            error: None,
        }
    }

    pub(crate) fn failed(
        index: usize,
        identifier: Identifier,
        artifacts_written: usize,
        error: ReplicationError,
    ) -> Self {
        Self {
            index,
            identifier,
            state: TaskState::Failed,
            artifacts_written,
            error: Some(error),
        }
    }

    /// Check if the task reached `Succeeded`
    pub fn is_success(&self) -> bool {
        self.state == TaskState::Succeeded
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub total_count: usize,
    pub max_parallel: usize,
    pub tasks_succeeded: usize,
    pub artifacts_written: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Wall-clock duration of the run
    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Artifacts written per second
    pub fn artifacts_per_second(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.artifacts_written as f64 / secs
        } else {
            0.0
        }
    }
}
