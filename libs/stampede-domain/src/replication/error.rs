//! Domain errors for replication runs
//!
//! These errors abstract away adapter details: filesystem failures arrive here
//! as a path plus a message, never as a raw `std::io::Error`.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while replicating artifacts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplicationError {
    /// Enumerating the template tree failed (missing root, permission denied, ...)
    #[error("Traversal of {path} failed: {message}")]
    Traversal { path: PathBuf, message: String },

    /// Creating a directory, creating a file or writing to it failed
    #[error("I/O error at {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// The job violates `total_count >= 1` or `max_parallel >= 1`
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    /// A replication task failed; the run was aborted
    #[error("Task {index} (id {identifier:?}) failed: {source}")]
    TaskFailed {
        index: usize,
        identifier: String,
        #[source]
        source: Box<ReplicationError>,
    },

    /// A replication task panicked before reporting a result
    #[error("Replication task panicked: {message}")]
    TaskPanicked { message: String },
}

impl ReplicationError {
    /// Create a traversal error for the given path
    pub fn traversal(path: impl AsRef<Path>, msg: impl ToString) -> Self {
        Self::Traversal {
            path: path.as_ref().to_path_buf(),
            message: msg.to_string(),
        }
    }

    /// Create an I/O error for the given path
    pub fn io(path: impl AsRef<Path>, msg: impl ToString) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            message: msg.to_string(),
        }
    }

    /// Create an invalid job error with a message
    pub fn invalid_job(msg: impl Into<String>) -> Self {
        Self::InvalidJob(msg.into())
    }

    /// Wrap a task-local error with the index and identifier that produced it
    pub fn task_failed(index: usize, identifier: impl Into<String>, source: ReplicationError) -> Self {
        Self::TaskFailed {
            index,
            identifier: identifier.into(),
            source: Box::new(source),
        }
    }

    /// Index of the failing task, if this error came out of one
    pub fn failed_index(&self) -> Option<usize> {
        match self {
            Self::TaskFailed { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Result type alias for replication operations
pub type Result<T> = std::result::Result<T, ReplicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traversal_error() {
        let err = ReplicationError::traversal("models_template", "No such file or directory");
        assert!(matches!(err, ReplicationError::Traversal { .. }));
        assert_eq!(
            err.to_string(),
            "Traversal of models_template failed: No such file or directory"
        );
    }

    #[test]
    fn test_io_error() {
        let err = ReplicationError::io("models/orders_1.sql", "Permission denied");
        assert!(err.to_string().contains("models/orders_1.sql"));
        assert!(err.to_string().contains("Permission denied"));
    }

    #[test]
    fn test_task_failed_carries_index_and_source() {
        let inner = ReplicationError::io("models/a-4.sql", "disk full");
        let err = ReplicationError::task_failed(4, "4", inner.clone());

        assert_eq!(err.failed_index(), Some(4));
        assert!(err.to_string().contains("Task 4"));
        assert!(err.to_string().contains("disk full"));

        let source = std::error::Error::source(&err).expect("source should be set");
        assert_eq!(source.to_string(), inner.to_string());
    }

    #[test]
    fn test_invalid_job_error() {
        let err = ReplicationError::invalid_job("max_parallel must be at least 1");
        assert_eq!(err.failed_index(), None);
        assert_eq!(err.to_string(), "Invalid job: max_parallel must be at least 1");
    }
}
