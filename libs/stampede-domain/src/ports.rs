//! Ports (trait definitions) for external dependencies
//!
//! This module defines the contracts (ports) that adapters must implement.
//! Following hexagonal architecture, the domain defines what it needs, and the
//! infrastructure provides implementations.
//!
//! ## Static Dispatch
//!
//! We use native Rust async traits with `impl Future` return types instead of
//! `async_trait` to ensure zero-cost abstractions and static dispatch.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::replication::{ArtifactSpec, Identifier, ReplicationError};

/// Port that turns one identifier into the artifacts of one copy
///
/// Two implementations exist: a copy variant that duplicates template files
/// from a source tree, and a synthesize variant that renders built-in text
/// templates. The engine calls `produce` once per task, concurrently from
/// many tasks, so implementations must be shareable across threads.
pub trait ArtifactProducer: Send + Sync {
    /// Produce every artifact of the copy tagged with `identifier`
    ///
    /// # Arguments
    ///
    /// * `identifier` - The zero-padded identifier of the current copy
    /// * `delimiter` - Inserted between each file stem and the identifier
    ///
    /// # Errors
    ///
    /// Returns `ReplicationError::Traversal` if the template source cannot be
    /// enumerated, or `ReplicationError::Io` if a template cannot be read.
    fn produce(
        &self,
        identifier: &Identifier,
        delimiter: &str,
    ) -> impl Future<Output = Result<Vec<ArtifactSpec>, ReplicationError>> + Send;

    /// Directories (relative to the target root) this producer always writes to
    ///
    /// The engine creates them once before dispatching any task.
    fn destinations(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Port for persisting artifacts
///
/// Implementations resolve every destination under their own target root.
pub trait ArtifactWriter: Send + Sync {
    /// Ensure a destination directory (and all its parents) exists
    ///
    /// Must be idempotent and safe to call concurrently for the same
    /// directory: an already existing directory is not an error.
    ///
    /// # Returns
    ///
    /// The resolved directory path
    fn ensure_dir(
        &self,
        destination: &Path,
    ) -> impl Future<Output = Result<PathBuf, ReplicationError>> + Send;

    /// Write one artifact, creating or replacing the file
    ///
    /// On success the file holds exactly `artifact.content`. Writes are not
    /// transactional across calls: artifacts written before a failure stay on
    /// disk.
    ///
    /// # Returns
    ///
    /// The full path of the written file
    ///
    /// # Errors
    ///
    /// Returns `ReplicationError::Io` if the directory, the file or the write fails
    fn write(
        &self,
        artifact: &ArtifactSpec,
    ) -> impl Future<Output = Result<PathBuf, ReplicationError>> + Send;
}
