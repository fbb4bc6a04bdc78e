//! Replication domain module
//!
//! This module contains the entities of a batch run and the bounded-concurrency
//! engine that fans one job out into numbered copies.

mod entity;
mod error;
mod ids;
mod service;

pub use entity::{ArtifactSpec, ReplicationJob, RunReport, RunState, TaskResult, TaskState};
pub use error::{ReplicationError, Result};
pub use ids::Identifier;
pub use service::ReplicationEngine;
