//! # Stampede Domain Layer
//!
//! This crate contains the pure business logic for stampede, a generator of
//! large volumes of near-identical, numbered fixture files. It follows
//! hexagonal architecture principles:
//!
//! - **Entities**: Core domain models (ReplicationJob, Identifier, ArtifactSpec)
//! - **Ports**: Trait definitions for external dependencies (ArtifactProducer, ArtifactWriter)
//! - **Services**: The bounded-concurrency ReplicationEngine
//!
//! ## Architecture
//!
//! This layer never touches the filesystem directly. Reading templates and
//! persisting artifacts are expressed as traits (ports) implemented by the
//! adapter crate.
//!
//! ## Example
//!
//! ```rust,no_run
//! use stampede_domain::{ArtifactProducer, ArtifactWriter, ReplicationEngine, ReplicationJob};
//!
//! async fn example<P: ArtifactProducer + 'static, W: ArtifactWriter + 'static>(producer: P, writer: W) {
//!     let job = ReplicationJob::new(1000, 128, "_").unwrap();
//!     let engine = ReplicationEngine::new(job, producer, writer);
//!     let report = engine.run().await.unwrap();
//!     println!("Wrote {} artifacts", report.artifacts_written);
//! }
//! ```

pub mod ports;
pub mod replication;
pub mod synthesis;

// Re-export commonly used types
pub use ports::{ArtifactProducer, ArtifactWriter};
pub use replication::{
    ArtifactSpec, Identifier, ReplicationEngine, ReplicationError, ReplicationJob, RunReport,
    RunState, TaskResult, TaskState,
};
pub use synthesis::SqlModelProducer;
