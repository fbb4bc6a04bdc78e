//! Filesystem adapters for stampede
//!
//! Implements the domain ports against the local filesystem:
//!
//! - [`FsArtifactWriter`]: the `ArtifactWriter` port, with atomic replace-on-write
//! - [`TemplateTreeProducer`]: the copy-variant `ArtifactProducer`

pub mod infrastructure;

pub use infrastructure::{FsArtifactWriter, TemplateFile, TemplateTreeProducer, DEFAULT_EXTENSION};
