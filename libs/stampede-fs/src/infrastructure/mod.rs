mod fs_writer;
mod tree_producer;

pub use fs_writer::FsArtifactWriter;
pub use tree_producer::{TemplateFile, TemplateTreeProducer, DEFAULT_EXTENSION};
