//! Synthesize variant
//!
//! Renders a fixed set of SQL model templates per copy instead of reading
//! files from disk.

mod producer;
mod template;

pub use producer::{SqlModelProducer, DEFAULT_STAGING_DIR, SQL_EXTENSION};
pub use template::{render, SqlTemplate, Stage, DELIM_TOKEN, ID_TOKEN, TEMPLATES};
