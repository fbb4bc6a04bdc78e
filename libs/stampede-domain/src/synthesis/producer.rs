use std::future::{ready, Future};
use std::path::{Path, PathBuf};

use super::template::{render, Stage, SqlTemplate, TEMPLATES};
use crate::ports::ArtifactProducer;
use crate::replication::{ArtifactSpec, Identifier, ReplicationError};

/// Default name of the staging subdirectory
pub const DEFAULT_STAGING_DIR: &str = "staging";

/// Extension of every synthesized artifact
pub const SQL_EXTENSION: &str = "sql";

/// Synthesize-variant producer: renders the built-in SQL models for each copy
///
/// Staging models land in the staging subdirectory, mart models directly in
/// the target root. Rendering is pure, so `produce` never fails.
#[derive(Debug, Clone)]
pub struct SqlModelProducer {
    staging: PathBuf,
    templates: &'static [SqlTemplate],
}

impl SqlModelProducer {
    /// Create a producer writing staging models to `staging`
    pub fn new(staging: impl Into<PathBuf>) -> Self {
        Self {
            staging: staging.into(),
            templates: &TEMPLATES,
        }
    }

    /// Get the staging subdirectory
    pub fn staging(&self) -> &Path {
        &self.staging
    }

    /// Render every template for one copy
    pub fn render_all(&self, identifier: &Identifier, delimiter: &str) -> Vec<ArtifactSpec> {
        self.templates
            .iter()
            .map(|template| {
                let destination = match template.stage {
                    Stage::Staging => self.staging.clone(),
                    Stage::Mart => PathBuf::new(),
                };
                let name = format!("{}{delimiter}{identifier}.{SQL_EXTENSION}", template.name);
                let body = render(template.body, delimiter, identifier.as_str());

                ArtifactSpec::new(destination, name, body)
            })
            .collect()
    }
}

impl Default for SqlModelProducer {
    fn default() -> Self {
        Self::new(DEFAULT_STAGING_DIR)
    }
}

impl ArtifactProducer for SqlModelProducer {
    fn produce(
        &self,
        identifier: &Identifier,
        delimiter: &str,
    ) -> impl Future<Output = Result<Vec<ArtifactSpec>, ReplicationError>> + Send {
        ready(Ok(self.render_all(identifier, delimiter)))
    }

    fn destinations(&self) -> Vec<PathBuf> {
        vec![PathBuf::new(), self.staging.clone()]
    }
}
