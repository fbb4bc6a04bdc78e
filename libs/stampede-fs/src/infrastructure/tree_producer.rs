//! Template Tree Producer
//!
//! Copy variant of the `ArtifactProducer` port: every file with the configured
//! extension under a source tree is duplicated once per copy, renamed
//! `<stem><delimiter><identifier>.<ext>` and placed at the same relative
//! location under the writer's target root.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, debug_span, error, info, Instrument};

use stampede_domain::{ArtifactProducer, ArtifactSpec, Identifier, ReplicationError};

/// Extension replicated when none is configured
pub const DEFAULT_EXTENSION: &str = "sql";

/// Copy-variant producer backed by a template directory
///
/// The tree is walked again for every copy. Files with any other extension,
/// directories and symlinks are skipped; skipping is never an error.
///
/// When the copies land inside the source tree, register their directory
/// with [`excluding`](Self::excluding) so later walks do not pick them up.
#[derive(Debug, Clone)]
pub struct TemplateTreeProducer {
    source_root: PathBuf,
    extension: String,
    excluded: Option<PathBuf>,
}

/// A template file found under the source root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Full path of the template
    pub path: PathBuf,
    /// Parent directory relative to the source root
    pub relative_dir: PathBuf,
    /// File name without its extension
    pub stem: String,
}

impl TemplateTreeProducer {
    /// Create a producer for `source_root`, replicating files with `extension`
    ///
    /// The extension may be given with or without its leading dot.
    pub fn new(source_root: impl Into<PathBuf>, extension: impl AsRef<str>) -> Self {
        let source_root = source_root.into();
        let extension = extension.as_ref().trim_start_matches('.').to_string();
        info!(
            source_root = %source_root.display(),
            extension = %extension,
            "Initializing TemplateTreeProducer"
        );
        Self {
            source_root,
            extension,
            excluded: None,
        }
    }

    /// Skip the subtree at `dir` while walking
    ///
    /// `dir` does not need to exist yet: it is resolved through its nearest
    /// existing ancestor, so a target directory created by the run itself is
    /// excluded from the first walk on. Walking fails if `dir` is the source
    /// root itself.
    pub fn excluding(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded = Some(dir.into());
        self
    }

    /// Get the source root
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Get the replicated extension (without the dot)
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Walk the source tree and list every eligible template
    ///
    /// Entries are sorted per directory; callers must not depend on the order.
    ///
    /// # Errors
    ///
    /// Returns `ReplicationError::Traversal` if any directory of the tree
    /// cannot be read, including a missing source root, or if the excluded
    /// directory is the source root.
    pub async fn discover(&self) -> Result<Vec<TemplateFile>, ReplicationError> {
        let excluded = self.resolve_excluded().await?;
        let mut found = Vec::new();
        let mut pending = vec![PathBuf::new()];

        while let Some(relative_dir) = pending.pop() {
            let dir = self.source_root.join(&relative_dir);
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|err| traversal_error(&dir, err))?;

            let mut children = Vec::new();
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|err| traversal_error(&dir, err))?
            {
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|err| traversal_error(&entry.path(), err))?;
                children.push((entry.path(), entry.file_name(), file_type));
            }
            children.sort_by(|a, b| a.1.cmp(&b.1));

            for (path, file_name, file_type) in children {
                if file_type.is_dir() {
                    if is_excluded(&path, excluded.as_deref()).await {
                        debug!(path = %path.display(), "Skipping excluded directory");
                        continue;
                    }
                    pending.push(relative_dir.join(&file_name));
                    continue;
                }

                match self.template_stem(&file_name) {
                    Some(stem) if file_type.is_file() => found.push(TemplateFile {
                        stem: stem.to_string(),
                        path,
                        relative_dir: relative_dir.clone(),
                    }),
                    _ => debug!(path = %path.display(), "Skipping non-template entry"),
                }
            }
        }

        Ok(found)
    }

    /// Artifacts for the unsuffixed originals (`<stem>.<ext>`)
    pub async fn originals(&self) -> Result<Vec<ArtifactSpec>, ReplicationError> {
        self.produce(&Identifier::empty(), "").await
    }

    /// Stem of `file_name` if its extension is the replicated one
    ///
    /// The extension is whatever follows the last dot, so a bare `.sql` is a
    /// template with an empty stem. Names that are not valid UTF-8 never match.
    fn template_stem<'a>(&self, file_name: &'a OsStr) -> Option<&'a str> {
        let (stem, extension) = file_name.to_str()?.rsplit_once('.')?;
        (extension == self.extension).then_some(stem)
    }

    async fn resolve_excluded(&self) -> Result<Option<PathBuf>, ReplicationError> {
        let Some(excluded) = &self.excluded else {
            return Ok(None);
        };
        let Some(excluded) = resolve_lenient(excluded).await else {
            return Ok(None);
        };

        let root = tokio::fs::canonicalize(&self.source_root)
            .await
            .map_err(|err| traversal_error(&self.source_root, err))?;
        if root == excluded {
            error!(path = %root.display(), "Excluded directory is the source root");
            return Err(ReplicationError::traversal(
                &self.source_root,
                "target directory is the template tree itself",
            ));
        }

        Ok(Some(excluded))
    }

    fn artifact_name(&self, stem: &str, delimiter: &str, identifier: &Identifier) -> String {
        format!("{stem}{delimiter}{identifier}.{}", self.extension)
    }
}

/// Canonical form of `path`, which may not exist yet
async fn resolve_lenient(path: &Path) -> Option<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();

    loop {
        if let Ok(canonical) = tokio::fs::canonicalize(existing).await {
            return Some(missing.iter().rev().fold(canonical, |acc, name| acc.join(name)));
        }
        missing.push(existing.file_name()?);
        existing = match existing.parent()? {
            parent if parent.as_os_str().is_empty() => Path::new("."),
            parent => parent,
        };
    }
}

async fn is_excluded(dir: &Path, excluded: Option<&Path>) -> bool {
    match excluded {
        Some(excluded) => tokio::fs::canonicalize(dir)
            .await
            .is_ok_and(|dir| dir == excluded),
        None => false,
    }
}

fn traversal_error(path: &Path, err: std::io::Error) -> ReplicationError {
    error!(path = %path.display(), error = %err, "Template traversal failed");
    ReplicationError::traversal(path, err)
}

impl ArtifactProducer for TemplateTreeProducer {
    fn produce(
        &self,
        identifier: &Identifier,
        delimiter: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ArtifactSpec>, ReplicationError>> + Send
    {
        let span = debug_span!("produce", identifier = %identifier);

        async move {
            let templates = self.discover().await?;
            let mut artifacts = Vec::with_capacity(templates.len());

            for template in templates {
                let content = tokio::fs::read(&template.path).await.map_err(|err| {
                    error!(path = %template.path.display(), error = %err, "Failed to read template");
                    ReplicationError::io(&template.path, err)
                })?;

                artifacts.push(ArtifactSpec::new(
                    template.relative_dir,
                    self.artifact_name(&template.stem, delimiter, identifier),
                    Bytes::from(content),
                ));
            }

            debug!(count = artifacts.len(), "Templates collected");
            Ok(artifacts)
        }
        .instrument(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn fixture_tree() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("a.sql"), "select 'a'").unwrap();
        std::fs::write(root.join("b.txt"), "not a template").unwrap();
        std::fs::write(root.join("sub/c.sql"), "select 'c'").unwrap();
        temp_dir
    }

    fn relative_paths(artifacts: &[ArtifactSpec]) -> BTreeSet<PathBuf> {
        artifacts.iter().map(|a| a.relative_path()).collect()
    }

    #[tokio::test]
    async fn test_produce_renames_matching_files() {
        let tree = fixture_tree();
        let producer = TemplateTreeProducer::new(tree.path(), "sql");

        let artifacts = producer
            .produce(&Identifier::format(1000, 7), "-")
            .await
            .unwrap();

        let expected: BTreeSet<PathBuf> = ["a-007.sql", "sub/c-007.sql"]
            .iter()
            .map(PathBuf::from)
            .collect();
        assert_eq!(relative_paths(&artifacts), expected);

        let c = artifacts.iter().find(|a| a.name == "c-007.sql").unwrap();
        assert_eq!(c.content, Bytes::from_static(b"select 'c'"));
    }

    #[tokio::test]
    async fn test_extension_accepts_leading_dot() {
        let tree = fixture_tree();
        let producer = TemplateTreeProducer::new(tree.path(), ".txt");

        assert_eq!(producer.extension(), "txt");
        let artifacts = producer.produce(&Identifier::format(10, 1), "_").await.unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].name, "b_1.txt");
    }

    #[tokio::test]
    async fn test_originals_keep_their_names() {
        let tree = fixture_tree();
        let producer = TemplateTreeProducer::new(tree.path(), DEFAULT_EXTENSION);

        let artifacts = producer.originals().await.unwrap();

        let expected: BTreeSet<PathBuf> =
            ["a.sql", "sub/c.sql"].iter().map(PathBuf::from).collect();
        assert_eq!(relative_paths(&artifacts), expected);
    }

    #[tokio::test]
    async fn test_discover_reports_each_template_once() {
        let tree = fixture_tree();
        std::fs::create_dir_all(tree.path().join("sub/deeper")).unwrap();
        std::fs::write(tree.path().join("sub/deeper/d.sql"), "d").unwrap();
        std::fs::write(tree.path().join("sub/deeper/e.sql.bak"), "e").unwrap();

        let producer = TemplateTreeProducer::new(tree.path(), "sql");
        let found = producer.discover().await.unwrap();

        let stems: BTreeSet<_> = found.iter().map(|t| t.stem.clone()).collect();
        assert_eq!(found.len(), 3);
        assert_eq!(
            stems,
            ["a", "c", "d"].iter().map(|s| s.to_string()).collect::<BTreeSet<_>>()
        );

        let d = found.iter().find(|t| t.stem == "d").unwrap();
        assert_eq!(d.relative_dir, PathBuf::from("sub/deeper"));
    }

    #[tokio::test]
    async fn test_empty_tree_produces_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let producer = TemplateTreeProducer::new(temp_dir.path(), "sql");

        let artifacts = producer.produce(&Identifier::format(1, 0), "-").await.unwrap();
        assert!(artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_missing_root_is_traversal_error() {
        let producer = TemplateTreeProducer::new("/nonexistent/stampede/templates", "sql");

        let err = producer
            .produce(&Identifier::format(10, 0), "-")
            .await
            .unwrap_err();

        match err {
            ReplicationError::Traversal { path, .. } => {
                assert_eq!(path, PathBuf::from("/nonexistent/stampede/templates"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bare_extension_file_is_a_template() {
        let tree = fixture_tree();
        std::fs::write(tree.path().join(".sql"), "select 'bare'").unwrap();
        std::fs::write(tree.path().join("README"), "no extension").unwrap();

        let producer = TemplateTreeProducer::new(tree.path(), "sql");
        let artifacts = producer
            .produce(&Identifier::format(1000, 7), "-")
            .await
            .unwrap();

        let expected: BTreeSet<PathBuf> = ["-007.sql", "a-007.sql", "sub/c-007.sql"]
            .iter()
            .map(PathBuf::from)
            .collect();
        assert_eq!(relative_paths(&artifacts), expected);
    }

    #[tokio::test]
    async fn test_only_the_last_extension_counts() {
        let tree = fixture_tree();
        std::fs::write(tree.path().join("x.sql.bak"), "backup").unwrap();
        std::fs::write(tree.path().join("y.v2.sql"), "select 'y'").unwrap();

        let producer = TemplateTreeProducer::new(tree.path(), "sql");
        let found = producer.discover().await.unwrap();

        let stems: BTreeSet<_> = found.iter().map(|t| t.stem.as_str()).collect();
        assert_eq!(stems, ["a", "c", "y.v2"].into_iter().collect::<BTreeSet<_>>());
    }

    #[tokio::test]
    async fn test_excluded_subtree_is_not_walked() {
        let tree = fixture_tree();
        let out = tree.path().join("out");
        std::fs::create_dir_all(out.join("sub")).unwrap();
        std::fs::write(out.join("a-0.sql"), "copy").unwrap();
        std::fs::write(out.join("sub/c-0.sql"), "copy").unwrap();

        let producer = TemplateTreeProducer::new(tree.path(), "sql").excluding(&out);
        let found = producer.discover().await.unwrap();

        let stems: BTreeSet<_> = found.iter().map(|t| t.stem.as_str()).collect();
        assert_eq!(stems, ["a", "c"].into_iter().collect::<BTreeSet<_>>());
    }

    #[tokio::test]
    async fn test_excluded_dir_may_not_exist_yet() {
        let tree = fixture_tree();

        let producer = TemplateTreeProducer::new(tree.path(), "sql")
            .excluding(tree.path().join("sub/not-yet/out"));

        assert_eq!(producer.discover().await.unwrap().len(), 2);
        assert_eq!(
            producer.resolve_excluded().await.unwrap(),
            Some(
                tree.path()
                    .canonicalize()
                    .unwrap()
                    .join("sub/not-yet/out")
            )
        );
    }

    #[tokio::test]
    async fn test_excluding_the_source_root_fails() {
        let tree = fixture_tree();

        let producer = TemplateTreeProducer::new(tree.path(), "sql")
            .excluding(tree.path().join("sub").join(".."));

        let err = producer.discover().await.unwrap_err();
        assert!(matches!(err, ReplicationError::Traversal { .. }));
    }
}
