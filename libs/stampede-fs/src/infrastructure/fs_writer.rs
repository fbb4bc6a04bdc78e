//! Filesystem Artifact Writer
//!
//! This module implements the `ArtifactWriter` port on the local filesystem.
//! It creates destination directories on demand and converts I/O errors to
//! domain errors carrying the offending path.

use std::path::{Component, Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, debug_span, error, info, warn, Instrument};
use uuid::Uuid;

use stampede_domain::{ArtifactSpec, ArtifactWriter, ReplicationError};

/// Filesystem implementation of the `ArtifactWriter` port
///
/// Every destination is resolved under `target_root`. Files are written to a
/// hidden temp file next to their final location and renamed into place, so a
/// reader never sees a half-written artifact under its final name.
///
/// ## Error Handling
///
/// All `std::io::Error`s are converted to `ReplicationError::Io` with the
/// path that failed.
#[derive(Debug, Clone)]
pub struct FsArtifactWriter {
    target_root: PathBuf,
}

impl FsArtifactWriter {
    /// Create a new writer rooted at `target_root`
    ///
    /// The root itself is created lazily by the first `ensure_dir` or `write`.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use stampede_fs::FsArtifactWriter;
    ///
    /// let writer = FsArtifactWriter::new("models");
    /// assert_eq!(writer.target_root().to_str(), Some("models"));
    /// ```
    pub fn new(target_root: impl Into<PathBuf>) -> Self {
        let target_root = target_root.into();
        info!(target_root = %target_root.display(), "Initializing FsArtifactWriter");
        Self { target_root }
    }

    /// Get the target root
    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    /// Resolve a relative destination under the target root
    ///
    /// Absolute paths and `..` components are rejected so that no artifact
    /// escapes the target root.
    fn resolve(&self, destination: &Path) -> Result<PathBuf, ReplicationError> {
        let escapes = destination
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if escapes {
            return Err(ReplicationError::io(
                destination,
                "destination must be relative to the target root",
            ));
        }

        Ok(self.target_root.join(destination))
    }

    /// Name of the temp file an artifact is staged in before the rename
    fn temp_name(name: &str) -> String {
        format!(".{}.{}.tmp", name, Uuid::now_v7())
    }
}

async fn create_dir(dir: &Path) -> Result<(), ReplicationError> {
    // create_dir_all treats an already existing directory as success
    tokio::fs::create_dir_all(dir).await.map_err(|err| {
        error!(dir = %dir.display(), error = %err, "Failed to create directory");
        ReplicationError::io(dir, err)
    })
}

async fn write_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(content).await?;
    file.sync_all().await
}

impl ArtifactWriter for FsArtifactWriter {
    fn ensure_dir(
        &self,
        destination: &Path,
    ) -> impl std::future::Future<Output = Result<PathBuf, ReplicationError>> + Send {
        let resolved = self.resolve(destination);
        let span = debug_span!("ensure_dir", destination = %destination.display());

        async move {
            let dir = resolved?;
            create_dir(&dir).await?;
            debug!(dir = %dir.display(), "Directory ready");
            Ok(dir)
        }
        .instrument(span)
    }

    fn write(
        &self,
        artifact: &ArtifactSpec,
    ) -> impl std::future::Future<Output = Result<PathBuf, ReplicationError>> + Send {
        let resolved = self.resolve(&artifact.destination);
        let name = artifact.name.clone();
        let content = artifact.content.clone();
        let span = debug_span!(
            "write",
            artifact = %artifact.relative_path().display(),
            size = content.len()
        );

        async move {
            let dir = resolved?;

            let components: Vec<_> = Path::new(&name).components().collect();
            if !matches!(components.as_slice(), [Component::Normal(_)]) {
                return Err(ReplicationError::io(dir.join(&name), "invalid artifact name"));
            }

            create_dir(&dir).await?;

            let path = dir.join(&name);
            let temp = dir.join(Self::temp_name(&name));

            let staged = match write_file(&temp, &content).await {
                Ok(()) => tokio::fs::rename(&temp, &path).await,
                Err(err) => Err(err),
            };

            match staged {
                Ok(()) => {
                    debug!(path = %path.display(), "Artifact written");
                    Ok(path)
                }
                Err(err) => {
                    error!(path = %path.display(), error = %err, "Failed to write artifact");
                    if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                        if cleanup.kind() != std::io::ErrorKind::NotFound {
                            warn!(temp = %temp.display(), error = %cleanup, "Failed to remove temp file");
                        }
                    }
                    Err(ReplicationError::io(&path, err))
                }
            }
        }
        .instrument(span)
    }
}
