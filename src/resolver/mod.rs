//! Artifact resolver boundary
//!
//! Resolves `group:artifact:version` coordinates and unpacked toolchain
//! distributions against a local repository layout. Download and unpack
//! mechanics live outside this system; the local implementation only ever
//! serves what is already on disk, which also makes repeated resolution of
//! the same version a cache hit by construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::logger::Logger;

/// Resolver errors
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// Coordinate does not follow `group:artifact:version`
    #[error("malformed artifact coordinate: {0}")]
    MalformedCoordinate(String),

    /// Artifact is not present in the local repository
    #[error("artifact not found in local repository: {coordinate} (looked in {path})")]
    ArtifactNotFound { coordinate: String, path: String },

    /// No unpacked distribution for the requested version
    #[error("no unpacked distribution for version {version} (looked in {path})")]
    DistNotFound { version: String, path: String },
}

/// Resolves artifacts and toolchain distributions
pub trait ArtifactResolver {
    /// Resolve a `group:artifact:version` coordinate to an archive file.
    fn resolve_artifact(&self, coordinate: &str) -> Result<PathBuf, ResolverError>;

    /// Resolve the unpacked distribution directory for `version`.
    /// Idempotent: an already-unpacked distribution is a cache hit.
    fn resolve_and_unpack_dist(&self, version: &str) -> Result<PathBuf, ResolverError>;
}

/// Resolver over a local repository directory
///
/// Layout: `<root>/repo/<group>/<artifact>/<version>/<artifact>-<version>.jar`
/// for artifacts and `<root>/dist/avm-dist-<version>` for unpacked
/// distributions.
pub struct LocalRepoResolver {
    root: PathBuf,
    logger: Arc<dyn Logger>,
}

impl LocalRepoResolver {
    pub fn new(root: impl Into<PathBuf>, logger: Arc<dyn Logger>) -> Self {
        Self {
            root: root.into(),
            logger,
        }
    }

    fn artifact_path(&self, coordinate: &str) -> Result<PathBuf, ResolverError> {
        let parts: Vec<&str> = coordinate.split(':').collect();
        let [group, artifact, version] = parts.as_slice() else {
            return Err(ResolverError::MalformedCoordinate(coordinate.to_string()));
        };
        if group.is_empty() || artifact.is_empty() || version.is_empty() {
            return Err(ResolverError::MalformedCoordinate(coordinate.to_string()));
        }

        let mut path = self.root.join("repo");
        for segment in group.split('.') {
            path.push(segment);
        }
        path.push(artifact);
        path.push(version);
        path.push(format!("{}-{}.jar", artifact, version));
        Ok(path)
    }

    fn dist_path(&self, version: &str) -> PathBuf {
        self.root.join("dist").join(format!("avm-dist-{}", version))
    }
}

impl ArtifactResolver for LocalRepoResolver {
    fn resolve_artifact(&self, coordinate: &str) -> Result<PathBuf, ResolverError> {
        let path = self.artifact_path(coordinate)?;
        if path.is_file() {
            self.logger
                .debug(&format!("resolved {} -> {}", coordinate, path.display()));
            Ok(path)
        } else {
            Err(ResolverError::ArtifactNotFound {
                coordinate: coordinate.to_string(),
                path: path.display().to_string(),
            })
        }
    }

    fn resolve_and_unpack_dist(&self, version: &str) -> Result<PathBuf, ResolverError> {
        let path = self.dist_path(version);
        if path.is_dir() {
            self.logger
                .debug(&format!("distribution cache hit: {}", path.display()));
            Ok(path)
        } else {
            Err(ResolverError::DistNotFound {
                version: version.to_string(),
                path: path.display().to_string(),
            })
        }
    }
}

/// Install an archive into a local repository layout (test fixtures and
/// toolchain provisioning scripts use this).
pub fn repo_artifact_path(root: &Path, coordinate: &str) -> Option<PathBuf> {
    let logger = crate::logger::NullLogger::shared();
    LocalRepoResolver::new(root, logger)
        .artifact_path(coordinate)
        .ok()
}
