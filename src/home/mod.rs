//! Toolchain home resolution
//!
//! A home is either a development checkout (carries a `.devroot` marker
//! left by the toolchain build) or an unpacked distribution. When neither
//! an explicit probe path nor a dev checkout is usable, resolution falls
//! back to unpacking the versioned distribution through the artifact
//! resolver; repeating that resolution for the same version is a cache hit.

use std::path::{Path, PathBuf};

use crate::resolver::{ArtifactResolver, ResolverError};

/// Marker file present at the root of a development checkout
pub const DEV_ROOT_MARKER: &str = ".devroot";

/// Toolchain home resolution errors
#[derive(Debug, thiserror::Error)]
pub enum HomeError {
    /// Path exists but does not look like a toolchain home
    #[error("not a toolchain home: {path} ({reason})")]
    Invalid { path: String, reason: String },

    /// Distribution fallback failed; the resolver's failure propagates
    #[error("toolchain home unresolvable: {0}")]
    Unresolved(#[from] ResolverError),
}

/// A resolved toolchain home
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainHome {
    path: PathBuf,
    dev: bool,
}

impl ToolchainHome {
    /// Validate `path` as a home. A valid home carries a `lib/` directory
    /// with the runtime archives and a `bin/` directory with the toolchain
    /// entry points.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, HomeError> {
        let path = path.into();
        for required in ["lib", "bin"] {
            if !path.join(required).is_dir() {
                return Err(HomeError::Invalid {
                    path: path.display().to_string(),
                    reason: format!("missing {}/ directory", required),
                });
            }
        }
        let dev = path.join(DEV_ROOT_MARKER).is_file();
        Ok(Self { path, dev })
    }

    /// Construct without probing the filesystem, for callers that have
    /// already validated the layout.
    pub fn assume(path: impl Into<PathBuf>, dev: bool) -> Self {
        Self {
            path: path.into(),
            dev,
        }
    }

    /// Probe for an already-installed home. Returns `None` when the probe
    /// path is absent or does not validate; the caller decides whether to
    /// fall back to a distribution.
    pub fn find(probe: Option<&Path>) -> Option<Self> {
        probe.and_then(|p| Self::new(p).ok())
    }

    /// Locate a development checkout, or resolve and unpack the versioned
    /// distribution as a fallback. The fallback is idempotent: the
    /// resolver treats an already-unpacked distribution as a cache hit.
    pub fn find_or_resolve(
        probe: Option<&Path>,
        resolver: &dyn ArtifactResolver,
        version: &str,
    ) -> Result<Self, HomeError> {
        if let Some(home) = Self::find(probe) {
            if home.is_dev() {
                return Ok(home);
            }
        }
        let unpacked = resolver.resolve_and_unpack_dist(version)?;
        Self::new(unpacked)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this home is a development checkout
    pub fn is_dev(&self) -> bool {
        self.dev
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.path.join("lib")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.path.join("bin")
    }
}
