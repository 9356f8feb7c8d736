//! Mock collaborators
//!
//! In-process stand-ins for every external boundary the bridge consumes:
//! compiler, remote test client, remote process, artifact resolver, and
//! the signing/device catalogs, plus recording listeners and reporters.
//! All of them support failure injection so error paths can be driven
//! deterministically from tests.

mod client;
mod compiler;
mod fixtures;
mod process;
mod recording;

pub use client::{ClientLog, MockTestClient, TestOutcome};
pub use compiler::{BuildRecord, CompilerLog, MockCompiler};
pub use fixtures::{console_config, ios_config, simulator_config};
pub use process::{MockProcess, MockProcessState};
pub use recording::{EventLog, RecordingListener, RecordingReporter, ReportedCall, SeenEvent};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::Arch;
use crate::device::{DeviceCatalog, DeviceType};
use crate::resolver::{ArtifactResolver, ResolverError};
use crate::signing::{ProvisioningProfile, SigningCatalog, SigningIdentity};

/// Resolver that fabricates artifact paths under a fixed root and serves
/// an optional preconfigured distribution directory
pub struct MockResolver {
    root: PathBuf,
    dist: Option<PathBuf>,
    dist_calls: AtomicUsize,
}

impl MockResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dist: None,
            dist_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_dist(&mut self, path: &Path) {
        self.dist = Some(path.to_path_buf());
    }

    /// How many distribution resolutions were requested
    pub fn dist_resolutions(&self) -> usize {
        self.dist_calls.load(Ordering::SeqCst)
    }
}

impl ArtifactResolver for MockResolver {
    fn resolve_artifact(&self, coordinate: &str) -> Result<PathBuf, ResolverError> {
        let parts: Vec<&str> = coordinate.split(':').collect();
        let [_, artifact, version] = parts.as_slice() else {
            return Err(ResolverError::MalformedCoordinate(coordinate.to_string()));
        };
        Ok(self.root.join(format!("{}-{}.jar", artifact, version)))
    }

    fn resolve_and_unpack_dist(&self, version: &str) -> Result<PathBuf, ResolverError> {
        self.dist_calls.fetch_add(1, Ordering::SeqCst);
        self.dist
            .clone()
            .ok_or_else(|| ResolverError::DistNotFound {
                version: version.to_string(),
                path: "<unconfigured>".to_string(),
            })
    }
}

/// Signing catalog with configurable candidates
#[derive(Debug, Clone, Default)]
pub struct MockSigningCatalog {
    pub identities: Vec<SigningIdentity>,
    pub profiles: Vec<ProvisioningProfile>,
}

impl MockSigningCatalog {
    pub fn with_default_candidates() -> Self {
        Self {
            identities: vec![SigningIdentity {
                name: "iPhone Developer: Unit Test".to_string(),
                fingerprint: "AA11BB22CC33".to_string(),
            }],
            profiles: vec![ProvisioningProfile {
                name: "AVM Test Profile".to_string(),
                uuid: "0000-1111-2222".to_string(),
            }],
        }
    }
}

impl SigningCatalog for MockSigningCatalog {
    fn identities(&self) -> Vec<SigningIdentity> {
        self.identities.clone()
    }

    fn profiles(&self) -> Vec<ProvisioningProfile> {
        self.profiles.clone()
    }
}

/// Device catalog with configurable devices
#[derive(Debug, Clone, Default)]
pub struct MockDeviceCatalog {
    pub devices: Vec<DeviceType>,
}

impl MockDeviceCatalog {
    pub fn with_default_devices() -> Self {
        Self {
            devices: vec![
                DeviceType {
                    name: "iPhone-15".to_string(),
                    sdk_version: "17.4".to_string(),
                    archs: vec![Arch::X86_64, Arch::Arm64],
                },
                DeviceType {
                    name: "iPhone-16".to_string(),
                    sdk_version: "18.0".to_string(),
                    archs: vec![Arch::X86_64, Arch::Arm64],
                },
                DeviceType {
                    name: "iPhone-4S".to_string(),
                    sdk_version: "9.3".to_string(),
                    archs: vec![Arch::Thumbv7],
                },
            ],
        }
    }
}

impl DeviceCatalog for MockDeviceCatalog {
    fn list(&self) -> Vec<DeviceType> {
        self.devices.clone()
    }
}
