//! Simulator device-type enumeration and selection
//!
//! Device types are enumerated by an external catalog (or a TOML inventory
//! file). Explicit selection is by name and fails fast; automatic
//! selection picks the best candidate deterministically: highest SDK
//! first, then stable name order.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Arch;

/// Device selection errors
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("no device named '{name}' (known devices: {})", known.join(", "))]
    DeviceNotFound { name: String, known: Vec<String> },

    #[error("failed to read device inventory {path}: {message}")]
    Inventory { path: String, message: String },
}

/// A simulator device type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceType {
    /// Device name (e.g., "iPhone-16")
    pub name: String,

    /// SDK version the device runtime provides (e.g., "18.0")
    pub sdk_version: String,

    /// Architectures the device can execute
    pub archs: Vec<Arch>,
}

impl DeviceType {
    pub fn supports(&self, arch: Arch) -> bool {
        self.archs.contains(&arch)
    }
}

/// Enumerates the device types available on this host
pub trait DeviceCatalog {
    fn list(&self) -> Vec<DeviceType>;
}

/// Resolve a device type by exact name.
pub fn find_device(catalog: &dyn DeviceCatalog, name: &str) -> Result<DeviceType, DeviceError> {
    let devices = catalog.list();
    devices
        .iter()
        .find(|d| d.name == name)
        .cloned()
        .ok_or_else(|| DeviceError::DeviceNotFound {
            name: name.to_string(),
            known: devices.iter().map(|d| d.name.clone()).collect(),
        })
}

/// Pick the best device supporting `arch`: highest SDK version, then
/// lexicographically greatest name as the stable tie-break. Returns `None`
/// when the catalog has no matching device; launch then falls back to the
/// remote default.
pub fn best_device(catalog: &dyn DeviceCatalog, arch: Arch) -> Option<DeviceType> {
    catalog
        .list()
        .into_iter()
        .filter(|d| d.supports(arch))
        .max_by(|a, b| {
            sdk_key(&a.sdk_version)
                .cmp(&sdk_key(&b.sdk_version))
                .then_with(|| a.name.cmp(&b.name))
        })
}

/// Numeric sort key for a dotted SDK version ("18.0" sorts above "9.3")
fn sdk_key(version: &str) -> Vec<u32> {
    version
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

/// Catalog over a fixed device list
#[derive(Debug, Clone, Default)]
pub struct StaticDeviceCatalog {
    pub devices: Vec<DeviceType>,
}

impl DeviceCatalog for StaticDeviceCatalog {
    fn list(&self) -> Vec<DeviceType> {
        self.devices.clone()
    }
}

/// Device inventory file (`devices.toml`)
#[derive(Debug, Deserialize)]
struct DeviceInventory {
    #[serde(default)]
    devices: Vec<DeviceType>,
}

/// Catalog backed by a TOML inventory file
pub struct FileDeviceCatalog {
    devices: Vec<DeviceType>,
}

impl FileDeviceCatalog {
    pub fn load(path: &Path) -> Result<Self, DeviceError> {
        let text = std::fs::read_to_string(path).map_err(|e| DeviceError::Inventory {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let inventory: DeviceInventory =
            toml::from_str(&text).map_err(|e| DeviceError::Inventory {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            devices: inventory.devices,
        })
    }
}

impl DeviceCatalog for FileDeviceCatalog {
    fn list(&self) -> Vec<DeviceType> {
        self.devices.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct FixedCatalog(Vec<DeviceType>);

    impl DeviceCatalog for FixedCatalog {
        fn list(&self) -> Vec<DeviceType> {
            self.0.clone()
        }
    }

    fn catalog() -> FixedCatalog {
        FixedCatalog(vec![
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
        ])
    }

    #[test]
    fn test_find_device() {
        let found = find_device(&catalog(), "iPhone-15").unwrap();
        assert_eq!(found.sdk_version, "17.4");
    }

    #[test]
    fn test_find_device_not_found() {
        let err = find_device(&catalog(), "iPad-Pro").unwrap_err();
        assert!(err.to_string().contains("iPad-Pro"));
        assert!(err.to_string().contains("iPhone-16"));
    }

    #[test]
    fn test_best_device_prefers_highest_sdk() {
        let best = best_device(&catalog(), Arch::X86_64).unwrap();
        assert_eq!(best.name, "iPhone-16");
    }

    #[test]
    fn test_best_device_filters_arch() {
        let best = best_device(&catalog(), Arch::Thumbv7).unwrap();
        assert_eq!(best.name, "iPhone-4S");
    }

    #[test]
    fn test_best_device_none() {
        let empty = FixedCatalog(vec![]);
        assert!(best_device(&empty, Arch::X86_64).is_none());
    }

    #[test]
    fn test_sdk_ordering_is_numeric() {
        assert!(sdk_key("18.0") > sdk_key("9.3"));
    }

    #[test]
    fn test_file_catalog() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[[devices]]").unwrap();
        writeln!(temp, "name = \"iPhone-16\"").unwrap();
        writeln!(temp, "sdk_version = \"18.0\"").unwrap();
        writeln!(temp, "archs = [\"x86_64\", \"arm64\"]").unwrap();

        let catalog = FileDeviceCatalog::load(temp.path()).unwrap();
        assert_eq!(catalog.list().len(), 1);
        assert!(catalog.list()[0].supports(Arch::Arm64));
    }
}
