//! Layered configuration sources with provenance
//!
//! A build configuration is layered from built-in defaults, a discovered
//! project file, and an optional explicitly-named override file. Each
//! contributing file is recorded with a SHA-256 digest of its raw bytes so
//! identical inputs are provably identical runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::ConfigError;

/// File name probed in the project directory for the config layer
pub const PROJECT_CONFIG_NAME: &str = "avm.toml";

/// File name probed in the project directory for the properties layer
pub const PROJECT_PROPERTIES_NAME: &str = "avm.properties";

/// Origin of a configuration source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    /// Compiled-in defaults
    Builtin,
    /// Auto-discovered in the project directory
    Discovered,
    /// Explicitly named override file
    Explicit,
    /// The run-option override surface
    Options,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (absent for builtin/options layers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (absent for builtin/options layers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ConfigSource {
    pub fn builtin() -> Self {
        Self {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }
    }

    pub fn options() -> Self {
        Self {
            origin: ConfigOrigin::Options,
            path: None,
            digest: None,
        }
    }

    pub fn file(origin: ConfigOrigin, path: &Path, digest: String) -> Self {
        Self {
            origin,
            path: Some(path.to_string_lossy().to_string()),
            digest: Some(digest),
        }
    }
}

/// Schema of a project config file (`avm.toml`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    /// Target OS token
    pub os: Option<String>,

    /// Target architecture token
    pub arch: Option<String>,

    /// Cache directory
    pub cache_dir: Option<String>,

    /// Classpath entries declared by the project. The assembler clears
    /// these before it builds the remote test classpath.
    #[serde(default)]
    pub classpath: Vec<String>,

    /// Extra forced-link class names
    #[serde(default)]
    pub force_link: Vec<String>,
}

/// Read and parse a TOML config file, returning the value and its digest.
pub fn read_config_file(path: &Path) -> Result<(ProjectConfig, String), ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let digest = digest_hex(&bytes);

    let text = String::from_utf8(bytes).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: format!("invalid UTF-8: {}", e),
    })?;

    let config = toml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    Ok((config, digest))
}

/// Read and parse a `key=value` properties file, returning the map and its
/// digest.
pub fn read_properties_file(path: &Path) -> Result<(BTreeMap<String, String>, String), ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let digest = digest_hex(&bytes);

    let text = String::from_utf8(bytes).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: format!("invalid UTF-8: {}", e),
    })?;

    Ok((parse_properties(&text), digest))
}

/// Parse `key=value` lines. Blank lines and lines starting with `#` or `!`
/// are skipped; whitespace around keys and values is trimmed.
pub fn parse_properties(text: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        if let Some(eq) = line.find('=') {
            let key = line[..eq].trim();
            let value = line[eq + 1..].trim();
            if !key.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_properties() {
        let props = parse_properties("# comment\na=1\n  b = two \n! note\nbad-line\nc=x=y\n");
        assert_eq!(props.get("a").map(String::as_str), Some("1"));
        assert_eq!(props.get("b").map(String::as_str), Some("two"));
        assert_eq!(props.get("c").map(String::as_str), Some("x=y"));
        assert_eq!(props.len(), 3);
    }

    #[test]
    fn test_read_config_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "os = \"ios\"").unwrap();
        writeln!(temp, "arch = \"x86_64\"").unwrap();
        writeln!(temp, "classpath = [\"libs/extra.jar\"]").unwrap();

        let (config, digest) = read_config_file(temp.path()).unwrap();
        assert_eq!(config.os.as_deref(), Some("ios"));
        assert_eq!(config.arch.as_deref(), Some("x86_64"));
        assert_eq!(config.classpath, vec!["libs/extra.jar"]);
        assert_eq!(digest.len(), 64);
    }

    #[test]
    fn test_digest_is_stable() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "os = \"linux\"").unwrap();

        let (_, first) = read_config_file(temp.path()).unwrap();
        let (_, second) = read_config_file(temp.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_properties_round_trip_through_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "avm.test.server.port=17777").unwrap();
        writeln!(temp, "target.os=ios").unwrap();

        let (props, digest) = read_properties_file(temp.path()).unwrap();
        assert_eq!(props.get("target.os").map(String::as_str), Some("ios"));
        assert_eq!(digest.len(), 64);
    }
}
