//! Build configuration for the remote test build
//!
//! The configuration is assembled once per test-run invocation from layered
//! sources, frozen by the builder, and consumed by the compiler and launch
//! orchestration. See `assembler` for the layering rules.

mod build;
mod layers;
mod target;

pub use build::{BuildConfig, BuildConfigBuilder, ClasspathEntry};
pub use layers::{
    parse_properties, read_config_file, read_properties_file, ConfigOrigin, ConfigSource,
    ProjectConfig, PROJECT_CONFIG_NAME, PROJECT_PROPERTIES_NAME,
};
pub use target::{Arch, Os};

use std::path::PathBuf;

/// Configuration errors
///
/// All of these are fatal to the whole run and surface before any remote
/// process is started.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An explicitly-named override file does not exist
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// File could not be read
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    /// File could not be parsed
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// Unknown OS or architecture token
    #[error("unrecognized {kind} value: {token} (expected one of: {allowed})")]
    InvalidEnumValue {
        kind: &'static str,
        token: String,
        allowed: &'static str,
    },

    /// The builder was frozen without a toolchain home
    #[error("toolchain home not set on build configuration")]
    MissingHome,
}
