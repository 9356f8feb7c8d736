//! Run option surface
//!
//! Every ambient option the bridge recognizes lives on one explicit struct
//! that is constructed once and handed to the assembler. `from_env` is the
//! single place environment variables are read; nothing else in the system
//! consults the environment.

use std::path::PathBuf;

pub const ENV_OS: &str = "AVM_TEST_OS";
pub const ENV_ARCH: &str = "AVM_TEST_ARCH";
pub const ENV_CONFIG_FILE: &str = "AVM_TEST_CONFIG_FILE";
pub const ENV_PROPERTIES_FILE: &str = "AVM_TEST_PROPERTIES_FILE";
pub const ENV_SIGN_IDENTITY: &str = "AVM_TEST_SIGN_IDENTITY";
pub const ENV_PROVISIONING_PROFILE: &str = "AVM_TEST_PROVISIONING_PROFILE";
pub const ENV_SKIP_SIGNING: &str = "AVM_TEST_SKIP_SIGNING";
pub const ENV_DEVICE_NAME: &str = "AVM_TEST_DEVICE_NAME";
pub const ENV_CACHE_DIR: &str = "AVM_TEST_CACHE_DIR";
pub const ENV_DEBUG_LOGGING: &str = "AVM_TEST_DEBUG_LOGGING";
pub const ENV_SERVER_LOGGING: &str = "AVM_TEST_SERVER_LOGGING";
pub const ENV_RUN_ARGS: &str = "AVM_TEST_RUN_ARGS";
pub const ENV_USE_DEBUG_LIBS: &str = "AVM_TEST_USE_DEBUG_LIBS";

/// The recognized option surface for one test-run invocation
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Target OS override (e.g., "ios")
    pub os: Option<String>,

    /// Target architecture override (e.g., "x86_64")
    pub arch: Option<String>,

    /// Explicit config file; must exist when named
    pub config_file: Option<PathBuf>,

    /// Explicit properties file; must exist when named
    pub properties_file: Option<PathBuf>,

    /// Signing identity name, looked up against the enumerated candidates
    pub sign_identity: Option<String>,

    /// Provisioning profile name, looked up against the enumerated candidates
    pub provisioning_profile: Option<String>,

    /// Skip signing entirely (identity/profile lookup is bypassed)
    pub skip_signing: bool,

    /// Explicit simulator device name
    pub device_name: Option<String>,

    /// Cache directory override
    pub cache_dir: Option<PathBuf>,

    /// Emit debug-level log lines
    pub debug_logging: bool,

    /// Ask the remote test server for diagnostic logging
    pub server_logging: bool,

    /// Extra runtime launch arguments, one shell-style string
    pub run_args: Option<String>,

    /// Link debug runtime libraries (development toolchain homes only)
    pub use_debug_libs: bool,
}

impl RunOptions {
    /// Read the documented `AVM_TEST_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            os: var(ENV_OS),
            arch: var(ENV_ARCH),
            config_file: var(ENV_CONFIG_FILE).map(PathBuf::from),
            properties_file: var(ENV_PROPERTIES_FILE).map(PathBuf::from),
            sign_identity: var(ENV_SIGN_IDENTITY),
            provisioning_profile: var(ENV_PROVISIONING_PROFILE),
            skip_signing: flag(ENV_SKIP_SIGNING),
            device_name: var(ENV_DEVICE_NAME),
            cache_dir: var(ENV_CACHE_DIR).map(PathBuf::from),
            debug_logging: flag(ENV_DEBUG_LOGGING),
            server_logging: flag(ENV_SERVER_LOGGING),
            run_args: var(ENV_RUN_ARGS),
            use_debug_libs: flag(ENV_USE_DEBUG_LIBS),
        }
    }

    /// The extra runtime launch arguments, split shell-style.
    pub fn split_run_args(&self) -> Vec<String> {
        split_args(self.run_args.as_deref().unwrap_or(""))
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn flag(name: &str) -> bool {
    matches!(
        std::env::var(name).ok().as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

/// Split a shell-style argument string.
///
/// Whitespace separates arguments; single and double quotes group; a
/// backslash escapes the next character outside single quotes.
pub fn split_args(raw: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut quote: Option<char> = None;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some('\'') => {
                if c == '\'' {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            Some('"') => match c {
                '"' => quote = None,
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                _ => current.push(c),
            },
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_arg = true;
                }
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                        in_arg = true;
                    }
                }
                c if c.is_whitespace() => {
                    if in_arg {
                        args.push(std::mem::take(&mut current));
                        in_arg = false;
                    }
                }
                _ => {
                    current.push(c);
                    in_arg = true;
                }
            },
            Some(_) => unreachable!("quote only ever holds '\\'' or '\"'"),
        }
    }

    if in_arg {
        args.push(current);
    }

    args
}
