//! Target OS and architecture tokens

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Target operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Macosx,
    Ios,
}

impl Os {
    /// Mobile targets carry signing metadata and the mobile support
    /// libraries on the remote classpath.
    pub fn is_mobile(&self) -> bool {
        matches!(self, Os::Ios)
    }

    pub fn token(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Macosx => "macosx",
            Os::Ios => "ios",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Os {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux" => Ok(Os::Linux),
            "macosx" => Ok(Os::Macosx),
            "ios" => Ok(Os::Ios),
            _ => Err(ConfigError::InvalidEnumValue {
                kind: "os",
                token: s.to_string(),
                allowed: "linux, macosx, ios",
            }),
        }
    }
}

/// Target CPU architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X86_64,
    Arm64,
    Thumbv7,
}

impl Arch {
    pub fn is_64bit(&self) -> bool {
        matches!(self, Arch::X86_64 | Arch::Arm64)
    }

    pub fn token(&self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Arm64 => "arm64",
            Arch::Thumbv7 => "thumbv7",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Arch {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x86_64" => Ok(Arch::X86_64),
            "arm64" => Ok(Arch::Arm64),
            "thumbv7" => Ok(Arch::Thumbv7),
            _ => Err(ConfigError::InvalidEnumValue {
                kind: "arch",
                token: s.to_string(),
                allowed: "x86_64, arm64, thumbv7",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_round_trip() {
        for os in [Os::Linux, Os::Macosx, Os::Ios] {
            assert_eq!(os.token().parse::<Os>().unwrap(), os);
        }
    }

    #[test]
    fn test_unknown_os_token() {
        let err = "windows".parse::<Os>().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnumValue { kind: "os", .. }
        ));
    }

    #[test]
    fn test_unknown_arch_token() {
        let err = "sparc".parse::<Arch>().unwrap_err();
        assert!(err.to_string().contains("sparc"));
    }

    #[test]
    fn test_mobile_and_width() {
        assert!(Os::Ios.is_mobile());
        assert!(!Os::Linux.is_mobile());
        assert!(Arch::Arm64.is_64bit());
        assert!(!Arch::Thumbv7.is_64bit());
    }
}
