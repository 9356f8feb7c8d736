//! Launch parameter derivation
//!
//! Launch parameters vary by target kind, so they are a tagged variant the
//! compiler pattern-matches on, not a hierarchy. Only the simulator
//! variant carries a selectable device type.

use crate::config::{Arch, BuildConfig, Os};
use crate::device::{best_device, find_device, DeviceCatalog, DeviceError, DeviceType};
use crate::options::RunOptions;

/// Argument appended when server-side diagnostic logging is requested
pub const SERVER_DEBUG_ARG: &str = "-rvm:Davm.debug=true";

/// Launch derivation errors
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Target-specific launch parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchParameters {
    /// Console executable, launched directly
    Console { args: Vec<String> },

    /// Simulator launch; the device type is selectable
    Simulator {
        device_type: Option<DeviceType>,
        args: Vec<String>,
    },

    /// Physical device launch; device selection stays with the remote
    /// launch default
    Device { args: Vec<String> },
}

impl LaunchParameters {
    /// The variant for a target. iOS on x86_64 runs in the simulator;
    /// other iOS architectures launch on a device.
    pub fn for_target(os: Os, arch: Arch) -> Self {
        match (os, arch) {
            (Os::Ios, Arch::X86_64) => LaunchParameters::Simulator {
                device_type: None,
                args: Vec::new(),
            },
            (Os::Ios, _) => LaunchParameters::Device { args: Vec::new() },
            _ => LaunchParameters::Console { args: Vec::new() },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LaunchParameters::Console { .. } => "console",
            LaunchParameters::Simulator { .. } => "simulator",
            LaunchParameters::Device { .. } => "device",
        }
    }

    pub fn args(&self) -> &[String] {
        match self {
            LaunchParameters::Console { args }
            | LaunchParameters::Simulator { args, .. }
            | LaunchParameters::Device { args } => args,
        }
    }

    fn args_mut(&mut self) -> &mut Vec<String> {
        match self {
            LaunchParameters::Console { args }
            | LaunchParameters::Simulator { args, .. }
            | LaunchParameters::Device { args } => args,
        }
    }

    pub fn device_type(&self) -> Option<&DeviceType> {
        match self {
            LaunchParameters::Simulator { device_type, .. } => device_type.as_ref(),
            _ => None,
        }
    }
}

/// Derive launch parameters for a frozen configuration.
///
/// Device selection policy: an explicit device name resolves against the
/// enumerated catalog and fails fast when absent; otherwise a 64-bit
/// simulator target picks the best available device automatically, and any
/// other target leaves selection to the remote launch default.
pub fn derive_launch_parameters(
    config: &BuildConfig,
    options: &RunOptions,
    devices: &dyn DeviceCatalog,
) -> Result<LaunchParameters, LaunchError> {
    let mut params = LaunchParameters::for_target(config.os(), config.arch());

    if options.server_logging {
        params.args_mut().push(SERVER_DEBUG_ARG.to_string());
    }

    if let LaunchParameters::Simulator { device_type, .. } = &mut params {
        if let Some(name) = options.device_name.as_deref() {
            *device_type = Some(find_device(devices, name)?);
        } else if config.arch() == Arch::X86_64 {
            *device_type = best_device(devices, config.arch());
        }
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDeviceCatalog;

    #[test]
    fn test_variant_for_target() {
        assert_eq!(
            LaunchParameters::for_target(Os::Ios, Arch::X86_64).kind(),
            "simulator"
        );
        assert_eq!(
            LaunchParameters::for_target(Os::Ios, Arch::Arm64).kind(),
            "device"
        );
        assert_eq!(
            LaunchParameters::for_target(Os::Linux, Arch::X86_64).kind(),
            "console"
        );
    }

    #[test]
    fn test_server_logging_appends_diagnostic_arg() {
        let catalog = MockDeviceCatalog::default();
        let config = crate::mock::console_config();
        let options = RunOptions {
            server_logging: true,
            ..Default::default()
        };

        let params = derive_launch_parameters(&config, &options, &catalog).unwrap();
        assert_eq!(params.args(), [SERVER_DEBUG_ARG]);
    }

    #[test]
    fn test_explicit_device_resolution() {
        let catalog = MockDeviceCatalog::with_default_devices();
        let config = crate::mock::simulator_config();
        let options = RunOptions {
            device_name: Some("iPhone-15".to_string()),
            ..Default::default()
        };

        let params = derive_launch_parameters(&config, &options, &catalog).unwrap();
        assert_eq!(params.device_type().unwrap().name, "iPhone-15");
    }

    #[test]
    fn test_unknown_device_fails_fast() {
        let catalog = MockDeviceCatalog::with_default_devices();
        let config = crate::mock::simulator_config();
        let options = RunOptions {
            device_name: Some("iPad-Imaginary".to_string()),
            ..Default::default()
        };

        let err = derive_launch_parameters(&config, &options, &catalog).unwrap_err();
        assert!(err.to_string().contains("iPad-Imaginary"));
    }

    #[test]
    fn test_automatic_best_device_for_64bit_simulator() {
        let catalog = MockDeviceCatalog::with_default_devices();
        let config = crate::mock::simulator_config();
        let options = RunOptions::default();

        let params = derive_launch_parameters(&config, &options, &catalog).unwrap();
        assert_eq!(params.device_type().unwrap().name, "iPhone-16");
    }

    #[test]
    fn test_console_target_has_no_device() {
        let catalog = MockDeviceCatalog::with_default_devices();
        let config = crate::mock::console_config();
        let options = RunOptions::default();

        let params = derive_launch_parameters(&config, &options, &catalog).unwrap();
        assert!(params.device_type().is_none());
    }
}
