//! Compiler/launcher boundary
//!
//! The AOT compiler and its launch helpers are external tools reached
//! through one trait. The build step always runs to completion before any
//! launch; launching is asynchronous and hands back a live process plus
//! its console stream.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::config::BuildConfig;
use crate::launch::LaunchParameters;
use crate::process::RemoteProcess;

/// Compiler errors; these surface as run failures on the host
#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    #[error("compiler build failed with status {status}")]
    Build { status: i32 },

    #[error("failed to invoke {tool}: {source}")]
    Io { tool: String, source: io::Error },

    #[error("launch failed: {0}")]
    Launch(String),
}

/// A launched remote process and its captured console stream
pub struct Launched {
    pub process: Box<dyn RemoteProcess>,
    pub console: Option<Box<dyn Read + Send>>,
}

/// The external compiler/launcher boundary
pub trait Compiler {
    /// Compile the application for the configured target. Blocks until
    /// the build completes.
    fn build(&self, config: &BuildConfig) -> Result<(), CompilerError>;

    /// Launch the built artifact. Returns immediately with a live
    /// process; the caller owns its lifecycle.
    fn launch(
        &self,
        config: &BuildConfig,
        params: &LaunchParameters,
    ) -> Result<Launched, CompilerError>;
}

/// Compiler backed by the toolchain binaries under the resolved home
///
/// `avm-build` compiles; `avm-sim-launch` and `avm-device-launch` start
/// the artifact on mobile targets, while console artifacts run directly.
pub struct ToolchainCompiler {
    build_dir: PathBuf,
    executable: String,
}

impl ToolchainCompiler {
    pub fn new(build_dir: impl Into<PathBuf>, executable: impl Into<String>) -> Self {
        Self {
            build_dir: build_dir.into(),
            executable: executable.into(),
        }
    }

    fn artifact_path(&self) -> PathBuf {
        self.build_dir.join(&self.executable)
    }

    /// Arguments handed to `avm-build`
    fn build_args(&self, config: &BuildConfig) -> Vec<String> {
        let mut args = vec![
            "--os".to_string(),
            config.os().to_string(),
            "--arch".to_string(),
            config.arch().to_string(),
            "--out".to_string(),
            self.artifact_path().display().to_string(),
        ];

        if let Some(cache_dir) = config.cache_dir() {
            args.push("--cache-dir".to_string());
            args.push(cache_dir.display().to_string());
        }
        if config.skip_install() {
            args.push("--skip-install".to_string());
        }
        if config.use_debug_libs() {
            args.push("--use-debug-libs".to_string());
        }
        if config.dump_intermediates() {
            args.push("--dump-intermediates".to_string());
        }

        if config.skip_signing() {
            args.push("--skip-signing".to_string());
        } else {
            if let Some(identity) = config.sign_identity() {
                args.push("--sign-identity".to_string());
                args.push(identity.fingerprint.clone());
            }
            if let Some(profile) = config.provisioning_profile() {
                args.push("--provisioning-profile".to_string());
                args.push(profile.uuid.clone());
            }
        }

        for entry in config.classpath() {
            args.push("-cp".to_string());
            args.push(entry.to_string());
        }
        for class_name in config.force_link_classes() {
            args.push("--force-link".to_string());
            args.push(class_name.clone());
        }

        args
    }

    /// The command line that launches the built artifact
    fn launch_command(&self, config: &BuildConfig, params: &LaunchParameters) -> (PathBuf, Vec<String>) {
        let artifact = self.artifact_path().display().to_string();
        match params {
            LaunchParameters::Console { args } => (self.artifact_path(), args.clone()),
            LaunchParameters::Simulator { device_type, args } => {
                let mut launch_args = Vec::new();
                if let Some(device) = device_type {
                    launch_args.push("--device-type".to_string());
                    launch_args.push(device.name.clone());
                }
                launch_args.push(artifact);
                launch_args.extend(args.iter().cloned());
                (config.home().bin_dir().join("avm-sim-launch"), launch_args)
            }
            LaunchParameters::Device { args } => {
                let mut launch_args = vec![artifact];
                launch_args.extend(args.iter().cloned());
                (
                    config.home().bin_dir().join("avm-device-launch"),
                    launch_args,
                )
            }
        }
    }
}

impl Compiler for ToolchainCompiler {
    fn build(&self, config: &BuildConfig) -> Result<(), CompilerError> {
        let tool = config.home().bin_dir().join("avm-build");
        let status = Command::new(&tool)
            .args(self.build_args(config))
            .status()
            .map_err(|e| CompilerError::Io {
                tool: tool.display().to_string(),
                source: e,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(CompilerError::Build {
                status: status.code().unwrap_or(-1),
            })
        }
    }

    fn launch(
        &self,
        config: &BuildConfig,
        params: &LaunchParameters,
    ) -> Result<Launched, CompilerError> {
        let (tool, args) = self.launch_command(config, params);
        let mut child = Command::new(&tool)
            .args(args)
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| CompilerError::Io {
                tool: tool.display().to_string(),
                source: e,
            })?;

        let console = child
            .stdout
            .take()
            .map(|stdout| Box::new(stdout) as Box<dyn Read + Send>);

        Ok(Launched {
            process: Box::new(child),
            console,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceType;
    use crate::mock::{ios_config, simulator_config};

    #[test]
    fn test_build_args_cover_target_and_classpath() {
        let config = ios_config();
        let compiler = ToolchainCompiler::new("/tmp/build", "tests-app");
        let args = compiler.build_args(&config);

        let joined = args.join(" ");
        assert!(joined.contains("--os ios"));
        assert!(joined.contains("--arch arm64"));
        assert!(joined.contains("--skip-install"));
        for entry in config.classpath() {
            assert!(joined.contains(&entry.to_string()));
        }
    }

    #[test]
    fn test_build_args_signing() {
        let config = ios_config();
        let compiler = ToolchainCompiler::new("/tmp/build", "tests-app");
        let joined = compiler.build_args(&config).join(" ");
        assert!(joined.contains("--sign-identity"));
        assert!(joined.contains("--provisioning-profile"));
        assert!(!joined.contains("--skip-signing"));
    }

    #[test]
    fn test_console_launch_runs_artifact_directly() {
        let config = crate::mock::console_config();
        let compiler = ToolchainCompiler::new("/tmp/build", "tests-app");
        let params = LaunchParameters::Console { args: vec![] };

        let (tool, args) = compiler.launch_command(&config, &params);
        assert_eq!(tool, PathBuf::from("/tmp/build/tests-app"));
        assert!(args.is_empty());
    }

    #[test]
    fn test_simulator_launch_passes_device_type() {
        let config = simulator_config();
        let compiler = ToolchainCompiler::new("/tmp/build", "tests-app");
        let params = LaunchParameters::Simulator {
            device_type: Some(DeviceType {
                name: "iPhone-16".to_string(),
                sdk_version: "18.0".to_string(),
                archs: vec![crate::config::Arch::X86_64],
            }),
            args: vec!["-rvm:Davm.debug=true".to_string()],
        };

        let (tool, args) = compiler.launch_command(&config, &params);
        assert!(tool.ends_with("avm-sim-launch"));
        assert_eq!(args[0], "--device-type");
        assert_eq!(args[1], "iPhone-16");
        assert!(args.contains(&"-rvm:Davm.debug=true".to_string()));
    }
}
