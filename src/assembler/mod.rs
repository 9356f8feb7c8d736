//! Classpath/config assembler
//!
//! Produces the build configuration for one test run from layered inputs:
//! compiled-in defaults, the discovered project files, the explicit
//! override files, and finally the run-option overrides. The remote test
//! classpath is assembled in a fixed order (test-server runtime first,
//! the target's support libraries, the host-supplied test classpath, then
//! the ambient runtime classpath), and every class scheduled to run is
//! registered as a forced-link root so dead-code elimination cannot strip
//! it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex_lite::Regex;

use crate::config::{BuildConfigBuilder, ClasspathEntry, ConfigError, Os};
use crate::discovery::TestsToRun;
use crate::home::{HomeError, ToolchainHome};
use crate::logger::Logger;
use crate::options::RunOptions;
use crate::resolver::{ArtifactResolver, ResolverError};
use crate::signing::{find_identity, find_profile, SigningCatalog, SigningError};

/// Artifact group of the toolchain runtime libraries
pub const ARTIFACT_GROUP: &str = "com.avm";

/// The remote test-support runtime
pub const TEST_SERVER_ARTIFACT: &str = "avm-test-server";

/// Support libraries added for mobile targets, in this relative order
pub const MOBILE_SUPPORT_ARTIFACTS: [&str; 3] = ["avm-rt", "avm-objc", "avm-cocoatouch"];

/// Indexed classpath property keys: `classPathUrl.0`, `classPathUrl.1`, ...
pub const CLASSPATH_URL_KEY_PREFIX: &str = "classPathUrl.";

/// Host-supplied test classpath
///
/// When the host runs un-forked it exposes its class-loading context's
/// search roots directly; when forked it hands over an indexed property
/// list instead.
#[derive(Debug, Clone)]
pub enum ClasspathSource {
    /// Search roots of the active class-loading context
    SearchRoots(Vec<PathBuf>),

    /// Indexed `classPathUrl.N` properties
    Indexed(BTreeMap<String, String>),
}

/// Assembly errors; all fatal before any remote process starts
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Home(#[from] HomeError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Signing(#[from] SigningError),
}

/// Assembles the build configuration from layered sources
pub struct ConfigAssembler<'a> {
    pub project_dir: &'a Path,
    pub options: &'a RunOptions,

    /// Explicit probe path for an installed toolchain home
    pub home_probe: Option<&'a Path>,

    /// Toolchain version used for distribution fallback and runtime
    /// artifact coordinates
    pub toolchain_version: &'a str,

    pub resolver: &'a dyn ArtifactResolver,
    pub signing: &'a dyn SigningCatalog,
    pub classpath_source: &'a ClasspathSource,

    /// Ambient build-tool runtime classpath
    pub runtime_classpath: &'a [PathBuf],

    pub logger: Arc<dyn Logger>,
}

impl ConfigAssembler<'_> {
    /// Produce the populated (not yet frozen) builder. The remote test
    /// client contributes its own settings before the caller freezes it.
    pub fn assemble(&self, tests_to_run: &TestsToRun) -> Result<BuildConfigBuilder, AssembleError> {
        let mut builder = BuildConfigBuilder::new();
        builder.logger(Arc::clone(&self.logger));

        self.resolve_home(&mut builder)?;
        self.layer_files(&mut builder)?;
        self.apply_option_overrides(&mut builder)?;
        self.select_signing(&mut builder)?;
        self.assemble_classpath(&mut builder)?;

        for class in tests_to_run.iter() {
            builder.add_force_link_class(&class.name);
        }
        builder.skip_install(true);

        Ok(builder)
    }

    fn resolve_home(&self, builder: &mut BuildConfigBuilder) -> Result<(), AssembleError> {
        let home =
            ToolchainHome::find_or_resolve(self.home_probe, self.resolver, self.toolchain_version)?;
        if home.is_dev() {
            self.logger
                .debug(&format!("Using development toolchain at {}", home.path().display()));
            builder.use_debug_libs(self.options.use_debug_libs);
            builder.dump_intermediates(true);
        }
        builder.home(home);
        Ok(())
    }

    fn layer_files(&self, builder: &mut BuildConfigBuilder) -> Result<(), AssembleError> {
        builder.read_project_properties(self.project_dir)?;
        if let Some(path) = self.options.properties_file.as_deref() {
            self.logger
                .debug(&format!("Loading properties from {}", path.display()));
            builder.read_properties_file(path)?;
        }

        builder.read_project_config(self.project_dir)?;
        if let Some(path) = self.options.config_file.as_deref() {
            self.logger
                .debug(&format!("Loading config from {}", path.display()));
            builder.read_config_file(path)?;
        }
        Ok(())
    }

    fn apply_option_overrides(&self, builder: &mut BuildConfigBuilder) -> Result<(), AssembleError> {
        let mut overridden = false;

        if let Some(os) = self.options.os.as_deref() {
            builder.os(os.parse()?);
            overridden = true;
        }
        if let Some(arch) = self.options.arch.as_deref() {
            builder.arch(arch.parse()?);
            overridden = true;
        }
        if let Some(cache_dir) = self.options.cache_dir.as_deref() {
            self.logger
                .debug(&format!("Using explicit cache dir: {}", cache_dir.display()));
            builder.cache_dir(cache_dir);
            overridden = true;
        }

        if overridden {
            builder.record_options_source();
        }
        Ok(())
    }

    fn select_signing(&self, builder: &mut BuildConfigBuilder) -> Result<(), AssembleError> {
        if self.options.skip_signing {
            builder.skip_signing(true);
            return Ok(());
        }

        if let Some(name) = self.options.sign_identity.as_deref() {
            self.logger
                .debug(&format!("Using explicit signing identity: {}", name));
            let identity = find_identity(&self.signing.identities(), name)?;
            builder.sign_identity(identity);
        }
        if let Some(name) = self.options.provisioning_profile.as_deref() {
            self.logger
                .debug(&format!("Using explicit provisioning profile: {}", name));
            let profile = find_profile(&self.signing.profiles(), name)?;
            builder.provisioning_profile(profile);
        }
        Ok(())
    }

    fn assemble_classpath(&self, builder: &mut BuildConfigBuilder) -> Result<(), AssembleError> {
        // Classpath entries declared in config files do not reach the
        // remote test build.
        builder.clear_classpath_entries();

        let server = self.runtime_artifact(TEST_SERVER_ARTIFACT)?;
        builder.add_classpath_entry(ClasspathEntry::new(server));

        if builder.target_os() == Some(Os::Ios) {
            for artifact in MOBILE_SUPPORT_ARTIFACTS {
                let path = self.runtime_artifact(artifact)?;
                builder.add_classpath_entry(ClasspathEntry::new(path));
            }
        }

        match self.classpath_source {
            ClasspathSource::SearchRoots(roots) => {
                let archive = archive_name_pattern();
                for root in roots {
                    if root.is_dir() || matches_archive(&archive, root) {
                        builder.add_classpath_entry(ClasspathEntry::new(root.clone()));
                    }
                }
            }
            ClasspathSource::Indexed(properties) => {
                for index in 0.. {
                    let key = format!("{}{}", CLASSPATH_URL_KEY_PREFIX, index);
                    match properties.get(&key) {
                        Some(path) => {
                            builder.add_classpath_entry(ClasspathEntry::new(path.clone()))
                        }
                        None => break,
                    };
                }
            }
        }

        for path in self.runtime_classpath {
            builder.add_classpath_entry(ClasspathEntry::new(path.clone()));
        }

        Ok(())
    }

    fn runtime_artifact(&self, artifact: &str) -> Result<PathBuf, AssembleError> {
        let coordinate = format!("{}:{}:{}", ARTIFACT_GROUP, artifact, self.toolchain_version);
        Ok(self.resolver.resolve_artifact(&coordinate)?)
    }
}

fn archive_name_pattern() -> Regex {
    // Only directories and archives reach the remote classpath.
    Regex::new(r"(?i)\.(jar|zip)$").expect("archive pattern")
}

fn matches_archive(pattern: &Regex, path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| pattern.is_match(name))
        .unwrap_or(false)
}
