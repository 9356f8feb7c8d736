//! The immutable build configuration and its builder

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::home::ToolchainHome;
use crate::logger::{Logger, NullLogger};
use crate::signing::{ProvisioningProfile, SigningIdentity};

use super::layers::{
    read_config_file, read_properties_file, ConfigOrigin, ConfigSource, ProjectConfig,
    PROJECT_CONFIG_NAME, PROJECT_PROPERTIES_NAME,
};
use super::target::{Arch, Os};
use super::ConfigError;

/// One classpath entry: a directory or archive path. Order is identity;
/// entries are never reordered or removed once added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClasspathEntry(PathBuf);

impl ClasspathEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl From<PathBuf> for ClasspathEntry {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl fmt::Display for ClasspathEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// The frozen build configuration consumed by the compiler and launch
/// orchestration. Built once per test-run invocation; never mutated after
/// `BuildConfigBuilder::build`.
#[derive(Clone)]
pub struct BuildConfig {
    os: Os,
    arch: Arch,
    home: ToolchainHome,
    classpath: Vec<ClasspathEntry>,
    force_link_classes: Vec<String>,
    sign_identity: Option<SigningIdentity>,
    provisioning_profile: Option<ProvisioningProfile>,
    skip_signing: bool,
    cache_dir: Option<PathBuf>,
    skip_install: bool,
    use_debug_libs: bool,
    dump_intermediates: bool,
    properties: BTreeMap<String, String>,
    sources: Vec<ConfigSource>,
    logger: Arc<dyn Logger>,
}

impl BuildConfig {
    pub fn os(&self) -> Os {
        self.os
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn home(&self) -> &ToolchainHome {
        &self.home
    }

    /// Classpath entries in load order. Order determines class-loading
    /// precedence in the remote process.
    pub fn classpath(&self) -> &[ClasspathEntry] {
        &self.classpath
    }

    /// Classes that must survive dead-code elimination
    pub fn force_link_classes(&self) -> &[String] {
        &self.force_link_classes
    }

    pub fn sign_identity(&self) -> Option<&SigningIdentity> {
        self.sign_identity.as_ref()
    }

    pub fn provisioning_profile(&self) -> Option<&ProvisioningProfile> {
        self.provisioning_profile.as_ref()
    }

    pub fn skip_signing(&self) -> bool {
        self.skip_signing
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    pub fn skip_install(&self) -> bool {
        self.skip_install
    }

    pub fn use_debug_libs(&self) -> bool {
        self.use_debug_libs
    }

    pub fn dump_intermediates(&self) -> bool {
        self.dump_intermediates
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Contributing config sources in precedence order
    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }
}

impl fmt::Debug for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildConfig")
            .field("os", &self.os)
            .field("arch", &self.arch)
            .field("home", &self.home)
            .field("classpath", &self.classpath)
            .field("force_link_classes", &self.force_link_classes)
            .field("sign_identity", &self.sign_identity)
            .field("provisioning_profile", &self.provisioning_profile)
            .field("skip_signing", &self.skip_signing)
            .field("cache_dir", &self.cache_dir)
            .field("skip_install", &self.skip_install)
            .finish_non_exhaustive()
    }
}

/// Builder for `BuildConfig`
///
/// Setters are last-write-wins, which gives layered sources their
/// precedence: apply defaults first, discovered files next, explicit
/// overrides last. Classpath entries only append; `clear_classpath_entries`
/// exists for the assembler to drop file-declared entries before it builds
/// the remote test classpath.
pub struct BuildConfigBuilder {
    os: Option<Os>,
    arch: Option<Arch>,
    home: Option<ToolchainHome>,
    classpath: Vec<ClasspathEntry>,
    force_link_classes: Vec<String>,
    sign_identity: Option<SigningIdentity>,
    provisioning_profile: Option<ProvisioningProfile>,
    skip_signing: bool,
    cache_dir: Option<PathBuf>,
    skip_install: bool,
    use_debug_libs: bool,
    dump_intermediates: bool,
    properties: BTreeMap<String, String>,
    sources: Vec<ConfigSource>,
    logger: Arc<dyn Logger>,
}

impl fmt::Debug for BuildConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildConfigBuilder")
            .field("os", &self.os)
            .field("arch", &self.arch)
            .field("home", &self.home)
            .field("classpath", &self.classpath)
            .field("force_link_classes", &self.force_link_classes)
            .field("sign_identity", &self.sign_identity)
            .field("provisioning_profile", &self.provisioning_profile)
            .field("skip_signing", &self.skip_signing)
            .field("cache_dir", &self.cache_dir)
            .field("skip_install", &self.skip_install)
            .field("use_debug_libs", &self.use_debug_libs)
            .field("dump_intermediates", &self.dump_intermediates)
            .field("properties", &self.properties)
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

impl BuildConfigBuilder {
    pub fn new() -> Self {
        Self {
            os: None,
            arch: None,
            home: None,
            classpath: Vec::new(),
            force_link_classes: Vec::new(),
            sign_identity: None,
            provisioning_profile: None,
            skip_signing: false,
            cache_dir: None,
            skip_install: false,
            use_debug_libs: false,
            dump_intermediates: false,
            properties: BTreeMap::new(),
            sources: vec![ConfigSource::builtin()],
            logger: NullLogger::shared(),
        }
    }

    pub fn logger(&mut self, logger: Arc<dyn Logger>) -> &mut Self {
        self.logger = logger;
        self
    }

    pub fn os(&mut self, os: Os) -> &mut Self {
        self.os = Some(os);
        self
    }

    pub fn arch(&mut self, arch: Arch) -> &mut Self {
        self.arch = Some(arch);
        self
    }

    pub fn home(&mut self, home: ToolchainHome) -> &mut Self {
        self.home = Some(home);
        self
    }

    pub fn cache_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn add_classpath_entry(&mut self, entry: ClasspathEntry) -> &mut Self {
        self.classpath.push(entry);
        self
    }

    pub fn clear_classpath_entries(&mut self) -> &mut Self {
        self.classpath.clear();
        self
    }

    /// Register a class that must not be stripped by dead-code
    /// elimination. Ordered; duplicates collapse to the first mention.
    pub fn add_force_link_class(&mut self, class_name: impl Into<String>) -> &mut Self {
        let class_name = class_name.into();
        if !self.force_link_classes.contains(&class_name) {
            self.force_link_classes.push(class_name);
        }
        self
    }

    pub fn sign_identity(&mut self, identity: SigningIdentity) -> &mut Self {
        self.sign_identity = Some(identity);
        self
    }

    pub fn provisioning_profile(&mut self, profile: ProvisioningProfile) -> &mut Self {
        self.provisioning_profile = Some(profile);
        self
    }

    pub fn skip_signing(&mut self, skip: bool) -> &mut Self {
        self.skip_signing = skip;
        self
    }

    pub fn skip_install(&mut self, skip: bool) -> &mut Self {
        self.skip_install = skip;
        self
    }

    pub fn use_debug_libs(&mut self, enabled: bool) -> &mut Self {
        self.use_debug_libs = enabled;
        self
    }

    pub fn dump_intermediates(&mut self, enabled: bool) -> &mut Self {
        self.dump_intermediates = enabled;
        self
    }

    pub fn add_property(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn add_properties(&mut self, properties: BTreeMap<String, String>) -> &mut Self {
        self.properties.extend(properties);
        self
    }

    /// Read an explicitly-named config file. Missing file is an error.
    pub fn read_config_file(&mut self, path: &Path) -> Result<&mut Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let (config, digest) = read_config_file(path)?;
        self.sources
            .push(ConfigSource::file(ConfigOrigin::Explicit, path, digest));
        self.apply(config)
    }

    /// Read the project directory's discovered config file, if present.
    pub fn read_project_config(&mut self, project_dir: &Path) -> Result<&mut Self, ConfigError> {
        let path = project_dir.join(PROJECT_CONFIG_NAME);
        if !path.exists() {
            return Ok(self);
        }
        let (config, digest) = read_config_file(&path)?;
        self.sources
            .push(ConfigSource::file(ConfigOrigin::Discovered, &path, digest));
        self.apply(config)
    }

    /// Read an explicitly-named properties file. Missing file is an error.
    pub fn read_properties_file(&mut self, path: &Path) -> Result<&mut Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let (properties, digest) = read_properties_file(path)?;
        self.sources
            .push(ConfigSource::file(ConfigOrigin::Explicit, path, digest));
        self.properties.extend(properties);
        Ok(self)
    }

    /// Read the project directory's discovered properties file, if present.
    pub fn read_project_properties(&mut self, project_dir: &Path) -> Result<&mut Self, ConfigError> {
        let path = project_dir.join(PROJECT_PROPERTIES_NAME);
        if !path.exists() {
            return Ok(self);
        }
        let (properties, digest) = read_properties_file(&path)?;
        self.sources
            .push(ConfigSource::file(ConfigOrigin::Discovered, &path, digest));
        self.properties.extend(properties);
        Ok(self)
    }

    /// Record the run-option layer in the provenance trail.
    pub fn record_options_source(&mut self) -> &mut Self {
        self.sources.push(ConfigSource::options());
        self
    }

    /// Target OS as layered so far (assembly consults this to pick the
    /// target's support libraries before the config is frozen)
    pub fn target_os(&self) -> Option<Os> {
        self.os
    }

    /// Target architecture as layered so far
    pub fn target_arch(&self) -> Option<Arch> {
        self.arch
    }

    fn apply(&mut self, config: ProjectConfig) -> Result<&mut Self, ConfigError> {
        if let Some(os) = config.os {
            self.os = Some(self.expand(&os).parse()?);
        }
        if let Some(arch) = config.arch {
            self.arch = Some(self.expand(&arch).parse()?);
        }
        if let Some(cache_dir) = config.cache_dir {
            self.cache_dir = Some(PathBuf::from(self.expand(&cache_dir)));
        }
        for entry in config.classpath {
            let expanded = self.expand(&entry);
            self.classpath.push(ClasspathEntry::new(expanded));
        }
        for class_name in config.force_link {
            self.add_force_link_class(class_name);
        }
        Ok(self)
    }

    /// Substitute `${key}` references from the properties layer. Unknown
    /// keys are left untouched.
    fn expand(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            match rest[start..].find('}') {
                Some(end) => {
                    let key = &rest[start + 2..start + end];
                    match self.properties.get(key) {
                        Some(replacement) => out.push_str(replacement),
                        None => out.push_str(&rest[start..start + end + 1]),
                    }
                    rest = &rest[start + end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Freeze the configuration. The toolchain home must be set; target
    /// defaults are a 64-bit console host.
    pub fn build(self) -> Result<BuildConfig, ConfigError> {
        let home = self.home.ok_or(ConfigError::MissingHome)?;
        Ok(BuildConfig {
            os: self.os.unwrap_or(Os::Linux),
            arch: self.arch.unwrap_or(Arch::X86_64),
            home,
            classpath: self.classpath,
            force_link_classes: self.force_link_classes,
            sign_identity: self.sign_identity,
            provisioning_profile: self.provisioning_profile,
            skip_signing: self.skip_signing,
            cache_dir: self.cache_dir,
            skip_install: self.skip_install,
            use_debug_libs: self.use_debug_libs,
            dump_intermediates: self.dump_intermediates,
            properties: self.properties,
            sources: self.sources,
            logger: self.logger,
        })
    }
}

impl Default for BuildConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
