//! Pre-built configurations for unit tests

use crate::config::{Arch, BuildConfig, BuildConfigBuilder, ClasspathEntry, Os};
use crate::home::ToolchainHome;
use crate::signing::{ProvisioningProfile, SigningIdentity};

fn base_builder() -> BuildConfigBuilder {
    let mut builder = BuildConfigBuilder::new();
    builder
        .home(ToolchainHome::assume("/opt/avm/home", false))
        .add_classpath_entry(ClasspathEntry::new("/repo/avm-test-server-1.0.jar"))
        .add_classpath_entry(ClasspathEntry::new("/cp/tests.jar"))
        .skip_install(true);
    builder
}

/// Console target (linux/x86_64)
pub fn console_config() -> BuildConfig {
    let mut builder = base_builder();
    builder.os(Os::Linux).arch(Arch::X86_64);
    builder.build().expect("console fixture config")
}

/// iOS simulator target (ios/x86_64, signing skipped)
pub fn simulator_config() -> BuildConfig {
    let mut builder = base_builder();
    builder.os(Os::Ios).arch(Arch::X86_64).skip_signing(true);
    builder.build().expect("simulator fixture config")
}

/// iOS device target (ios/arm64, signed)
pub fn ios_config() -> BuildConfig {
    let mut builder = base_builder();
    builder
        .os(Os::Ios)
        .arch(Arch::Arm64)
        .sign_identity(SigningIdentity {
            name: "iPhone Developer: Unit Test".to_string(),
            fingerprint: "AA11BB22CC33".to_string(),
        })
        .provisioning_profile(ProvisioningProfile {
            name: "AVM Test Profile".to_string(),
            uuid: "0000-1111-2222".to_string(),
        });
    builder.build().expect("ios fixture config")
}
