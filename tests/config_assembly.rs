//! Assembly properties: layering dominance, classpath ordering, and
//! deterministic reassembly, driven through the real local-repository
//! resolver against an on-disk fixture.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use avm_test_bridge::assembler::{ClasspathSource, ConfigAssembler};
use avm_test_bridge::config::{Arch, BuildConfig, Os};
use avm_test_bridge::discovery::{TestClass, TestsToRun};
use avm_test_bridge::logger::NullLogger;
use avm_test_bridge::options::RunOptions;
use avm_test_bridge::resolver::{repo_artifact_path, LocalRepoResolver};
use avm_test_bridge::signing::StaticSigningCatalog;

const VERSION: &str = "1.0";

struct Workspace {
    dir: TempDir,
    repo_root: PathBuf,
}

impl Workspace {
    /// Project dir, toolchain home, and a populated local repository
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("home/lib")).unwrap();
        fs::create_dir_all(dir.path().join("home/bin")).unwrap();
        fs::write(
            dir.path().join("home").join(avm_test_bridge::home::DEV_ROOT_MARKER),
            "",
        )
        .unwrap();

        let repo_root = dir.path().join("cache");
        for artifact in ["avm-test-server", "avm-rt", "avm-objc", "avm-cocoatouch"] {
            let coordinate = format!("com.avm:{}:{}", artifact, VERSION);
            let path = repo_artifact_path(&repo_root, &coordinate).unwrap();
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"jar").unwrap();
        }

        Self { dir, repo_root }
    }

    fn project_dir(&self) -> &Path {
        self.dir.path()
    }

    fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    fn assemble(&self, options: &RunOptions, source: &ClasspathSource) -> BuildConfig {
        let resolver = LocalRepoResolver::new(&self.repo_root, NullLogger::shared());
        let signing = StaticSigningCatalog::default();
        let home = self.home();
        let assembler = ConfigAssembler {
            project_dir: self.project_dir(),
            options,
            home_probe: Some(&home),
            toolchain_version: VERSION,
            resolver: &resolver,
            signing: &signing,
            classpath_source: source,
            runtime_classpath: &[],
            logger: Arc::new(avm_test_bridge::logger::NullLogger),
        };
        assembler
            .assemble(&TestsToRun::new(vec![TestClass::new(
                "com.acme.FooTest",
                &["testA"],
            )]))
            .unwrap()
            .build()
            .unwrap()
    }
}

fn file_names(config: &BuildConfig) -> Vec<String> {
    config
        .classpath()
        .iter()
        .map(|e| {
            e.path()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .to_string()
        })
        .collect()
}

#[test]
fn ios_classpath_includes_support_libs_in_fixed_order() {
    let workspace = Workspace::new();
    let options = RunOptions {
        os: Some("ios".to_string()),
        arch: Some("x86_64".to_string()),
        skip_signing: true,
        ..Default::default()
    };
    let source = ClasspathSource::SearchRoots(vec![]);

    let config = workspace.assemble(&options, &source);
    assert_eq!(
        file_names(&config),
        vec![
            "avm-test-server-1.0.jar",
            "avm-rt-1.0.jar",
            "avm-objc-1.0.jar",
            "avm-cocoatouch-1.0.jar",
        ]
    );
}

#[test]
fn highest_precedence_source_always_wins() {
    let workspace = Workspace::new();

    // Discovered project layer says linux/arm64.
    fs::write(
        workspace.project_dir().join("avm.toml"),
        "os = \"linux\"\narch = \"arm64\"\n",
    )
    .unwrap();

    // Explicit file layer overrides the OS only.
    let explicit = workspace.project_dir().join("ci-override.toml");
    fs::write(&explicit, "os = \"macosx\"\n").unwrap();

    let options = RunOptions {
        config_file: Some(explicit),
        ..Default::default()
    };
    let source = ClasspathSource::SearchRoots(vec![]);
    let config = workspace.assemble(&options, &source);
    assert_eq!(config.os(), Os::Macosx);
    assert_eq!(config.arch(), Arch::Arm64);

    // The option layer dominates both files for any field it sets.
    let explicit = workspace.project_dir().join("ci-override.toml");
    let options = RunOptions {
        config_file: Some(explicit),
        os: Some("ios".to_string()),
        skip_signing: true,
        ..Default::default()
    };
    let config = workspace.assemble(&options, &source);
    assert_eq!(config.os(), Os::Ios);
}

#[test]
fn reassembly_from_identical_inputs_is_equal() {
    let workspace = Workspace::new();
    fs::write(workspace.project_dir().join("avm.toml"), "os = \"ios\"\n").unwrap();

    let options = RunOptions {
        skip_signing: true,
        ..Default::default()
    };
    let source = ClasspathSource::Indexed(
        [
            ("classPathUrl.0".to_string(), "/cp/a.jar".to_string()),
            ("classPathUrl.1".to_string(), "/cp/b.jar".to_string()),
        ]
        .into_iter()
        .collect(),
    );

    let first = workspace.assemble(&options, &source);
    let second = workspace.assemble(&options, &source);

    assert_eq!(first.classpath(), second.classpath());
    assert_eq!(first.force_link_classes(), second.force_link_classes());
    // Provenance digests are byte-stable too.
    let digests = |config: &BuildConfig| {
        config
            .sources()
            .iter()
            .filter_map(|s| s.digest.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(digests(&first), digests(&second));
}

#[test]
fn duplicate_entries_are_kept_in_load_order() {
    let workspace = Workspace::new();
    let options = RunOptions::default();
    let source = ClasspathSource::Indexed(
        [
            ("classPathUrl.0".to_string(), "/cp/dup.jar".to_string()),
            ("classPathUrl.1".to_string(), "/cp/other.jar".to_string()),
            ("classPathUrl.2".to_string(), "/cp/dup.jar".to_string()),
        ]
        .into_iter()
        .collect(),
    );

    let config = workspace.assemble(&options, &source);
    let paths: Vec<_> = config.classpath().iter().map(|e| e.to_string()).collect();
    assert_eq!(
        paths,
        vec![
            workspace
                .repo_root
                .join("repo/com/avm/avm-test-server/1.0/avm-test-server-1.0.jar")
                .display()
                .to_string(),
            "/cp/dup.jar".to_string(),
            "/cp/other.jar".to_string(),
            "/cp/dup.jar".to_string(),
        ]
    );
}
