//! End-to-end bridge runs against the mock collaborators: reporting
//! parity for passing/failing tests, run-wide halt on process crash,
//! per-unit isolation, cancellation, and process reclamation.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use avm_test_bridge::bridge::{BridgeError, TestBridge};
use avm_test_bridge::compiler::CompilerError;
use avm_test_bridge::config::{Arch, Os};
use avm_test_bridge::discovery::{AlphabeticalOrder, TestClass};
use avm_test_bridge::executor::ExecError;
use avm_test_bridge::mock::{
    MockCompiler, MockDeviceCatalog, MockResolver, MockSigningCatalog, MockTestClient,
    RecordingListener, RecordingReporter, SeenEvent, TestOutcome,
};
use avm_test_bridge::options::RunOptions;
use avm_test_bridge::report::RunOutcome;

struct Harness {
    _dir: TempDir,
    home: PathBuf,
    project: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        fs::create_dir_all(home.join("lib")).unwrap();
        fs::create_dir_all(home.join("bin")).unwrap();
        fs::write(home.join(avm_test_bridge::home::DEV_ROOT_MARKER), "").unwrap();
        let project = dir.path().to_path_buf();
        Self {
            _dir: dir,
            home,
            project,
        }
    }

    fn bridge(&self, compiler: MockCompiler, client: MockTestClient) -> TestBridge {
        TestBridge::builder(Box::new(compiler), Box::new(client))
            .project_dir(self.project.clone())
            .home_probe(self.home.clone())
            .toolchain_version("1.0")
            .resolver(Box::new(MockResolver::new("/repo")))
            .signing_catalog(Box::new(MockSigningCatalog::with_default_candidates()))
            .device_catalog(Box::new(MockDeviceCatalog::with_default_devices()))
            .build()
    }
}

fn console_options() -> RunOptions {
    RunOptions {
        os: Some("linux".to_string()),
        arch: Some("x86_64".to_string()),
        ..Default::default()
    }
}

#[test]
fn passing_run_reports_like_a_local_one() {
    let harness = Harness::new();

    let compiler = MockCompiler::new();
    let compiler_log = compiler.log();

    let mut client = MockTestClient::new();
    client.link_process(compiler.process_state());
    client.script_class(
        "com.acme.FooTest",
        &[("testA", TestOutcome::Pass), ("testB", TestOutcome::Pass)],
    );
    client.script_class("com.acme.BarTest", &[("testX", TestOutcome::Pass)]);
    let client_log = client.log();

    let reporter = Arc::new(RecordingReporter::new());
    let bridge = TestBridge::builder(Box::new(compiler), Box::new(client))
        .project_dir(harness.project.clone())
        .home_probe(harness.home.clone())
        .toolchain_version("1.0")
        .resolver(Box::new(MockResolver::new("/repo")))
        .signing_catalog(Box::new(MockSigningCatalog::with_default_candidates()))
        .device_catalog(Box::new(MockDeviceCatalog::with_default_devices()))
        .options(console_options())
        .reporter(reporter.clone())
        .discovered_classes(vec![
            TestClass::new("com.acme.FooTest", &["testA", "testB"]),
            TestClass::new("com.acme.BarTest", &["testX"]),
        ])
        .build();

    let summary = bridge.invoke().unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.tests, 3);
    assert_eq!(summary.test_sets, 2);
    assert_eq!(summary.test_set_errors, 0);

    // The build ran once, for the right target, with the forced-link
    // roots registered before launch.
    let builds = compiler_log.builds();
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].os, Os::Linux);
    assert_eq!(builds[0].arch, Arch::X86_64);
    assert_eq!(
        builds[0].force_link,
        vec!["com.acme.FooTest", "com.acme.BarTest"]
    );
    assert!(builds[0].skip_install);
    assert_eq!(compiler_log.launches().len(), 1);

    // Remote execution was requested per class, then terminated.
    assert_eq!(
        client_log.executed(),
        vec![
            vec!["com.acme.FooTest".to_string()],
            vec!["com.acme.BarTest".to_string()],
        ]
    );
    assert!(client_log.terminated());

    // Per-test reporting reached the host sink.
    assert_eq!(
        reporter.succeeded(),
        vec![
            "com.acme.FooTest#testA",
            "com.acme.FooTest#testB",
            "com.acme.BarTest#testX"
        ]
    );
    assert_eq!(
        reporter.set_starting(),
        vec!["com.acme.FooTest", "com.acme.BarTest"]
    );
    assert_eq!(
        reporter.set_completed(),
        vec!["com.acme.FooTest", "com.acme.BarTest"]
    );
}

#[test]
fn failing_test_keeps_the_rest_of_the_suite() {
    let harness = Harness::new();

    let compiler = MockCompiler::new();
    let mut client = MockTestClient::new();
    client.link_process(compiler.process_state());
    client.script_class(
        "com.acme.FooTest",
        &[
            ("testA", TestOutcome::Fail("expected 2, got 3".to_string())),
            ("testB", TestOutcome::Pass),
        ],
    );
    client.script_class(
        "com.acme.BarTest",
        &[("testX", TestOutcome::AssumptionFailure("no network".to_string()))],
    );

    let reporter = Arc::new(RecordingReporter::new());
    let bridge = TestBridge::builder(Box::new(compiler), Box::new(client))
        .project_dir(harness.project.clone())
        .home_probe(harness.home.clone())
        .toolchain_version("1.0")
        .resolver(Box::new(MockResolver::new("/repo")))
        .signing_catalog(Box::new(MockSigningCatalog::with_default_candidates()))
        .device_catalog(Box::new(MockDeviceCatalog::with_default_devices()))
        .options(console_options())
        .reporter(reporter.clone())
        .discovered_classes(vec![
            TestClass::new("com.acme.FooTest", &["testA", "testB"]),
            TestClass::new("com.acme.BarTest", &["testX"]),
        ])
        .build();

    let summary = bridge.invoke().unwrap();

    // The run completes; the failure is an ordinary failing test.
    assert_eq!(summary.outcome, RunOutcome::Failed);
    assert_eq!(summary.tests, 3);
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.assumption_failures, 1);
    assert_eq!(summary.test_sets, 2);
    assert_eq!(reporter.failed(), vec!["com.acme.FooTest#testA"]);
    assert_eq!(reporter.succeeded(), vec!["com.acme.FooTest#testB"]);
}

#[test]
fn method_selection_drives_remote_requests() {
    let harness = Harness::new();

    let compiler = MockCompiler::new();
    let mut client = MockTestClient::new();
    client.link_process(compiler.process_state());
    client.script_class("com.acme.FooTest", &[("testA", TestOutcome::Pass)]);
    client.script_class("com.acme.BarTest", &[("testX", TestOutcome::Pass)]);
    let client_log = client.log();

    let bridge = TestBridge::builder(Box::new(compiler), Box::new(client))
        .project_dir(harness.project.clone())
        .home_probe(harness.home.clone())
        .toolchain_version("1.0")
        .resolver(Box::new(MockResolver::new("/repo")))
        .signing_catalog(Box::new(MockSigningCatalog::with_default_candidates()))
        .device_catalog(Box::new(MockDeviceCatalog::with_default_devices()))
        .options(console_options())
        .requested_test_methods("com.acme.FooTest#testA,com.acme.BarTest")
        .discovered_classes(vec![
            TestClass::new("com.acme.FooTest", &["testA", "testB"]),
            TestClass::new("com.acme.BarTest", &["testX"]),
        ])
        .build();

    let summary = bridge.invoke().unwrap();
    assert!(summary.is_success());

    assert_eq!(
        client_log.executed(),
        vec![
            vec!["com.acme.FooTest#testA".to_string()],
            vec!["com.acme.BarTest".to_string()],
        ]
    );
}

#[test]
fn process_crash_halts_the_run_and_reclaims_the_process() {
    let harness = Harness::new();

    let compiler = MockCompiler::new();
    let process = compiler.process_state();
    let mut client = MockTestClient::new();
    client.link_process(compiler.process_state());
    client.script_class("com.acme.FooTest", &[("testA", TestOutcome::Pass)]);
    client.crash_after("com.acme.FooTest", 134);
    let client_log = client.log();

    let reporter = Arc::new(RecordingReporter::new());
    let bridge = TestBridge::builder(Box::new(compiler), Box::new(client))
        .project_dir(harness.project.clone())
        .home_probe(harness.home.clone())
        .toolchain_version("1.0")
        .resolver(Box::new(MockResolver::new("/repo")))
        .signing_catalog(Box::new(MockSigningCatalog::with_default_candidates()))
        .device_catalog(Box::new(MockDeviceCatalog::with_default_devices()))
        .options(console_options())
        .reporter(reporter.clone())
        .discovered_classes(vec![
            TestClass::new("com.acme.FooTest", &["testA"]),
            TestClass::new("com.acme.BarTest", &["testX"]),
            TestClass::new("com.acme.BazTest", &["testY"]),
        ])
        .build();

    let err = bridge.invoke().unwrap_err();

    assert!(matches!(
        err,
        BridgeError::Exec(ExecError::UnexpectedExit { status: 134 })
    ));
    assert_eq!(err.exit_code(), 40);

    // No unit after the crash point reported completion, and the remote
    // process is gone.
    assert_eq!(reporter.set_completed(), vec!["com.acme.FooTest"]);
    assert!(!process.is_alive());
    assert!(!client_log.terminated());
}

#[test]
fn build_failure_aborts_before_launch() {
    let harness = Harness::new();

    let mut compiler = MockCompiler::new();
    compiler.fail_build(2);
    let compiler_log = compiler.log();

    let mut client = MockTestClient::new();
    client.link_process(compiler.process_state());

    let bridge = harness.bridge(compiler, client);
    let err = bridge.invoke().unwrap_err();

    assert!(matches!(
        err,
        BridgeError::Compiler(CompilerError::Build { status: 2 })
    ));
    assert_eq!(err.exit_code(), 30);
    assert!(compiler_log.launches().is_empty());
}

#[test]
fn client_configuration_failure_surfaces_as_client_error() {
    let harness = Harness::new();

    let compiler = MockCompiler::new();
    let compiler_log = compiler.log();
    let mut client = MockTestClient::new();
    client.fail_configure("no server port available");

    let bridge = harness.bridge(compiler, client);
    let err = bridge.invoke().unwrap_err();

    assert!(matches!(err, BridgeError::Client(_)));
    assert_eq!(err.exit_code(), 50);
    // Nothing was built or launched.
    assert!(compiler_log.builds().is_empty());
}

#[test]
fn missing_override_file_is_a_configuration_failure() {
    let harness = Harness::new();

    let compiler = MockCompiler::new();
    let client = MockTestClient::new();

    let options = RunOptions {
        config_file: Some(PathBuf::from("/no/such/override.toml")),
        ..console_options()
    };
    let bridge = TestBridge::builder(Box::new(compiler), Box::new(client))
        .project_dir(harness.project.clone())
        .home_probe(harness.home.clone())
        .toolchain_version("1.0")
        .resolver(Box::new(MockResolver::new("/repo")))
        .options(options)
        .build();

    let err = bridge.invoke().unwrap_err();
    assert!(matches!(err, BridgeError::Config(_)));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn mobile_target_flows_into_client_configuration() {
    let harness = Harness::new();

    let compiler = MockCompiler::new();
    let compiler_log = compiler.log();
    let mut client = MockTestClient::new();
    client.link_process(compiler.process_state());
    client.script_class("com.acme.FooTest", &[("testA", TestOutcome::Pass)]);
    let client_log = client.log();

    let options = RunOptions {
        os: Some("ios".to_string()),
        arch: Some("x86_64".to_string()),
        skip_signing: true,
        run_args: Some("-rvm:log=warn \"two words\"".to_string()),
        ..Default::default()
    };
    let bridge = TestBridge::builder(Box::new(compiler), Box::new(client))
        .project_dir(harness.project.clone())
        .home_probe(harness.home.clone())
        .toolchain_version("1.0")
        .resolver(Box::new(MockResolver::new("/repo")))
        .signing_catalog(Box::new(MockSigningCatalog::with_default_candidates()))
        .device_catalog(Box::new(MockDeviceCatalog::with_default_devices()))
        .options(options)
        .discovered_classes(vec![TestClass::new("com.acme.FooTest", &["testA"])])
        .build();

    bridge.invoke().unwrap();

    assert_eq!(client_log.configured_mobile(), Some(true));
    assert_eq!(client_log.run_args(), vec!["-rvm:log=warn", "two words"]);

    // The simulator path picked the best available device and the build
    // classpath carried the mobile support libraries.
    let launches = compiler_log.launches();
    assert_eq!(launches.len(), 1);
    assert_eq!(launches[0].device_type().unwrap().name, "iPhone-16");

    let builds = compiler_log.builds();
    let names: Vec<&str> = builds[0]
        .classpath
        .iter()
        .map(|p| p.rsplit('/').next().unwrap())
        .collect();
    assert_eq!(
        &names[..4],
        &[
            "avm-test-server-1.0.jar",
            "avm-rt-1.0.jar",
            "avm-objc-1.0.jar",
            "avm-cocoatouch-1.0.jar"
        ]
    );
}

#[test]
fn cancel_flag_winds_the_run_down() {
    let harness = Harness::new();

    let compiler = MockCompiler::new();
    let mut client = MockTestClient::new();
    client.link_process(compiler.process_state());
    client.script_class("com.acme.AaTest", &[("testA", TestOutcome::Pass)]);
    let client_log = client.log();

    let bridge = TestBridge::builder(Box::new(compiler), Box::new(client))
        .project_dir(harness.project.clone())
        .home_probe(harness.home.clone())
        .toolchain_version("1.0")
        .resolver(Box::new(MockResolver::new("/repo")))
        .options(console_options())
        .run_order(Box::new(AlphabeticalOrder))
        .discovered_classes(vec![
            TestClass::new("com.acme.ZzTest", &["testZ"]),
            TestClass::new("com.acme.AaTest", &["testA"]),
        ])
        .build();

    // Cancelled after the first flush; alphabetical order makes AaTest
    // the unit that runs.
    let cancel = bridge.cancel_flag();
    cancel.cancel();

    let summary = bridge.invoke().unwrap();
    assert_eq!(summary.outcome, RunOutcome::Cancelled);
    assert_eq!(summary.test_sets, 0);
    assert!(client_log.terminated());
}

#[test]
fn secondary_listeners_see_the_full_ordered_stream() {
    let harness = Harness::new();

    let compiler = MockCompiler::new();
    let mut client = MockTestClient::new();
    client.link_process(compiler.process_state());
    client.script_class(
        "com.acme.FooTest",
        &[("testA", TestOutcome::Pass), ("testB", TestOutcome::Ignore)],
    );

    let listener = RecordingListener::new();
    let events = listener.events();

    let bridge = TestBridge::builder(Box::new(compiler), Box::new(client))
        .project_dir(harness.project.clone())
        .home_probe(harness.home.clone())
        .toolchain_version("1.0")
        .resolver(Box::new(MockResolver::new("/repo")))
        .options(console_options())
        .add_listener(Box::new(listener))
        .discovered_classes(vec![TestClass::new("com.acme.FooTest", &["testA", "testB"])])
        .build();

    bridge.invoke().unwrap();

    assert_eq!(
        events.snapshot(),
        vec![
            SeenEvent::RunStarted(1),
            SeenEvent::TestStarted("com.acme.FooTest#testA".to_string()),
            SeenEvent::TestFinished("com.acme.FooTest#testA".to_string()),
            SeenEvent::TestIgnored("com.acme.FooTest#testB".to_string()),
            SeenEvent::RunFinished,
        ]
    );
}

#[test]
fn console_output_is_attributed_to_the_running_set() {
    let harness = Harness::new();

    let mut compiler = MockCompiler::new();
    compiler.set_console(b"remote boot banner\n");
    let mut client = MockTestClient::new();
    client.link_process(compiler.process_state());
    client.script_class("com.acme.FooTest", &[("testA", TestOutcome::Pass)]);

    let reporter = Arc::new(RecordingReporter::new());
    let bridge = TestBridge::builder(Box::new(compiler), Box::new(client))
        .project_dir(harness.project.clone())
        .home_probe(harness.home.clone())
        .toolchain_version("1.0")
        .resolver(Box::new(MockResolver::new("/repo")))
        .options(console_options())
        .reporter(reporter.clone())
        .discovered_classes(vec![TestClass::new("com.acme.FooTest", &["testA"])])
        .build();

    bridge.invoke().unwrap();

    // The banner arrived through the console relay (attribution depends
    // on when the reader thread drains it; the line itself must be there).
    let lines = reporter.console_lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].1, "remote boot banner");
}
