//! Bridge orchestration
//!
//! Ties the run together: assemble the configuration, build the foreign
//! binary, launch it, wire the event relay, drive the test sets, and
//! summarize. Configuration and process-lifecycle failures abort the run
//! and surface to the host with a stable exit code; per-unit failures
//! never reach this level; they are already ordinary failing test
//! results by the time the executor returns.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::assembler::{AssembleError, ClasspathSource, ConfigAssembler};
use crate::client::{ClientError, TestClient};
use crate::compiler::{Compiler, CompilerError};
use crate::config::ConfigError;
use crate::device::DeviceCatalog;
use crate::discovery::{apply_filter, RunOrderPolicy, TestChecker, TestClass, TestsToRun};
use crate::executor::{CancelFlag, ExecError, TestSetExecutor};
use crate::launch::{derive_launch_parameters, LaunchError};
use crate::logger::{ConsoleLogger, Logger};
use crate::options::RunOptions;
use crate::process::RemoteProcessHandle;
use crate::relay::{ConsoleRelay, NotifierHandle, ResultAccumulator, RunListener, RunNotifier};
use crate::report::{Reporter, ReporterListener, RunSummary};
use crate::resolver::ArtifactResolver;
use crate::selection::TestUnit;
use crate::signing::SigningCatalog;

/// Bridge errors with stable exit codes
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("configuration error: {0}")]
    Config(#[from] AssembleError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Compiler(#[from] CompilerError),

    #[error("remote client error: {0}")]
    Client(#[from] ClientError),

    #[error("test run failed: {0}")]
    Exec(#[from] ExecError),
}

impl BridgeError {
    /// Stable exit code per failure class
    pub fn exit_code(&self) -> i32 {
        match self {
            BridgeError::Config(AssembleError::Signing(_)) => 20,
            BridgeError::Config(_) => 1,
            BridgeError::Launch(_) => 20,
            BridgeError::Compiler(CompilerError::Build { .. }) => 30,
            BridgeError::Compiler(_) => 40,
            BridgeError::Client(_) => 50,
            BridgeError::Exec(_) => 40,
        }
    }
}

impl From<ConfigError> for BridgeError {
    fn from(e: ConfigError) -> Self {
        BridgeError::Config(AssembleError::Config(e))
    }
}

/// Exit code reported when the run completed but tests failed
pub const EXIT_CODE_TESTS_FAILED: i32 = 50;

/// Exit code reported for a cancelled run
pub const EXIT_CODE_CANCELLED: i32 = 80;

/// Generate a run identifier
pub fn generate_run_id() -> String {
    ulid::Ulid::new().to_string().to_lowercase()
}

/// The cross-process test execution bridge
///
/// Owns the collaborators for one run. Construct through `builder()`,
/// then call `invoke()` exactly once.
pub struct TestBridge {
    project_dir: PathBuf,
    options: RunOptions,
    requested_test_methods: Option<String>,
    home_probe: Option<PathBuf>,
    toolchain_version: String,
    compiler: Box<dyn Compiler>,
    client: Box<dyn TestClient>,
    resolver: Box<dyn ArtifactResolver>,
    signing: Box<dyn SigningCatalog>,
    devices: Box<dyn DeviceCatalog>,
    checker: Box<dyn TestChecker>,
    run_order: Box<dyn RunOrderPolicy>,
    reporter: Arc<dyn Reporter>,
    extra_listeners: Vec<Box<dyn RunListener>>,
    classpath_source: ClasspathSource,
    runtime_classpath: Vec<PathBuf>,
    discovered_classes: Vec<TestClass>,
    cancel: CancelFlag,
    logger: Arc<dyn Logger>,
}

impl TestBridge {
    pub fn builder(
        compiler: Box<dyn Compiler>,
        client: Box<dyn TestClient>,
    ) -> TestBridgeBuilder {
        TestBridgeBuilder::new(compiler, client)
    }

    /// The cancel flag shared with the host's interrupt handling
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run the whole bridge sequence. The remote process handle is
    /// reclaimed on every exit path, including errors raised anywhere
    /// between launch and teardown.
    pub fn invoke(mut self) -> Result<RunSummary, BridgeError> {
        let started = Instant::now();
        let run_id = generate_run_id();

        let tests_to_run = self.schedule();
        let units: Vec<TestUnit> = tests_to_run
            .iter()
            .map(|class| {
                TestUnit::resolve(class.clone(), self.requested_test_methods.as_deref())
            })
            .collect();

        let assembler = ConfigAssembler {
            project_dir: &self.project_dir,
            options: &self.options,
            home_probe: self.home_probe.as_deref(),
            toolchain_version: &self.toolchain_version,
            resolver: self.resolver.as_ref(),
            signing: self.signing.as_ref(),
            classpath_source: &self.classpath_source,
            runtime_classpath: &self.runtime_classpath,
            logger: Arc::clone(&self.logger),
        };
        let builder = assembler.assemble(&tests_to_run)?;

        let mobile_target = builder.target_os().map(|os| os.is_mobile()).unwrap_or(false);
        let builder = self.client.configure(builder, mobile_target)?;
        let config = builder.build()?;

        config.logger().info(&format!(
            "Building tests for: {} ({})",
            config.os(),
            config.arch()
        ));
        config
            .logger()
            .info("This could take a while, especially the first time round");
        self.compiler.build(&config)?;

        let params = derive_launch_parameters(&config, &self.options, self.devices.as_ref())?;
        let launched = self.compiler.launch(&config, &params)?;
        let mut handle = RemoteProcessHandle::new(launched.process);

        let mut notifier = RunNotifier::new();
        notifier.add_listener(Box::new(ReporterListener::new(Arc::clone(&self.reporter))));
        let accumulator = ResultAccumulator::new();
        let totals = accumulator.totals();
        notifier.add_listener(Box::new(accumulator));
        for listener in self.extra_listeners.drain(..) {
            notifier.add_listener(listener);
        }
        let notifier = NotifierHandle::new(notifier);

        self.client.set_run_listener(Box::new(notifier.clone()));
        let run_args = self.options.split_run_args();
        if !run_args.is_empty() {
            self.client.set_run_args(run_args);
        }

        let console = ConsoleRelay::new(Arc::clone(&self.reporter));
        let console_thread = launched.console.map(|stream| console.attach(stream));

        let executor = TestSetExecutor::new().with_cancel_flag(self.cancel.clone());
        let outcome = executor.execute(
            &units,
            self.client.as_mut(),
            &notifier,
            &self.reporter,
            &console,
            &mut handle,
        )?;

        // The process has exited, so the console stream is at EOF; drain
        // the last lines before summarizing.
        if let Some(thread) = console_thread {
            let _ = thread.join();
        }

        let summary = RunSummary::new(
            run_id,
            totals.snapshot(),
            outcome.test_sets,
            outcome.test_set_errors,
            outcome.cancelled,
            started.elapsed().as_millis() as u64,
        );
        Ok(summary)
    }

    /// Filter the discovered classes and order them per the run-order
    /// policy.
    fn schedule(&self) -> TestsToRun {
        let filtered = apply_filter(self.checker.as_ref(), self.discovered_classes.clone());
        TestsToRun::new(self.run_order.order(filtered.classes().to_vec()))
    }
}

/// Builder for `TestBridge`
pub struct TestBridgeBuilder {
    bridge: TestBridge,
}

impl TestBridgeBuilder {
    pub fn new(compiler: Box<dyn Compiler>, client: Box<dyn TestClient>) -> Self {
        let logger: Arc<dyn Logger> = Arc::new(ConsoleLogger::new(false));
        Self {
            bridge: TestBridge {
                project_dir: PathBuf::from("."),
                options: RunOptions::default(),
                requested_test_methods: None,
                home_probe: None,
                toolchain_version: env!("CARGO_PKG_VERSION").to_string(),
                compiler,
                client,
                resolver: Box::new(crate::resolver::LocalRepoResolver::new(
                    PathBuf::from(".avm"),
                    Arc::clone(&logger),
                )),
                signing: Box::new(crate::signing::StaticSigningCatalog::default()),
                devices: Box::new(crate::device::StaticDeviceCatalog::default()),
                checker: Box::new(crate::discovery::DefaultTestChecker),
                run_order: Box::new(crate::discovery::DeclaredOrder),
                reporter: Arc::new(crate::report::ConsoleReporter::new(Arc::clone(&logger))),
                extra_listeners: Vec::new(),
                classpath_source: ClasspathSource::SearchRoots(Vec::new()),
                runtime_classpath: Vec::new(),
                discovered_classes: Vec::new(),
                cancel: CancelFlag::new(),
                logger,
            },
        }
    }

    pub fn project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bridge.project_dir = dir.into();
        self
    }

    /// Install the option surface; the logger sink follows the requested
    /// debug level.
    pub fn options(mut self, options: RunOptions) -> Self {
        let logger: Arc<dyn Logger> = Arc::new(ConsoleLogger::new(options.debug_logging));
        self.bridge.logger = Arc::clone(&logger);
        self.bridge.options = options;
        self
    }

    pub fn requested_test_methods(mut self, raw_spec: impl Into<String>) -> Self {
        self.bridge.requested_test_methods = Some(raw_spec.into());
        self
    }

    pub fn home_probe(mut self, path: impl Into<PathBuf>) -> Self {
        self.bridge.home_probe = Some(path.into());
        self
    }

    pub fn toolchain_version(mut self, version: impl Into<String>) -> Self {
        self.bridge.toolchain_version = version.into();
        self
    }

    pub fn resolver(mut self, resolver: Box<dyn ArtifactResolver>) -> Self {
        self.bridge.resolver = resolver;
        self
    }

    pub fn signing_catalog(mut self, catalog: Box<dyn SigningCatalog>) -> Self {
        self.bridge.signing = catalog;
        self
    }

    pub fn device_catalog(mut self, catalog: Box<dyn DeviceCatalog>) -> Self {
        self.bridge.devices = catalog;
        self
    }

    pub fn checker(mut self, checker: Box<dyn TestChecker>) -> Self {
        self.bridge.checker = checker;
        self
    }

    pub fn run_order(mut self, policy: Box<dyn RunOrderPolicy>) -> Self {
        self.bridge.run_order = policy;
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.bridge.reporter = reporter;
        self
    }

    pub fn add_listener(mut self, listener: Box<dyn RunListener>) -> Self {
        self.bridge.extra_listeners.push(listener);
        self
    }

    pub fn classpath_source(mut self, source: ClasspathSource) -> Self {
        self.bridge.classpath_source = source;
        self
    }

    pub fn runtime_classpath(mut self, classpath: Vec<PathBuf>) -> Self {
        self.bridge.runtime_classpath = classpath;
        self
    }

    pub fn discovered_classes(mut self, classes: Vec<TestClass>) -> Self {
        self.bridge.discovered_classes = classes;
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.bridge.logger = logger;
        self
    }

    pub fn build(self) -> TestBridge {
        self.bridge
    }
}

/// Resolve a home probe path for the current environment: an explicit
/// path wins, otherwise the conventional install location under the
/// user's home directory is probed.
pub fn default_home_probe(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".avm/home"))
}
