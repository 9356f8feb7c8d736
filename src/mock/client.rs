//! Mock remote test client
//!
//! Scripts per-class test outcomes and emits them through the installed
//! run listener on `flush`, mirroring the blocking request/flush
//! discipline of the real channel. Failure injection covers request
//! failures, termination failures, and a mid-run process crash.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::client::{ClientError, TestClient};
use crate::config::BuildConfigBuilder;
use crate::mock::MockProcessState;
use crate::relay::{RunListener, TestDescription, TestFailureInfo};

/// Scripted outcome for one test method
#[derive(Debug, Clone)]
pub enum TestOutcome {
    Pass,
    Fail(String),
    Ignore,
    AssumptionFailure(String),
}

type FlushCallback = Box<dyn FnMut(&[String]) + Send>;

/// Shared record of everything the client was asked to do. Stays
/// readable after the client itself moves into the bridge.
#[derive(Clone, Default)]
pub struct ClientLog {
    executed: Arc<Mutex<Vec<Vec<String>>>>,
    run_args: Arc<Mutex<Vec<String>>>,
    mobile_target: Arc<Mutex<Option<bool>>>,
    terminated: Arc<AtomicBool>,
}

impl ClientLog {
    /// Pattern sets flushed to the remote, in request order
    pub fn executed(&self) -> Vec<Vec<String>> {
        self.executed.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn run_args(&self) -> Vec<String> {
        self.run_args.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// The mobile flag `configure` was called with, if it was called
    pub fn configured_mobile(&self) -> Option<bool> {
        self.mobile_target.lock().ok().and_then(|m| *m)
    }

    pub fn terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

/// In-process mock of the remote test client
#[derive(Default)]
pub struct MockTestClient {
    listener: Option<Box<dyn RunListener>>,
    scripts: HashMap<String, Vec<(String, TestOutcome)>>,
    request_failures: HashMap<String, String>,
    crash_after: Option<(String, i32)>,
    fail_terminate: Option<String>,
    ignore_terminate: bool,
    fail_configure: Option<String>,
    process: Option<Arc<MockProcessState>>,
    pending: Option<Vec<String>>,
    broken: bool,
    on_flush: Vec<FlushCallback>,
    log: ClientLog,
}

impl MockTestClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the client to a mock process so terminate and crash
    /// injection drive its exit state.
    pub fn link_process(&mut self, process: Arc<MockProcessState>) {
        self.process = Some(process);
    }

    /// Script the outcomes the remote run reports for `class_name`.
    pub fn script_class(&mut self, class_name: &str, outcomes: &[(&str, TestOutcome)]) {
        self.scripts.insert(
            class_name.to_string(),
            outcomes
                .iter()
                .map(|(method, outcome)| (method.to_string(), outcome.clone()))
                .collect(),
        );
    }

    /// Fail the execution request for `class_name` with `message`.
    pub fn fail_requests_for(&mut self, class_name: &str, message: &str) {
        self.request_failures
            .insert(class_name.to_string(), message.to_string());
    }

    /// Crash the linked process after `class_name` finishes flushing.
    pub fn crash_after(&mut self, class_name: &str, status: i32) {
        self.crash_after = Some((class_name.to_string(), status));
    }

    pub fn fail_terminate(&mut self, message: &str) {
        self.fail_terminate = Some(message.to_string());
    }

    /// Acknowledge terminate without shutting the process down (a hung
    /// remote process).
    pub fn ignore_terminate(&mut self) {
        self.ignore_terminate = true;
    }

    pub fn fail_configure(&mut self, message: &str) {
        self.fail_configure = Some(message.to_string());
    }

    /// Observe every flushed request (tests use this to inject cancel
    /// signals and console output at realistic points).
    pub fn on_flush(&mut self, callback: impl FnMut(&[String]) + Send + 'static) {
        self.on_flush.push(Box::new(callback));
    }

    /// Handle over the client's activity record
    pub fn log(&self) -> ClientLog {
        self.log.clone()
    }

    pub fn executed(&self) -> Vec<Vec<String>> {
        self.log.executed()
    }

    pub fn terminated(&self) -> bool {
        self.log.terminated()
    }

    fn class_of(patterns: &[String]) -> String {
        patterns
            .first()
            .map(|p| p.split('#').next().unwrap_or(p).to_string())
            .unwrap_or_default()
    }

    fn emit_events(&mut self, patterns: &[String]) {
        let class_name = Self::class_of(patterns);
        let script = self.scripts.get(&class_name).cloned().unwrap_or_default();

        let methods: Vec<(String, TestOutcome)> = if patterns.len() == 1
            && !patterns[0].contains('#')
        {
            // Bare class pattern: the whole scripted set runs.
            script
        } else {
            patterns
                .iter()
                .filter_map(|p| p.split_once('#'))
                .map(|(_, method)| {
                    let outcome = script
                        .iter()
                        .find(|(name, _)| name == method)
                        .map(|(_, outcome)| outcome.clone())
                        .unwrap_or(TestOutcome::Pass);
                    (method.to_string(), outcome)
                })
                .collect()
        };

        let Some(listener) = self.listener.as_mut() else {
            return;
        };

        for (method, outcome) in methods {
            let description = TestDescription::new(&class_name, &method);
            match outcome {
                TestOutcome::Pass => {
                    listener.test_started(&description);
                    listener.test_finished(&description);
                }
                TestOutcome::Fail(message) => {
                    listener.test_started(&description);
                    listener.test_failure(&TestFailureInfo {
                        description: description.clone(),
                        message,
                        trace: None,
                    });
                    listener.test_finished(&description);
                }
                TestOutcome::Ignore => {
                    listener.test_ignored(&description);
                }
                TestOutcome::AssumptionFailure(message) => {
                    listener.test_started(&description);
                    listener.test_assumption_failure(&TestFailureInfo {
                        description: description.clone(),
                        message,
                        trace: None,
                    });
                    listener.test_finished(&description);
                }
            }
        }
    }
}

impl TestClient for MockTestClient {
    fn configure(
        &mut self,
        mut builder: BuildConfigBuilder,
        mobile_target: bool,
    ) -> Result<BuildConfigBuilder, ClientError> {
        if let Some(message) = &self.fail_configure {
            return Err(ClientError::Channel(message.clone()));
        }
        if let Ok(mut mobile) = self.log.mobile_target.lock() {
            *mobile = Some(mobile_target);
        }
        builder.add_property("avm.test.server.port", "17777");
        builder.add_property(
            "avm.test.server.transport",
            if mobile_target { "socket" } else { "pipe" },
        );
        Ok(builder)
    }

    fn set_run_listener(&mut self, listener: Box<dyn RunListener>) {
        self.listener = Some(listener);
    }

    fn set_run_args(&mut self, args: Vec<String>) {
        if let Ok(mut run_args) = self.log.run_args.lock() {
            *run_args = args;
        }
    }

    fn run_tests(&mut self, patterns: &[String]) -> Result<&mut dyn TestClient, ClientError> {
        if self.broken {
            return Err(ClientError::Channel("connection reset".to_string()));
        }
        self.pending = Some(patterns.to_vec());
        Ok(self)
    }

    fn flush(&mut self) -> Result<(), ClientError> {
        let Some(patterns) = self.pending.take() else {
            return Ok(());
        };
        if let Ok(mut executed) = self.log.executed.lock() {
            executed.push(patterns.clone());
        }

        let class_name = Self::class_of(&patterns);
        if let Some(message) = self.request_failures.get(&class_name) {
            return Err(ClientError::Remote(message.clone()));
        }

        self.emit_events(&patterns);

        let mut callbacks = std::mem::take(&mut self.on_flush);
        for callback in &mut callbacks {
            callback(&patterns);
        }
        self.on_flush = callbacks;

        if let Some((crash_class, status)) = self.crash_after.clone() {
            if crash_class == class_name {
                if let Some(process) = &self.process {
                    process.mark_exited(status);
                }
                self.broken = true;
            }
        }
        Ok(())
    }

    fn terminate(&mut self) -> Result<(), ClientError> {
        if let Some(message) = &self.fail_terminate {
            return Err(ClientError::Channel(message.clone()));
        }
        self.log.terminated.store(true, Ordering::SeqCst);
        if !self.ignore_terminate {
            if let Some(process) = &self.process {
                process.mark_exited(0);
            }
        }
        Ok(())
    }
}
