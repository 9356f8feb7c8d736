//! Event relay between the remote test run and the host
//!
//! The remote process speaks its own lifecycle vocabulary; the host
//! reporting pipeline speaks another. This module bridges the two without
//! loss or reordering: every remote event is translated synchronously, in
//! receipt order, into one dispatch across the notifier's listeners. The
//! notifier is a plain mediator: an ordered listener list and a dispatch
//! function, nothing more.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::sync::{Arc, Mutex};
use std::thread;

use serde::{Deserialize, Serialize};

use crate::report::Reporter;

/// Identity of a single test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDescription {
    pub class_name: String,

    /// Absent for run-level events scoped to a whole class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,
}

impl TestDescription {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: Some(method_name.into()),
        }
    }
}

impl fmt::Display for TestDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method_name {
            Some(method) => write!(f, "{}#{}", self.class_name, method),
            None => f.write_str(&self.class_name),
        }
    }
}

/// A test failure or assumption failure reported by the remote process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFailureInfo {
    pub description: TestDescription,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

/// Lifecycle events emitted by the remote test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    RunStarted { test_count: usize },
    RunFinished,
    TestStarted(TestDescription),
    TestFinished(TestDescription),
    TestFailure(TestFailureInfo),
    TestAssumptionFailure(TestFailureInfo),
    TestIgnored(TestDescription),
}

/// Host-side test lifecycle listener
#[allow(unused_variables)]
pub trait RunListener: Send {
    fn run_started(&mut self, test_count: usize) {}
    fn run_finished(&mut self) {}
    fn test_started(&mut self, description: &TestDescription) {}
    fn test_finished(&mut self, description: &TestDescription) {}
    fn test_failure(&mut self, failure: &TestFailureInfo) {}
    fn test_assumption_failure(&mut self, failure: &TestFailureInfo) {}
    fn test_ignored(&mut self, description: &TestDescription) {}
}

/// Ordered fan-out of lifecycle events
///
/// Listeners are invoked in registration order: the primary reporter
/// first, the result accumulator second, secondary listeners afterwards.
/// The registration surface closes when the run starts; late additions
/// are dropped.
#[derive(Default)]
pub struct RunNotifier {
    listeners: Vec<Box<dyn RunListener>>,
    started: bool,
}

impl RunNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: Box<dyn RunListener>) {
        if !self.started {
            self.listeners.push(listener);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Translate one remote event into one ordered dispatch. Stateless
    /// per event: no buffering, no reordering.
    pub fn relay(&mut self, event: RemoteEvent) {
        match event {
            RemoteEvent::RunStarted { test_count } => self.fire_run_started(test_count),
            RemoteEvent::RunFinished => self.fire_run_finished(),
            RemoteEvent::TestStarted(description) => self.fire_test_started(&description),
            RemoteEvent::TestFinished(description) => self.fire_test_finished(&description),
            RemoteEvent::TestFailure(failure) => self.fire_test_failure(&failure),
            RemoteEvent::TestAssumptionFailure(failure) => {
                self.fire_test_assumption_failure(&failure)
            }
            RemoteEvent::TestIgnored(description) => self.fire_test_ignored(&description),
        }
    }

    pub fn fire_run_started(&mut self, test_count: usize) {
        self.started = true;
        for listener in &mut self.listeners {
            listener.run_started(test_count);
        }
    }

    pub fn fire_run_finished(&mut self) {
        for listener in &mut self.listeners {
            listener.run_finished();
        }
    }

    pub fn fire_test_started(&mut self, description: &TestDescription) {
        for listener in &mut self.listeners {
            listener.test_started(description);
        }
    }

    pub fn fire_test_finished(&mut self, description: &TestDescription) {
        for listener in &mut self.listeners {
            listener.test_finished(description);
        }
    }

    pub fn fire_test_failure(&mut self, failure: &TestFailureInfo) {
        for listener in &mut self.listeners {
            listener.test_failure(failure);
        }
    }

    pub fn fire_test_assumption_failure(&mut self, failure: &TestFailureInfo) {
        for listener in &mut self.listeners {
            listener.test_assumption_failure(failure);
        }
    }

    pub fn fire_test_ignored(&mut self, description: &TestDescription) {
        for listener in &mut self.listeners {
            listener.test_ignored(description);
        }
    }
}

/// Shared, cloneable handle over the notifier
///
/// This is the relay's remote-facing half: it implements `RunListener` in
/// the remote client's vocabulary and forwards every event synchronously
/// into the notifier's ordered dispatch. The executor uses the same
/// handle for the run-level bracket events.
#[derive(Clone)]
pub struct NotifierHandle {
    inner: Arc<Mutex<RunNotifier>>,
}

impl NotifierHandle {
    pub fn new(notifier: RunNotifier) -> Self {
        Self {
            inner: Arc::new(Mutex::new(notifier)),
        }
    }

    pub fn add_listener(&self, listener: Box<dyn RunListener>) {
        if let Ok(mut notifier) = self.inner.lock() {
            notifier.add_listener(listener);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().map(|n| n.listener_count()).unwrap_or(0)
    }

    pub fn relay(&self, event: RemoteEvent) {
        if let Ok(mut notifier) = self.inner.lock() {
            notifier.relay(event);
        }
    }

    pub fn fire_run_started(&self, test_count: usize) {
        self.relay(RemoteEvent::RunStarted { test_count });
    }

    pub fn fire_run_finished(&self) {
        self.relay(RemoteEvent::RunFinished);
    }
}

impl RunListener for NotifierHandle {
    fn run_started(&mut self, test_count: usize) {
        self.relay(RemoteEvent::RunStarted { test_count });
    }

    fn run_finished(&mut self) {
        self.relay(RemoteEvent::RunFinished);
    }

    fn test_started(&mut self, description: &TestDescription) {
        self.relay(RemoteEvent::TestStarted(description.clone()));
    }

    fn test_finished(&mut self, description: &TestDescription) {
        self.relay(RemoteEvent::TestFinished(description.clone()));
    }

    fn test_failure(&mut self, failure: &TestFailureInfo) {
        self.relay(RemoteEvent::TestFailure(failure.clone()));
    }

    fn test_assumption_failure(&mut self, failure: &TestFailureInfo) {
        self.relay(RemoteEvent::TestAssumptionFailure(failure.clone()));
    }

    fn test_ignored(&mut self, description: &TestDescription) {
        self.relay(RemoteEvent::TestIgnored(description.clone()));
    }
}

/// Aggregated run totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Tests that ran to completion (including failed ones)
    pub tests: usize,
    pub failures: usize,
    pub assumption_failures: usize,
    pub ignored: usize,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.failures == 0
    }
}

/// Shared read handle over the accumulated totals
#[derive(Clone)]
pub struct ResultTotals {
    inner: Arc<Mutex<RunResult>>,
}

impl ResultTotals {
    pub fn snapshot(&self) -> RunResult {
        self.inner.lock().map(|r| *r).unwrap_or_default()
    }
}

/// Listener that accumulates run totals
pub struct ResultAccumulator {
    inner: Arc<Mutex<RunResult>>,
}

impl ResultAccumulator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RunResult::default())),
        }
    }

    /// Handle that stays readable after the accumulator is handed to the
    /// notifier.
    pub fn totals(&self) -> ResultTotals {
        ResultTotals {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for ResultAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl RunListener for ResultAccumulator {
    fn test_finished(&mut self, _description: &TestDescription) {
        if let Ok(mut totals) = self.inner.lock() {
            totals.tests += 1;
        }
    }

    fn test_failure(&mut self, _failure: &TestFailureInfo) {
        if let Ok(mut totals) = self.inner.lock() {
            totals.failures += 1;
        }
    }

    fn test_assumption_failure(&mut self, _failure: &TestFailureInfo) {
        if let Ok(mut totals) = self.inner.lock() {
            totals.assumption_failures += 1;
        }
    }

    fn test_ignored(&mut self, _description: &TestDescription) {
        if let Ok(mut totals) = self.inner.lock() {
            totals.ignored += 1;
        }
    }
}

/// Associates remote console output with the executing test set
///
/// The executor marks set boundaries; lines arriving from the process
/// console stream are forwarded to the reporter attributed to the current
/// set, so remote output never interleaves unattributed into the report.
#[derive(Clone)]
pub struct ConsoleRelay {
    reporter: Arc<dyn Reporter>,
    current_set: Arc<Mutex<Option<String>>>,
}

impl ConsoleRelay {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            reporter,
            current_set: Arc::new(Mutex::new(None)),
        }
    }

    pub fn enter_test_set(&self, name: &str) {
        if let Ok(mut current) = self.current_set.lock() {
            *current = Some(name.to_string());
        }
    }

    pub fn leave_test_set(&self) {
        if let Ok(mut current) = self.current_set.lock() {
            *current = None;
        }
    }

    /// Forward one console line attributed to the current test set.
    pub fn push_line(&self, line: &str) {
        let current = self
            .current_set
            .lock()
            .ok()
            .and_then(|guard| guard.clone());
        self.reporter.console_output(current.as_deref(), line);
    }

    /// Drain a console stream on a background thread. The thread ends
    /// when the stream reaches EOF, i.e. when the remote process exits.
    pub fn attach(&self, stream: Box<dyn Read + Send>) -> thread::JoinHandle<()> {
        let relay = self.clone();
        thread::spawn(move || {
            let reader = BufReader::new(stream);
            for line in reader.lines() {
                match line {
                    Ok(line) => relay.push_line(&line),
                    Err(_) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{RecordingListener, RecordingReporter, SeenEvent};

    #[test]
    fn test_relay_dispatch_order() {
        let first = RecordingListener::new();
        let first_events = first.events();
        let second = RecordingListener::new();
        let second_events = second.events();

        let mut notifier = RunNotifier::new();
        notifier.add_listener(Box::new(first));
        notifier.add_listener(Box::new(second));

        notifier.relay(RemoteEvent::RunStarted { test_count: 2 });
        notifier.relay(RemoteEvent::TestStarted(TestDescription::new(
            "com.acme.FooTest",
            "testA",
        )));
        notifier.relay(RemoteEvent::RunFinished);

        let expected = vec![
            SeenEvent::RunStarted(2),
            SeenEvent::TestStarted("com.acme.FooTest#testA".to_string()),
            SeenEvent::RunFinished,
        ];
        assert_eq!(first_events.snapshot(), expected);
        assert_eq!(second_events.snapshot(), expected);
    }

    #[test]
    fn test_registration_closes_at_run_start() {
        let mut notifier = RunNotifier::new();
        notifier.add_listener(Box::new(RecordingListener::new()));
        notifier.fire_run_started(0);
        notifier.add_listener(Box::new(RecordingListener::new()));
        assert_eq!(notifier.listener_count(), 1);
    }

    #[test]
    fn test_result_accumulator_totals() {
        let accumulator = ResultAccumulator::new();
        let totals = accumulator.totals();

        let mut notifier = RunNotifier::new();
        notifier.add_listener(Box::new(accumulator));

        let passing = TestDescription::new("com.acme.FooTest", "testA");
        let failing = TestDescription::new("com.acme.FooTest", "testB");
        notifier.fire_run_started(3);
        notifier.fire_test_started(&passing);
        notifier.fire_test_finished(&passing);
        notifier.fire_test_started(&failing);
        notifier.fire_test_failure(&TestFailureInfo {
            description: failing.clone(),
            message: "boom".to_string(),
            trace: None,
        });
        notifier.fire_test_finished(&failing);
        notifier.fire_test_ignored(&TestDescription::new("com.acme.FooTest", "testC"));
        notifier.fire_run_finished();

        let result = totals.snapshot();
        assert_eq!(result.tests, 2);
        assert_eq!(result.failures, 1);
        assert_eq!(result.ignored, 1);
        assert!(!result.is_success());
    }

    #[test]
    fn test_console_lines_attributed_to_current_set() {
        let reporter = Arc::new(RecordingReporter::new());
        let relay = ConsoleRelay::new(reporter.clone());

        relay.push_line("before any set");
        relay.enter_test_set("com.acme.FooTest");
        relay.push_line("inside foo");
        relay.leave_test_set();
        relay.push_line("between sets");

        let lines = reporter.console_lines();
        assert_eq!(
            lines,
            vec![
                (None, "before any set".to_string()),
                (Some("com.acme.FooTest".to_string()), "inside foo".to_string()),
                (None, "between sets".to_string()),
            ]
        );
    }

    #[test]
    fn test_console_attach_drains_stream() {
        let reporter = Arc::new(RecordingReporter::new());
        let relay = ConsoleRelay::new(reporter.clone());
        relay.enter_test_set("com.acme.FooTest");

        let stream: Box<dyn Read + Send> = Box::new(std::io::Cursor::new(b"one\ntwo\n".to_vec()));
        relay.attach(stream).join().unwrap();

        let lines = reporter.console_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].1, "one");
    }
}
