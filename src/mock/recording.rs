//! Recording listener and reporter for assertions on event flow

use std::sync::{Arc, Mutex};

use crate::relay::{RunListener, TestDescription, TestFailureInfo};
use crate::report::{ReportEntry, Reporter};

/// Events as seen by a listener, flattened for comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeenEvent {
    RunStarted(usize),
    RunFinished,
    TestStarted(String),
    TestFinished(String),
    TestFailure(String, String),
    TestAssumptionFailure(String, String),
    TestIgnored(String),
}

/// Shared read handle over a recording listener's event log
#[derive(Clone)]
pub struct EventLog {
    events: Arc<Mutex<Vec<SeenEvent>>>,
}

impl EventLog {
    pub fn snapshot(&self) -> Vec<SeenEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

/// Listener that records every event it sees
pub struct RecordingListener {
    events: Arc<Mutex<Vec<SeenEvent>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn events(&self) -> EventLog {
        EventLog {
            events: Arc::clone(&self.events),
        }
    }

    fn record(&self, event: SeenEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Default for RecordingListener {
    fn default() -> Self {
        Self::new()
    }
}

impl RunListener for RecordingListener {
    fn run_started(&mut self, test_count: usize) {
        self.record(SeenEvent::RunStarted(test_count));
    }

    fn run_finished(&mut self) {
        self.record(SeenEvent::RunFinished);
    }

    fn test_started(&mut self, description: &TestDescription) {
        self.record(SeenEvent::TestStarted(description.to_string()));
    }

    fn test_finished(&mut self, description: &TestDescription) {
        self.record(SeenEvent::TestFinished(description.to_string()));
    }

    fn test_failure(&mut self, failure: &TestFailureInfo) {
        self.record(SeenEvent::TestFailure(
            failure.description.to_string(),
            failure.message.clone(),
        ));
    }

    fn test_assumption_failure(&mut self, failure: &TestFailureInfo) {
        self.record(SeenEvent::TestAssumptionFailure(
            failure.description.to_string(),
            failure.message.clone(),
        ));
    }

    fn test_ignored(&mut self, description: &TestDescription) {
        self.record(SeenEvent::TestIgnored(description.to_string()));
    }
}

/// Reporter calls, flattened for comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedCall {
    SetStarting(String),
    SetCompleted(String),
    TestError { name: String, cause: String },
    Starting(String),
    Succeeded(String),
    Failed(String),
    AssumptionFailure(String),
    Ignored(String),
    Console(Option<String>, String),
}

/// Reporter that records every call it receives
pub struct RecordingReporter {
    calls: Mutex<Vec<ReportedCall>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: ReportedCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    pub fn calls(&self) -> Vec<ReportedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn set_starting(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ReportedCall::SetStarting(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn set_completed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ReportedCall::SetCompleted(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ReportedCall::TestError { name, cause } => Some((name, cause)),
                _ => None,
            })
            .collect()
    }

    pub fn succeeded(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ReportedCall::Succeeded(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn failed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ReportedCall::Failed(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn console_lines(&self) -> Vec<(Option<String>, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ReportedCall::Console(set, line) => Some((set, line)),
                _ => None,
            })
            .collect()
    }
}

impl Default for RecordingReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for RecordingReporter {
    fn test_set_starting(&self, entry: &ReportEntry) {
        self.record(ReportedCall::SetStarting(entry.name.clone()));
    }

    fn test_set_completed(&self, entry: &ReportEntry) {
        self.record(ReportedCall::SetCompleted(entry.name.clone()));
    }

    fn test_error(&self, entry: &ReportEntry) {
        self.record(ReportedCall::TestError {
            name: entry.name.clone(),
            cause: entry.cause.clone().unwrap_or_default(),
        });
    }

    fn test_starting(&self, description: &TestDescription) {
        self.record(ReportedCall::Starting(description.to_string()));
    }

    fn test_succeeded(&self, description: &TestDescription) {
        self.record(ReportedCall::Succeeded(description.to_string()));
    }

    fn test_failed(&self, failure: &TestFailureInfo) {
        self.record(ReportedCall::Failed(failure.description.to_string()));
    }

    fn test_assumption_failure(&self, failure: &TestFailureInfo) {
        self.record(ReportedCall::AssumptionFailure(
            failure.description.to_string(),
        ));
    }

    fn test_ignored(&self, description: &TestDescription) {
        self.record(ReportedCall::Ignored(description.to_string()));
    }

    fn console_output(&self, test_set: Option<&str>, line: &str) {
        self.record(ReportedCall::Console(
            test_set.map(|s| s.to_string()),
            line.to_string(),
        ));
    }
}
