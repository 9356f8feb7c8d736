//! Host reporting surface
//!
//! Report entries and the reporter trait are the produced interface toward
//! the host's reporting/aggregation sink. `ReporterListener` is the
//! host-native half of the relay: it adapts per-test lifecycle events onto
//! the reporter so a test executed in the remote process reads exactly
//! like a local one.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logger::Logger;
use crate::relay::{RunListener, RunResult, TestDescription, TestFailureInfo};

/// Schema version for run_summary.json
pub const RUN_SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for run_summary.json
pub const RUN_SUMMARY_SCHEMA_ID: &str = "avm-test/run_summary@1";

/// One report entry: source, test-set name, optional failure cause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Component that produced the entry
    pub source_name: String,

    /// Test-set (class) name
    pub name: String,

    /// Failure cause, set on test-error entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ReportEntry {
    pub fn new(source_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            name: name.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

/// The host's reporting sink
#[allow(unused_variables)]
pub trait Reporter: Send + Sync {
    fn test_set_starting(&self, entry: &ReportEntry);
    fn test_set_completed(&self, entry: &ReportEntry);

    /// A whole test set failed to execute; reported as a single error
    fn test_error(&self, entry: &ReportEntry);

    fn test_starting(&self, description: &TestDescription) {}
    fn test_succeeded(&self, description: &TestDescription) {}
    fn test_failed(&self, failure: &TestFailureInfo) {}
    fn test_assumption_failure(&self, failure: &TestFailureInfo) {}
    fn test_ignored(&self, description: &TestDescription) {}

    /// Console output from the remote process, attributed to a test set
    fn console_output(&self, test_set: Option<&str>, line: &str) {}
}

/// Adapts notifier events onto the reporter
///
/// Tracks whether the current test already failed so completion reports
/// as success only for clean tests.
pub struct ReporterListener {
    reporter: Arc<dyn Reporter>,
    current_failed: bool,
}

impl ReporterListener {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            reporter,
            current_failed: false,
        }
    }
}

impl RunListener for ReporterListener {
    fn test_started(&mut self, description: &TestDescription) {
        self.current_failed = false;
        self.reporter.test_starting(description);
    }

    fn test_finished(&mut self, description: &TestDescription) {
        if !self.current_failed {
            self.reporter.test_succeeded(description);
        }
        self.current_failed = false;
    }

    fn test_failure(&mut self, failure: &TestFailureInfo) {
        self.current_failed = true;
        self.reporter.test_failed(failure);
    }

    fn test_assumption_failure(&mut self, failure: &TestFailureInfo) {
        self.current_failed = true;
        self.reporter.test_assumption_failure(failure);
    }

    fn test_ignored(&mut self, description: &TestDescription) {
        self.reporter.test_ignored(description);
    }
}

/// Reporter that writes through the logger sink
pub struct ConsoleReporter {
    logger: Arc<dyn Logger>,
}

impl ConsoleReporter {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl Reporter for ConsoleReporter {
    fn test_set_starting(&self, entry: &ReportEntry) {
        self.logger.info(&format!("Running {}", entry.name));
    }

    fn test_set_completed(&self, entry: &ReportEntry) {
        self.logger.debug(&format!("Completed {}", entry.name));
    }

    fn test_error(&self, entry: &ReportEntry) {
        let cause = entry.cause.as_deref().unwrap_or("unknown cause");
        self.logger
            .error(&format!("Test set {} failed: {}", entry.name, cause));
    }

    fn test_failed(&self, failure: &TestFailureInfo) {
        self.logger
            .error(&format!("FAILED {}: {}", failure.description, failure.message));
    }

    fn test_ignored(&self, description: &TestDescription) {
        self.logger.info(&format!("Ignored {}", description));
    }

    fn console_output(&self, test_set: Option<&str>, line: &str) {
        match test_set {
            Some(name) => self.logger.info(&format!("[{}] {}", name, line)),
            None => self.logger.info(line),
        }
    }
}

/// Overall run outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Passed,
    Failed,
    Cancelled,
}

/// Run summary artifact (run_summary.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: u32,
    pub schema_id: String,
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub outcome: RunOutcome,

    /// Tests that ran to completion
    pub tests: usize,
    pub failures: usize,
    pub assumption_failures: usize,
    pub ignored: usize,

    /// Test sets driven (one per test class)
    pub test_sets: usize,

    /// Test sets converted into a single error report
    pub test_set_errors: usize,

    pub duration_ms: u64,
    pub human_summary: String,
}

impl RunSummary {
    pub fn new(
        run_id: impl Into<String>,
        totals: RunResult,
        test_sets: usize,
        test_set_errors: usize,
        cancelled: bool,
        duration_ms: u64,
    ) -> Self {
        let outcome = if cancelled {
            RunOutcome::Cancelled
        } else if totals.is_success() && test_set_errors == 0 {
            RunOutcome::Passed
        } else {
            RunOutcome::Failed
        };

        let human_summary = format!(
            "{} tests, {} failures, {} ignored across {} test sets ({} set errors)",
            totals.tests, totals.failures, totals.ignored, test_sets, test_set_errors
        );

        Self {
            schema_version: RUN_SUMMARY_SCHEMA_VERSION,
            schema_id: RUN_SUMMARY_SCHEMA_ID.to_string(),
            run_id: run_id.into(),
            created_at: Utc::now(),
            outcome,
            tests: totals.tests,
            failures: totals.failures,
            assumption_failures: totals.assumption_failures,
            ignored: totals.ignored,
            test_sets,
            test_set_errors,
            duration_ms,
            human_summary,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Passed
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, json)
    }
}
