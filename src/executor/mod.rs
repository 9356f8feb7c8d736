//! Test-set executor
//!
//! Drives test classes one at a time against the remote client. A unit's
//! failure is isolated into a single test-error report; the completed
//! report for every started unit is guaranteed by a scoped guard. The
//! remote process always receives its termination signal before the host
//! waits for it to exit, and the wait is bounded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::client::{ClientError, TestClient};
use crate::process::{ExitOutcome, ProcessError, RemoteProcessHandle};
use crate::relay::{ConsoleRelay, NotifierHandle};
use crate::report::{ReportEntry, Reporter};
use crate::selection::TestUnit;

/// Source name stamped on test-set report entries
pub const SOURCE_NAME: &str = "avm-test-bridge";

/// Fatal execution errors; anything here aborts the run after best-effort
/// process cleanup. Per-unit failures never surface through this type.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// The remote process died before the run was over
    #[error("remote process exited unexpectedly with status {status}")]
    UnexpectedExit { status: i32 },

    /// The termination signal could not be delivered
    #[error("failed to terminate remote test run: {0}")]
    Terminate(#[source] ClientError),

    /// Waiting for process exit failed
    #[error(transparent)]
    Wait(#[from] ProcessError),
}

/// Shared cancellation flag checked between test sets
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What the executor observed across the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Units driven to a completed report
    pub test_sets: usize,

    /// Units converted into a test-error report
    pub test_set_errors: usize,

    /// The cancel flag stopped the run early
    pub cancelled: bool,

    /// How the remote process ended
    pub exit: ExitOutcome,
}

/// Sequential driver for the resolved test units
pub struct TestSetExecutor {
    source_name: String,
    cancel: CancelFlag,
}

impl TestSetExecutor {
    pub fn new() -> Self {
        Self {
            source_name: SOURCE_NAME.to_string(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Drive `units` in order, then terminate the remote process and wait
    /// for its exit. The handle is reclaimed on every exit path: the
    /// bounded wait covers the cooperative path, explicit destroy covers
    /// the error paths, and the handle's drop guard covers unwinds.
    pub fn execute(
        &self,
        units: &[TestUnit],
        client: &mut dyn TestClient,
        notifier: &NotifierHandle,
        reporter: &Arc<dyn Reporter>,
        console: &ConsoleRelay,
        handle: &mut RemoteProcessHandle,
    ) -> Result<ExecOutcome, ExecError> {
        notifier.fire_run_started(units.len());

        let mut test_sets = 0;
        let mut test_set_errors = 0;
        let mut cancelled = false;

        for unit in units {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            // A process that died on its own is a run-wide failure, unlike
            // a unit whose request errored.
            match handle.poll_exit() {
                Ok(None) => {}
                Ok(Some(status)) => return Err(ExecError::UnexpectedExit { status }),
                Err(e) => {
                    handle.destroy();
                    return Err(ExecError::Wait(e));
                }
            }

            if self.execute_test_set(unit, client, reporter, console) {
                test_set_errors += 1;
            }
            test_sets += 1;
        }

        match client.terminate() {
            Ok(()) => {}
            Err(e) => {
                handle.destroy();
                return Err(ExecError::Terminate(e));
            }
        }

        let exit = handle.wait_with_grace()?;
        notifier.fire_run_finished();

        Ok(ExecOutcome {
            test_sets,
            test_set_errors,
            cancelled,
            exit,
        })
    }

    /// Drive one unit. Returns true when the unit's request failed and was
    /// converted into a test-error report. The completed report and the
    /// console de-association are emitted on every path by the guard.
    fn execute_test_set(
        &self,
        unit: &TestUnit,
        client: &mut dyn TestClient,
        reporter: &Arc<dyn Reporter>,
        console: &ConsoleRelay,
    ) -> bool {
        let entry = ReportEntry::new(&self.source_name, &unit.class.name);
        reporter.test_set_starting(&entry);
        console.enter_test_set(&unit.class.name);

        let _guard = CompletionGuard {
            reporter: Arc::clone(reporter),
            console: console.clone(),
            entry: entry.clone(),
        };

        if unit.is_noop() {
            return false;
        }

        match client
            .run_tests(&unit.patterns)
            .and_then(|chained| chained.flush())
        {
            Ok(()) => false,
            Err(e) => {
                reporter.test_error(&entry.with_cause(e.to_string()));
                true
            }
        }
    }
}

impl Default for TestSetExecutor {
    fn default() -> Self {
        Self::new()
    }
}

struct CompletionGuard {
    reporter: Arc<dyn Reporter>,
    console: ConsoleRelay,
    entry: ReportEntry,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.console.leave_test_set();
        self.reporter.test_set_completed(&self.entry);
    }
}
