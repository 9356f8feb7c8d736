//! Remote process ownership
//!
//! Exactly one `RemoteProcessHandle` exists per run. It owns the launched
//! child for the run's duration and reclaims it on every control-flow exit:
//! the bounded grace wait after termination covers the cooperative path,
//! and the drop guard covers every other path, including unwinds.

use std::io;
use std::time::{Duration, Instant};

/// Default grace period between the termination signal and a forced kill
pub const DEFAULT_EXIT_GRACE: Duration = Duration::from_secs(15);

/// Poll interval while waiting for the child to exit
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Process lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to poll remote process: {0}")]
    Poll(#[source] io::Error),

    #[error("failed to kill remote process: {0}")]
    Kill(#[source] io::Error),
}

/// How the remote process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exited on its own with this status
    Exited(i32),

    /// Still alive after the grace period and forcibly killed
    Killed,
}

/// Minimal surface of a launched child process
pub trait RemoteProcess: Send {
    /// Non-blocking exit check; `Some(status)` once the process has exited.
    fn try_wait(&mut self) -> io::Result<Option<i32>>;

    /// Forcibly terminate the process.
    fn kill(&mut self) -> io::Result<()>;
}

impl RemoteProcess for std::process::Child {
    fn try_wait(&mut self) -> io::Result<Option<i32>> {
        Ok(std::process::Child::try_wait(self)?.map(|status| status.code().unwrap_or(-1)))
    }

    fn kill(&mut self) -> io::Result<()> {
        match std::process::Child::kill(self) {
            Ok(()) => Ok(()),
            // Already exited counts as reclaimed.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Owner of the live remote process for one run
pub struct RemoteProcessHandle {
    process: Option<Box<dyn RemoteProcess>>,
    grace: Duration,
}

impl RemoteProcessHandle {
    pub fn new(process: Box<dyn RemoteProcess>) -> Self {
        Self {
            process: Some(process),
            grace: DEFAULT_EXIT_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Non-blocking liveness check. `Some(status)` means the process has
    /// already exited; the handle is then considered reclaimed.
    pub fn poll_exit(&mut self) -> Result<Option<i32>, ProcessError> {
        let Some(process) = self.process.as_mut() else {
            return Ok(None);
        };
        match process.try_wait().map_err(ProcessError::Poll)? {
            Some(status) => {
                self.process = None;
                Ok(Some(status))
            }
            None => Ok(None),
        }
    }

    /// Wait for the process to exit after the termination signal has been
    /// sent through the client channel. The wait is bounded by the grace
    /// period; a process still alive afterwards is forcibly killed.
    pub fn wait_with_grace(&mut self) -> Result<ExitOutcome, ProcessError> {
        let Some(mut process) = self.process.take() else {
            return Ok(ExitOutcome::Exited(0));
        };

        let deadline = Instant::now() + self.grace;
        loop {
            match process.try_wait() {
                Ok(Some(status)) => return Ok(ExitOutcome::Exited(status)),
                Ok(None) => {}
                Err(e) => {
                    // Reclaim before surfacing the poll failure.
                    let _ = process.kill();
                    return Err(ProcessError::Poll(e));
                }
            }
            if Instant::now() >= deadline {
                process.kill().map_err(ProcessError::Kill)?;
                return Ok(ExitOutcome::Killed);
            }
            std::thread::sleep(EXIT_POLL_INTERVAL);
        }
    }

    /// Best-effort forced destroy. Safe to call on any path; idempotent.
    pub fn destroy(&mut self) {
        if let Some(mut process) = self.process.take() {
            let _ = process.kill();
        }
    }

    /// Whether the underlying process has been reclaimed
    pub fn is_reclaimed(&self) -> bool {
        self.process.is_none()
    }
}

impl Drop for RemoteProcessHandle {
    fn drop(&mut self) {
        self.destroy();
    }
}
