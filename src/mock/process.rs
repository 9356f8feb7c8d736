//! Mock remote process with shared, inspectable state

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::process::RemoteProcess;

/// Shared state behind one mock process. Tests and the mock client hold
/// the state; the executor holds the `MockProcess` view.
#[derive(Debug, Default)]
pub struct MockProcessState {
    exit_status: Mutex<Option<i32>>,
    kills: AtomicUsize,
}

impl MockProcessState {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The process view handed to the launch path
    pub fn process(self: &Arc<Self>) -> MockProcess {
        MockProcess {
            state: Arc::clone(self),
        }
    }

    /// Mark the process as exited with `status`
    pub fn mark_exited(&self, status: i32) {
        if let Ok(mut exit) = self.exit_status.lock() {
            exit.get_or_insert(status);
        }
    }

    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status.lock().ok().and_then(|exit| *exit)
    }

    pub fn is_alive(&self) -> bool {
        self.exit_status().is_none()
    }

    pub fn was_killed(&self) -> bool {
        self.kills.load(Ordering::SeqCst) > 0
    }

    fn record_kill(&self) {
        self.kills.fetch_add(1, Ordering::SeqCst);
        self.mark_exited(-9);
    }
}

/// `RemoteProcess` view over the shared state
pub struct MockProcess {
    state: Arc<MockProcessState>,
}

impl RemoteProcess for MockProcess {
    fn try_wait(&mut self) -> io::Result<Option<i32>> {
        Ok(self.state.exit_status())
    }

    fn kill(&mut self) -> io::Result<()> {
        self.state.record_kill();
        Ok(())
    }
}
