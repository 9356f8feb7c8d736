//! Remote test client boundary
//!
//! The channel through which the host requests test execution inside the
//! remote process and receives lifecycle events. The wire protocol lives
//! behind this trait; the bridge only relies on the blocking
//! request/flush discipline: a flushed request completes its unit's event
//! stream before the call returns.

use crate::config::BuildConfigBuilder;
use crate::relay::RunListener;

/// Remote client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The channel to the remote process broke
    #[error("remote channel error: {0}")]
    Channel(String),

    /// The remote process reported a request failure
    #[error("remote request failed: {0}")]
    Remote(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The remote test client
pub trait TestClient {
    /// Contribute the client's own settings (server endpoint properties
    /// and the like) to the build configuration before it is frozen.
    fn configure(
        &mut self,
        builder: BuildConfigBuilder,
        mobile_target: bool,
    ) -> Result<BuildConfigBuilder, ClientError>;

    /// Install the listener that receives remote lifecycle events.
    fn set_run_listener(&mut self, listener: Box<dyn RunListener>);

    /// Extra arguments handed to the remote test runner.
    fn set_run_args(&mut self, args: Vec<String>);

    /// Request execution of the given `Class` / `Class#method` patterns.
    /// Chainable; the request is only guaranteed delivered by `flush`.
    fn run_tests(&mut self, patterns: &[String]) -> Result<&mut dyn TestClient, ClientError>;

    /// Flush the pending request and block until the unit's completion
    /// events have been delivered.
    fn flush(&mut self) -> Result<(), ClientError>;

    /// Ask the remote process to shut down.
    fn terminate(&mut self) -> Result<(), ClientError>;
}
