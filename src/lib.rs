//! AVM Test Bridge
//!
//! Host side of a cross-compiled test run: assembles the build
//! configuration for a foreign target, drives the external AOT compiler,
//! launches the produced binary as a child process, executes the selected
//! test methods inside it through the remote test client, and relays every
//! lifecycle event back into the host's reporting pipeline.

pub mod assembler;
pub mod bridge;
pub mod client;
pub mod compiler;
pub mod config;
pub mod device;
pub mod discovery;
pub mod executor;
pub mod home;
pub mod launch;
pub mod logger;
pub mod mock;
pub mod options;
pub mod process;
pub mod relay;
pub mod report;
pub mod resolver;
pub mod selection;
pub mod signing;

pub use bridge::{BridgeError, TestBridge, TestBridgeBuilder};
pub use config::{BuildConfig, BuildConfigBuilder};
pub use options::RunOptions;
pub use report::RunSummary;
pub use selection::TestUnit;
