//! Logger sink carried by the build configuration
//!
//! The compiler, resolver, and assembler all report through the same
//! injected sink rather than a global logger. Debug lines are gated by the
//! debug-logging option.

use std::sync::Arc;

/// Logging sink injected into the build configuration
pub trait Logger: Send + Sync {
    fn debug(&self, line: &str);
    fn info(&self, line: &str);
    fn warn(&self, line: &str);
    fn error(&self, line: &str);
}

/// Console logger with severity prefixes
///
/// Debug output is only emitted when `debug_enabled` is set.
pub struct ConsoleLogger {
    debug_enabled: bool,
}

impl ConsoleLogger {
    pub fn new(debug_enabled: bool) -> Self {
        Self { debug_enabled }
    }

    /// Shared handle, ready to store on a build configuration
    pub fn shared(debug_enabled: bool) -> Arc<dyn Logger> {
        Arc::new(Self::new(debug_enabled))
    }
}

impl Logger for ConsoleLogger {
    fn debug(&self, line: &str) {
        if self.debug_enabled {
            println!("[DEBUG] {}", line);
        }
    }

    fn info(&self, line: &str) {
        println!("[INFO] {}", line);
    }

    fn warn(&self, line: &str) {
        println!("[WARNING] {}", line);
    }

    fn error(&self, line: &str) {
        eprintln!("[ERROR] {}", line);
    }
}

/// Logger that discards everything
pub struct NullLogger;

impl Logger for NullLogger {
    fn debug(&self, _line: &str) {}
    fn info(&self, _line: &str) {}
    fn warn(&self, _line: &str) {}
    fn error(&self, _line: &str) {}
}

impl NullLogger {
    pub fn shared() -> Arc<dyn Logger> {
        Arc::new(NullLogger)
    }
}
