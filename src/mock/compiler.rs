//! Mock compiler with build/launch recording and failure injection

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use crate::compiler::{Compiler, CompilerError, Launched};
use crate::config::{Arch, BuildConfig, Os};
use crate::launch::LaunchParameters;
use crate::mock::MockProcessState;

/// Snapshot of one build invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    pub os: Os,
    pub arch: Arch,
    pub classpath: Vec<String>,
    pub force_link: Vec<String>,
    pub skip_install: bool,
}

/// Shared record of compiler activity; stays readable after the compiler
/// moves into the bridge
#[derive(Clone, Default)]
pub struct CompilerLog {
    builds: Arc<Mutex<Vec<BuildRecord>>>,
    launches: Arc<Mutex<Vec<LaunchParameters>>>,
}

impl CompilerLog {
    pub fn builds(&self) -> Vec<BuildRecord> {
        self.builds.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn launches(&self) -> Vec<LaunchParameters> {
        self.launches.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

/// In-process mock of the external compiler/launcher
pub struct MockCompiler {
    process: Arc<MockProcessState>,
    log: CompilerLog,
    console_script: Mutex<Option<Vec<u8>>>,
    fail_build: Option<i32>,
    fail_launch: Option<String>,
}

impl MockCompiler {
    pub fn new() -> Self {
        Self {
            process: MockProcessState::shared(),
            log: CompilerLog::default(),
            console_script: Mutex::new(None),
            fail_build: None,
            fail_launch: None,
        }
    }

    /// The process state the next launch hands out
    pub fn process_state(&self) -> Arc<MockProcessState> {
        Arc::clone(&self.process)
    }

    /// Handle over the compiler's activity record
    pub fn log(&self) -> CompilerLog {
        self.log.clone()
    }

    pub fn fail_build(&mut self, status: i32) {
        self.fail_build = Some(status);
    }

    pub fn fail_launch(&mut self, message: &str) {
        self.fail_launch = Some(message.to_string());
    }

    /// Console bytes the launched process writes to stdout
    pub fn set_console(&mut self, bytes: &[u8]) {
        if let Ok(mut script) = self.console_script.lock() {
            *script = Some(bytes.to_vec());
        }
    }

    pub fn builds(&self) -> Vec<BuildRecord> {
        self.log.builds()
    }

    pub fn launches(&self) -> Vec<LaunchParameters> {
        self.log.launches()
    }
}

impl Default for MockCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler for MockCompiler {
    fn build(&self, config: &BuildConfig) -> Result<(), CompilerError> {
        if let Some(status) = self.fail_build {
            return Err(CompilerError::Build { status });
        }
        if let Ok(mut builds) = self.log.builds.lock() {
            builds.push(BuildRecord {
                os: config.os(),
                arch: config.arch(),
                classpath: config.classpath().iter().map(|e| e.to_string()).collect(),
                force_link: config.force_link_classes().to_vec(),
                skip_install: config.skip_install(),
            });
        }
        Ok(())
    }

    fn launch(
        &self,
        _config: &BuildConfig,
        params: &LaunchParameters,
    ) -> Result<Launched, CompilerError> {
        if let Some(message) = &self.fail_launch {
            return Err(CompilerError::Launch(message.clone()));
        }
        if let Ok(mut launches) = self.log.launches.lock() {
            launches.push(params.clone());
        }
        let console = self
            .console_script
            .lock()
            .ok()
            .and_then(|mut script| script.take())
            .map(|bytes| Box::new(Cursor::new(bytes)) as Box<dyn std::io::Read + Send>);

        Ok(Launched {
            process: Box::new(self.process.process()),
            console,
        })
    }
}
