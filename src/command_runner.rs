//! Abstraction over external command execution for testability.
//!
//! Rendering never executes anything. The one exception is
//! [`PackageManager::installed_version`](crate::package_manager::PackageManager::installed_version),
//! which inspects the local package database through this trait.
//!
//! # Production Usage
//!
//! [`RealCommandRunner`] delegates to [`std::process::Command`].
//!
//! # Testing Usage
//!
//! [`MockCommandRunner`] records all calls and returns canned responses, enabling
//! fast, deterministic unit tests without a package manager installed.

use std::collections::HashMap;
use std::process::{Command, ExitStatus, Output};
use std::sync::Mutex;

use crate::error::Result;

/// Trait for abstracting external command execution.
pub trait CommandRunner: Send + Sync {
    /// Run a command and capture its full output (stdout + stderr + exit status).
    fn run_output(&self, program: &str, args: &[&str]) -> Result<Output>;
}

/// Production implementation that delegates to [`std::process::Command`].
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run_output(&self, program: &str, args: &[&str]) -> Result<Output> {
        Ok(Command::new(program).args(args).output()?)
    }
}

/// Test implementation returning canned responses keyed by the full command line.
///
/// Unregistered commands exit with status 1 and empty output.
#[derive(Default)]
pub struct MockCommandRunner {
    responses: HashMap<String, (i32, String)>,
    calls: Mutex<Vec<String>>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a response for `command_line` (program and args joined by spaces).
    pub fn respond(mut self, command_line: &str, exit_code: i32, stdout: &str) -> Self {
        self.responses
            .insert(command_line.to_string(), (exit_code, stdout.to_string()));
        self
    }

    /// Command lines invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl CommandRunner for MockCommandRunner {
    fn run_output(&self, program: &str, args: &[&str]) -> Result<Output> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line.clone());
        }

        let (code, stdout) = self
            .responses
            .get(&line)
            .cloned()
            .unwrap_or((1, String::new()));

        Ok(Output {
            status: exit_status(code),
            stdout: stdout.into_bytes(),
            stderr: Vec::new(),
        })
    }
}

#[cfg(unix)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(not(unix))]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}
