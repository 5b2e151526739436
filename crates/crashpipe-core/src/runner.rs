//! Command runner: the only place crashpipe starts another executable.
//!
//! Commands are argument vectors handed straight to `execve`; no shell is
//! involved, so directory names are never re-parsed.

use std::ffi::{OsStr, OsString};
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, warn};

use crate::error::RunnerError;

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Human-readable rendering for logs.
    pub fn display(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_string_lossy());
        }
        out
    }
}

/// Runs an [`Invocation`] to completion and reports its exit status.
///
/// `Ok(status)` means the child ran; `0` is success. `Err` means nothing ran.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<i32, RunnerError>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, invocation: &Invocation) -> Result<i32, RunnerError> {
        (**self).run(invocation)
    }
}

/// [`CommandRunner`] backed by real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<i32, RunnerError> {
        if invocation.program.trim().is_empty() {
            return Err(RunnerError::EmptyCommand);
        }

        debug!(command = %invocation.display(), "running command");

        // Output pipes are owned by `output` and closed when it drops.
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| RunnerError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let status = exit_code(output.status);
        if status != 0 {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                command = %invocation.display(),
                status,
                stderr = %stderr.trim(),
                "command exited unsuccessfully"
            );
        }
        Ok(status)
    }
}

/// Exit code, or `128 + signo` when the child was killed by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signo)) => 128 + signo,
        (None, None) => -1,
    }
}
