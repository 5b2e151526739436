//! In-memory fakes for tests (testing only)
//!
//! Provides `RecordingRunner`, a [`CommandRunner`] that records every
//! invocation and returns scripted exit statuses without spawning anything.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use crate::error::RunnerError;
use crate::runner::{CommandRunner, Invocation};

/// Records invocations; answers with queued statuses, then `0`.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Invocation>>,
    statuses: Mutex<VecDeque<i32>>,
    unspawnable: HashSet<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `statuses` in order for successive runs.
    pub fn with_statuses(statuses: impl IntoIterator<Item = i32>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Make every run of `program` fail as if it could not be spawned.
    pub fn fail_spawn_of(mut self, program: &str) -> Self {
        self.unspawnable.insert(program.to_string());
        self
    }

    /// Everything run so far, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> Result<i32, RunnerError> {
        self.calls.lock().unwrap().push(invocation.clone());
        if invocation.program.is_empty() {
            return Err(RunnerError::EmptyCommand);
        }
        if self.unspawnable.contains(&invocation.program) {
            return Err(RunnerError::Spawn {
                program: invocation.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        Ok(self.statuses.lock().unwrap().pop_front().unwrap_or(0))
    }
}
