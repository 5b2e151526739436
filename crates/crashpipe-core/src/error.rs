//! Error taxonomy for crashpipe.
//!
//! Capture never fails (it degrades to draining), so there is no capture
//! error here. Everything else has its own enum and rolls up into
//! [`CrashpipeError`].

use std::path::PathBuf;

/// Errors produced by a [`crate::runner::CommandRunner`].
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The caller handed over an invocation with no program.
    #[error("empty command: no program to run")]
    EmptyCommand,

    /// The program could not be started at all.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors produced while packaging a captured core file.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("compression command could not run: {0}")]
    Compress(#[source] RunnerError),

    #[error("compression exited with status {status}")]
    CompressFailed { status: i32 },

    #[error("removal command could not run: {0}")]
    Remove(#[source] RunnerError),

    #[error("removal exited with status {status}")]
    RemoveFailed { status: i32 },
}

/// Errors produced while registering with the kernel.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// `core_pattern` is split on whitespace, so such a directory would be
    /// cut in half on every crash.
    #[error("log directory {logdir:?} contains whitespace")]
    InvalidLogDir { logdir: String },

    #[error("could not resolve real path of {path}: {source}")]
    ResolveProgram {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not open {path} for installation: {source}")]
    OpenConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors produced while writing the JSON crash report sidecar.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("report io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("report serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Top-level crashpipe errors.
#[derive(Debug, thiserror::Error)]
pub enum CrashpipeError {
    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for crashpipe operations.
pub type Result<T> = std::result::Result<T, CrashpipeError>;
