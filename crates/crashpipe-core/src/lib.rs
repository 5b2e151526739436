//! crashpipe: kernel core dump pipe helper
//!
//! The kernel runs `crashpipe <pid> <signal> <uid> <gid> [dir]` through
//! `core_pattern` and writes the core image to its stdin. This crate
//! drains that stream to disk, packages it as `.tar.gz`, and writes a
//! JSON report next to it.
//!
//! ## Key Components
//!
//! - [`capture`]: bounded-memory copy from stdin to the core file
//! - [`archive`]: compress-then-remove through a [`CommandRunner`]
//! - [`runner`]: argv-based child process execution
//! - [`install`]: `core_pattern` / `core_pipe_limit` registration
//! - [`pipeline`]: the capture → archive → report sequence

pub mod archive;
pub mod capture;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod fakes;
pub mod install;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod telemetry;

pub use archive::{ArchiveOutcome, Archiver};
pub use capture::{announce_total, capture, CaptureOutcome, CHUNK_SIZE};
pub use config::HandlerConfig;
pub use descriptor::{CoreArtifacts, CrashDescriptor, NamingPolicy};
pub use error::{ArchiveError, CrashpipeError, InstallError, ReportError, Result, RunnerError};
pub use install::{
    core_pattern_line, install, install_current_exe, logdir_from_arg, Installation,
};
pub use pipeline::{ArchiveStatus, CrashOutcome, CrashPipeline};
pub use report::CrashReport;
pub use runner::{CommandRunner, Invocation, ProcessRunner};
pub use telemetry::init_tracing;
