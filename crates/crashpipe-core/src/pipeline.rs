//! Crash pipeline: capture, then archive, then report.
//!
//! Each stage starts only after the previous one finished. Nothing after
//! capture can fail the invocation; problems are logged and kept in the
//! returned [`CrashOutcome`].

use chrono::Utc;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::archive::Archiver;
use crate::capture::{announce_total, capture, CaptureOutcome};
use crate::config::HandlerConfig;
use crate::descriptor::{CoreArtifacts, CrashDescriptor};
use crate::report::CrashReport;
use crate::runner::CommandRunner;

/// How the archive stage ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveStatus {
    Archived(PathBuf),
    Failed(String),
    /// No core file was opened, so there was nothing to archive.
    Skipped,
}

/// Result of handling one crash.
#[derive(Debug, Clone)]
pub struct CrashOutcome {
    pub artifacts: CoreArtifacts,
    pub capture: CaptureOutcome,
    pub archive: ArchiveStatus,
    pub report_path: Option<PathBuf>,
}

impl CrashOutcome {
    pub fn archived(&self) -> bool {
        matches!(self.archive, ArchiveStatus::Archived(_))
    }
}

/// Sequential crash handler.
pub struct CrashPipeline;

impl CrashPipeline {
    /// Handle one crash whose core image arrives on `input`.
    ///
    /// The byte-count line goes to both `out` and `err`.
    pub fn run<R, C, O, E>(
        descriptor: &CrashDescriptor,
        input: R,
        config: &HandlerConfig,
        runner: C,
        out: &mut O,
        err: &mut E,
    ) -> CrashOutcome
    where
        R: Read,
        C: CommandRunner,
        O: Write,
        E: Write,
    {
        let now = Utc::now();
        let artifacts = CoreArtifacts::resolve(descriptor, config.naming, now);

        info!(
            pid = descriptor.pid,
            signal = descriptor.signal,
            core = %artifacts.core_path().display(),
            "capturing core dump"
        );

        let captured = capture(input, &artifacts.core_path());
        announce_total(captured.total_bytes, out, err);

        let archive = if captured.opened {
            match Archiver::new(runner, &config.tar_program).archive(&artifacts) {
                Ok(done) => ArchiveStatus::Archived(done.archive_path),
                Err(e) => {
                    warn!(
                        pid = descriptor.pid,
                        core = %artifacts.core_path().display(),
                        error = %e,
                        "archiving failed, core file left in place"
                    );
                    ArchiveStatus::Failed(e.to_string())
                }
            }
        } else {
            ArchiveStatus::Skipped
        };

        let report_path = if config.write_report && captured.opened {
            let report = CrashReport::new(descriptor, &artifacts, &captured, now);
            let report = match &archive {
                ArchiveStatus::Archived(_) => report.archived_as(artifacts.archive_name()),
                ArchiveStatus::Failed(e) => report.archive_failed(e.clone()),
                ArchiveStatus::Skipped => report,
            };
            let path = artifacts.report_path();
            match report.write_to(&path) {
                Ok(()) => Some(path),
                Err(e) => {
                    warn!(pid = descriptor.pid, error = %e, "could not write crash report");
                    None
                }
            }
        } else {
            None
        };

        CrashOutcome {
            artifacts,
            capture: captured,
            archive,
            report_path,
        }
    }
}
