//! Archiver: package a captured core file as `.tar.gz`, then remove it.

use std::path::PathBuf;
use tracing::{info, warn};

use crate::descriptor::CoreArtifacts;
use crate::error::ArchiveError;
use crate::runner::{CommandRunner, Invocation};

/// Program used for the removal step.
pub const REMOVE_PROGRAM: &str = "rm";

/// Result of a successful archive step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutcome {
    pub archive_path: PathBuf,
}

/// Compresses core files through a [`CommandRunner`].
pub struct Archiver<R> {
    runner: R,
    tar_program: String,
}

impl<R: CommandRunner> Archiver<R> {
    pub fn new(runner: R, tar_program: &str) -> Self {
        Self {
            runner,
            tar_program: tar_program.to_string(),
        }
    }

    /// Invocation that packs the core file into its archive.
    pub fn compress_invocation(&self, artifacts: &CoreArtifacts) -> Invocation {
        Invocation::new(&self.tar_program)
            .arg("-czf")
            .arg(artifacts.archive_path())
            .arg("-C")
            .arg(artifacts.directory())
            .arg(artifacts.core_name())
    }

    /// Invocation that deletes the original core file.
    pub fn remove_invocation(&self, artifacts: &CoreArtifacts) -> Invocation {
        Invocation::new(REMOVE_PROGRAM)
            .arg("-f")
            .arg("--")
            .arg(artifacts.core_path())
    }

    /// Invocation that deletes a partial or stale archive.
    pub fn discard_invocation(&self, artifacts: &CoreArtifacts) -> Invocation {
        Invocation::new(REMOVE_PROGRAM)
            .arg("-f")
            .arg("--")
            .arg(artifacts.archive_path())
    }

    /// Compress the core file, and only if that succeeded, remove it.
    ///
    /// When compression fails the archive path is cleared, so the directory
    /// never holds a truncated or older archive next to the fresh core.
    pub fn archive(&self, artifacts: &CoreArtifacts) -> Result<ArchiveOutcome, ArchiveError> {
        let compressed = match self.runner.run(&self.compress_invocation(artifacts)) {
            Ok(0) => Ok(()),
            Ok(status) => Err(ArchiveError::CompressFailed { status }),
            Err(e) => Err(ArchiveError::Compress(e)),
        };
        if let Err(e) = compressed {
            self.discard_archive(artifacts);
            return Err(e);
        }

        let status = self
            .runner
            .run(&self.remove_invocation(artifacts))
            .map_err(ArchiveError::Remove)?;
        if status != 0 {
            return Err(ArchiveError::RemoveFailed { status });
        }

        let archive_path = artifacts.archive_path();
        info!(archive = %archive_path.display(), "core file archived");
        Ok(ArchiveOutcome { archive_path })
    }

    fn discard_archive(&self, artifacts: &CoreArtifacts) {
        match self.runner.run(&self.discard_invocation(artifacts)) {
            Ok(0) => {}
            Ok(status) => warn!(status, "could not remove incomplete archive"),
            Err(e) => warn!(error = %e, "could not remove incomplete archive"),
        }
    }
}
