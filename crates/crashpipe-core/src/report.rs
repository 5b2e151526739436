//! JSON crash report written next to the archive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{OpenOptions, Permissions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;
use tracing::debug;

use crate::capture::{CaptureOutcome, CORE_FILE_MODE};
use crate::descriptor::{CoreArtifacts, CrashDescriptor};
use crate::error::ReportError;

/// Summary of one crash as persisted to `<core>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashReport {
    pub pid: i32,
    pub signal: i32,
    pub uid: u32,
    pub gid: u32,
    pub captured_at: DateTime<Utc>,
    pub total_bytes: u64,
    pub bytes_written: u64,
    pub persisted: bool,
    pub sha256: String,
    pub core_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_file: Option<String>,
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_error: Option<String>,
}

impl CrashReport {
    pub fn new(
        descriptor: &CrashDescriptor,
        artifacts: &CoreArtifacts,
        capture: &CaptureOutcome,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            pid: descriptor.pid,
            signal: descriptor.signal,
            uid: descriptor.uid,
            gid: descriptor.gid,
            captured_at,
            total_bytes: capture.total_bytes,
            bytes_written: capture.bytes_written,
            persisted: capture.persisted,
            sha256: capture.sha256.clone(),
            core_file: artifacts.core_name().to_string(),
            archive_file: None,
            archived: false,
            archive_error: None,
        }
    }

    /// Mark the archive step as done.
    pub fn archived_as(mut self, archive_file: String) -> Self {
        self.archive_file = Some(archive_file);
        self.archived = true;
        self.archive_error = None;
        self
    }

    /// Record why the archive step did not complete.
    pub fn archive_failed(mut self, error: String) -> Self {
        self.archived = false;
        self.archive_error = Some(error);
        self
    }

    /// Write the report as pretty JSON with mode 0600.
    pub fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_vec_pretty(self)?;
        let io_err = |source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(CORE_FILE_MODE)
            .open(path)
            .map_err(io_err)?;
        file.set_permissions(Permissions::from_mode(CORE_FILE_MODE))
            .map_err(io_err)?;
        file.write_all(&json).map_err(io_err)?;
        file.write_all(b"\n").map_err(io_err)?;

        debug!(path = %path.display(), "crash report written");
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, ReportError> {
        let bytes = std::fs::read(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
