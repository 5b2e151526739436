//! Capture writer: stream the core image from stdin into a file.
//!
//! The input is always drained to EOF. If the destination cannot be opened,
//! or a write fails part way through, the remaining bytes are read and
//! discarded so the kernel never blocks on a full pipe.

use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions, Permissions};
use std::io::{ErrorKind, Read, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;
use tracing::{debug, warn};

/// Read size for each pass through the drain loop.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Core dumps can hold process memory; only the owner may read them.
pub const CORE_FILE_MODE: u32 = 0o600;

/// What happened during a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    /// Bytes read from the input.
    pub total_bytes: u64,
    /// Bytes that reached the destination file.
    pub bytes_written: u64,
    /// Whether the destination file was opened at all.
    pub opened: bool,
    /// Whether every byte read was also written.
    pub persisted: bool,
    /// Hex SHA-256 of the whole input stream.
    pub sha256: String,
}

/// Copy `input` into `destination` until EOF.
///
/// The destination is created (or truncated) with mode 0600.
pub fn capture<R: Read>(input: R, destination: &Path) -> CaptureOutcome {
    let file = match open_destination(destination) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!(
                path = %destination.display(),
                error = %e,
                "cannot open core file, draining input without persisting"
            );
            None
        }
    };
    let (outcome, file) = drain(input, file, destination);

    if let Some(file) = file {
        if let Err(e) = file.sync_all() {
            warn!(path = %destination.display(), error = %e, "sync of core file failed");
        }
    }

    debug!(
        total_bytes = outcome.total_bytes,
        bytes_written = outcome.bytes_written,
        "capture finished"
    );

    outcome
}

/// Drain `input` into `sink`, dropping the sink on its first write error.
///
/// Returns the sink only if it survived to EOF.
fn drain<R: Read, W: Write>(
    mut input: R,
    mut sink: Option<W>,
    destination: &Path,
) -> (CaptureOutcome, Option<W>) {
    let opened = sink.is_some();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut hasher = Sha256::new();
    let mut total_bytes = 0u64;
    let mut bytes_written = 0u64;
    let mut write_failed = false;

    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, total_bytes, "read from core stream failed, stopping");
                break;
            }
        };
        let chunk = &buf[..n];
        hasher.update(chunk);
        total_bytes += n as u64;

        if let Some(writer) = sink.as_mut() {
            match writer.write_all(chunk) {
                Ok(()) => bytes_written += n as u64,
                Err(e) => {
                    warn!(
                        path = %destination.display(),
                        error = %e,
                        bytes_written,
                        "write to core file failed, draining remainder"
                    );
                    write_failed = true;
                    sink = None;
                }
            }
        }
    }

    let outcome = CaptureOutcome {
        total_bytes,
        bytes_written,
        opened,
        persisted: opened && !write_failed,
        sha256: hex::encode(hasher.finalize()),
    };
    (outcome, sink)
}

fn open_destination(path: &Path) -> std::io::Result<File> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(CORE_FILE_MODE)
        .open(path)?;
    // `mode` only applies on create; an existing file keeps its old bits.
    file.set_permissions(Permissions::from_mode(CORE_FILE_MODE))?;
    Ok(file)
}

/// Write the byte-count line to both output channels.
pub fn announce_total<O: Write, E: Write>(total_bytes: u64, out: &mut O, err: &mut E) {
    let line = format!("Total bytes in core dump: {total_bytes}\n");
    if let Err(e) = err.write_all(line.as_bytes()).and_then(|_| err.flush()) {
        debug!(error = %e, "could not write byte count to stderr");
    }
    if let Err(e) = out.write_all(line.as_bytes()).and_then(|_| out.flush()) {
        debug!(error = %e, "could not write byte count to stdout");
    }
}
