//! Register crashpipe as the kernel's core dump receiver.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{InstallError, Result};

/// File under the kernel dir holding the core pattern.
pub const CORE_PATTERN_FILE: &str = "core_pattern";

/// File under the kernel dir limiting concurrent pipe helpers.
pub const CORE_PIPE_LIMIT_FILE: &str = "core_pipe_limit";

/// `0` lifts the limit on concurrently running pipe helpers.
pub const CORE_PIPE_LIMIT: u32 = 0;

/// What [`install`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub program: PathBuf,
    pub core_pattern: String,
}

/// Log directory named by an install argument.
///
/// Everything after the first `=` is the path (`--logdir=/var/crash`);
/// an argument without `=` yields an empty directory.
pub fn logdir_from_arg(arg: &str) -> &str {
    arg.split_once('=').map(|(_, dir)| dir).unwrap_or("")
}

/// Pipe line for `core_pattern`: `|<program> %p %s %u %g <logdir>`.
pub fn core_pattern_line(program: &Path, logdir: &str) -> String {
    format!("|{} %p %s %u %g {}\n", program.display(), logdir)
}

/// Point `core_pattern` at `program` and lift `core_pipe_limit`.
///
/// `program` is resolved to its canonical absolute path first.
pub fn install(
    program: &Path,
    logdir: &str,
    kernel_dir: &Path,
) -> std::result::Result<Installation, InstallError> {
    if logdir.chars().any(char::is_whitespace) {
        return Err(InstallError::InvalidLogDir {
            logdir: logdir.to_string(),
        });
    }

    let program = program
        .canonicalize()
        .map_err(|source| InstallError::ResolveProgram {
            path: program.to_path_buf(),
            source,
        })?;

    let core_pattern = core_pattern_line(&program, logdir);
    write_setting(&kernel_dir.join(CORE_PATTERN_FILE), &core_pattern)?;
    write_setting(
        &kernel_dir.join(CORE_PIPE_LIMIT_FILE),
        &format!("{CORE_PIPE_LIMIT}\n"),
    )?;

    info!(program = %program.display(), logdir, "installed as core dump handler");
    Ok(Installation {
        program,
        core_pattern,
    })
}

/// Register the running executable as the core dump handler.
pub fn install_current_exe(logdir: &str, kernel_dir: &Path) -> Result<Installation> {
    let program = std::env::current_exe()?;
    Ok(install(&program, logdir, kernel_dir)?)
}

fn write_setting(path: &Path, contents: &str) -> std::result::Result<(), InstallError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|source| InstallError::OpenConfig {
            path: path.to_path_buf(),
            source,
        })?;
    file.write_all(contents.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|source| InstallError::Write {
            path: path.to_path_buf(),
            source,
        })
}
