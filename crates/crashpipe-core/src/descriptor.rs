//! Crash descriptor and artifact naming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Base name of the captured core file under [`NamingPolicy::Fixed`].
pub const CORE_BASENAME: &str = "coredump";

/// Extension appended to the core base name for the archive.
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// Extension appended to the core base name for the crash report.
pub const REPORT_EXTENSION: &str = "json";

/// Metadata the kernel passes for one crash (`%p %s %u %g <dir>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashDescriptor {
    pub pid: i32,
    pub signal: i32,
    pub uid: u32,
    pub gid: u32,
    pub destination: PathBuf,
}

impl CrashDescriptor {
    pub fn new(pid: i32, signal: i32, uid: u32, gid: u32, destination: impl Into<PathBuf>) -> Self {
        Self {
            pid,
            signal,
            uid,
            gid,
            destination: destination.into(),
        }
    }

    /// Build a descriptor from the kernel's `%p %s %u %g [dir]` arguments.
    ///
    /// Returns `None` when fewer than four arguments are present. Anything
    /// past the destination is ignored, and a field that is not a number
    /// falls back to a placeholder so the core is still captured.
    pub fn from_args<S: AsRef<str>>(args: &[S], default_destination: &Path) -> Option<Self> {
        if args.len() < 4 {
            return None;
        }
        if args.len() > 5 {
            warn!(extra = args.len() - 5, "ignoring trailing crash arguments");
        }
        let destination = args
            .get(4)
            .map(|dir| PathBuf::from(dir.as_ref()))
            .unwrap_or_else(|| default_destination.to_path_buf());

        Some(Self {
            pid: parse_field(args[0].as_ref(), "pid", -1),
            signal: parse_field(args[1].as_ref(), "signal", 0),
            uid: parse_field(args[2].as_ref(), "uid", u32::MAX),
            gid: parse_field(args[3].as_ref(), "gid", u32::MAX),
            destination,
        })
    }
}

fn parse_field<T: FromStr>(value: &str, field: &str, fallback: T) -> T {
    value.trim().parse().unwrap_or_else(|_| {
        warn!(field, value, "crash argument is not a number");
        fallback
    })
}

/// How core and archive file names are chosen inside the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingPolicy {
    /// `coredump` and `coredump.tar.gz`; a later crash overwrites an earlier one.
    #[default]
    Fixed,
    /// `coredump.<pid>.<timestamp>`; concurrent crashes never collide.
    PerCrash,
}

/// Resolved on-disk locations for one crash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreArtifacts {
    directory: PathBuf,
    core_name: String,
}

impl CoreArtifacts {
    /// Resolve artifact names for `descriptor` at time `now`.
    pub fn resolve(descriptor: &CrashDescriptor, naming: NamingPolicy, now: DateTime<Utc>) -> Self {
        let core_name = match naming {
            NamingPolicy::Fixed => CORE_BASENAME.to_string(),
            NamingPolicy::PerCrash => format!(
                "{}.{}.{}",
                CORE_BASENAME,
                descriptor.pid,
                now.format("%Y%m%dT%H%M%SZ")
            ),
        };
        Self {
            directory: descriptor.destination.clone(),
            core_name,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File name of the core file, without directory.
    pub fn core_name(&self) -> &str {
        &self.core_name
    }

    pub fn archive_name(&self) -> String {
        format!("{}.{}", self.core_name, ARCHIVE_EXTENSION)
    }

    pub fn core_path(&self) -> PathBuf {
        self.directory.join(&self.core_name)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.directory.join(self.archive_name())
    }

    pub fn report_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}.{}", self.core_name, REPORT_EXTENSION))
    }
}
