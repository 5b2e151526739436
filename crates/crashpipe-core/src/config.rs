//! Handler configuration.
//!
//! Defaults come from environment variables so the kernel-invoked binary
//! can be tuned without touching `core_pattern`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::descriptor::NamingPolicy;

/// Directory used when the kernel does not pass a destination.
pub const DEFAULT_DIRECTORY: &str = "/home";

/// Where the kernel exposes `core_pattern` and `core_pipe_limit`.
pub const DEFAULT_KERNEL_DIR: &str = "/proc/sys/kernel";

/// Runtime configuration for a crashpipe invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Destination directory when none is supplied on the command line.
    pub default_directory: PathBuf,
    /// How core and archive files are named.
    pub naming: NamingPolicy,
    /// Program used to build the `.tar.gz` archive.
    pub tar_program: String,
    /// Whether to write the JSON crash report sidecar.
    pub write_report: bool,
    /// Directory holding the kernel's core dump settings.
    pub kernel_dir: PathBuf,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        HandlerConfig {
            default_directory: std::env::var("CRASHPIPE_DEFAULT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DIRECTORY)),
            naming: if env_flag("CRASHPIPE_UNIQUE_NAMES", false) {
                NamingPolicy::PerCrash
            } else {
                NamingPolicy::Fixed
            },
            tar_program: std::env::var("CRASHPIPE_TAR").unwrap_or_else(|_| "tar".to_string()),
            write_report: env_flag("CRASHPIPE_WRITE_REPORT", true),
            kernel_dir: std::env::var("CRASHPIPE_KERNEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_KERNEL_DIR)),
        }
    }
}

impl HandlerConfig {
    /// Create a config from environment variables.
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn with_default_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_directory = dir.into();
        self
    }

    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_tar_program(mut self, program: &str) -> Self {
        self.tar_program = program.to_string();
        self
    }

    pub fn with_report(mut self, enabled: bool) -> Self {
        self.write_report = enabled;
        self
    }

    pub fn with_kernel_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.kernel_dir = dir.into();
        self
    }
}

/// Interpret an environment variable as a boolean switch.
fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => parse_flag(&v).unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
