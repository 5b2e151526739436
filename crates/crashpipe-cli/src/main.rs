//! crashpipe - kernel core dump pipe helper
//!
//! Normally run by the kernel through `/proc/sys/kernel/core_pattern`:
//!
//! ```text
//! |/usr/local/bin/crashpipe %p %s %u %g /var/crash
//! ```
//!
//! The core image arrives on stdin and ends up as
//! `<dir>/coredump.tar.gz` plus a `<dir>/coredump.json` report.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};

use crashpipe_core::{
    init_tracing, install_current_exe, logdir_from_arg, CrashDescriptor, CrashPipeline,
    HandlerConfig, NamingPolicy, ProcessRunner,
};

/// Exit status for usage errors (the kernel sees `-1`).
const USAGE_EXIT: u8 = 255;

#[derive(Parser)]
#[command(name = "crashpipe")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Capture core dumps piped in by the Linux kernel", long_about = None)]
#[command(after_help = "\
Under normal usage crashpipe is called directly by the Linux kernel and is
passed parameters as specified by /proc/sys/kernel/core_pattern.

To register it, copy the program anywhere and run:
    <any_dir>/crashpipe --install --logdir=<log_dir_path>
where <log_dir_path> is where core files should be written.")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, env = "CRASHPIPE_LOG_JSON")]
    json_logs: bool,

    /// Install crashpipe (register with the kernel)
    #[arg(long)]
    install: bool,

    /// Directory the kernel should pass for core files (with --install)
    #[arg(long, num_args = 0..=1, default_missing_value = "", requires = "install")]
    logdir: Option<String>,

    /// Directory holding core_pattern and core_pipe_limit
    #[arg(long)]
    kernel_dir: Option<PathBuf>,

    /// Name artifacts coredump.<pid>.<timestamp> instead of coredump
    #[arg(long)]
    unique_names: bool,

    /// Program used to build the .tar.gz archive
    #[arg(long = "tar", value_name = "PROGRAM")]
    tar_program: Option<String>,

    /// Do not write the JSON crash report
    #[arg(long)]
    no_report: bool,

    /// Kernel arguments: PID SIGNAL UID GID [DESTINATION]; extra words are ignored
    #[arg(value_name = "ARGS", allow_negative_numbers = true)]
    crash_args: Vec<String>,
}

impl Cli {
    fn config(&self) -> HandlerConfig {
        let mut config = HandlerConfig::from_env();
        if self.unique_names {
            config = config.with_naming(NamingPolicy::PerCrash);
        }
        if let Some(program) = &self.tar_program {
            config = config.with_tar_program(program);
        }
        if self.no_report {
            config = config.with_report(false);
        }
        if let Some(dir) = &self.kernel_dir {
            config = config.with_kernel_dir(dir);
        }
        config
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                // The kernel blocks on the pipe until the core is read.
                drain_stdin();
                e.exit()
            }
        },
    };

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    init_tracing(cli.json_logs, level);

    let config = cli.config();

    if cli.install {
        let logdir = match &cli.logdir {
            Some(dir) => dir.as_str(),
            None => cli.crash_args.first().map_or("", |arg| logdir_from_arg(arg)),
        };
        return match cmd_install(logdir, &config.kernel_dir) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("crashpipe: {e:#}");
                ExitCode::FAILURE
            }
        };
    }

    let Some(descriptor) = CrashDescriptor::from_args(&cli.crash_args, &config.default_directory)
    else {
        let _ = Cli::command().print_help();
        println!();
        return ExitCode::from(USAGE_EXIT);
    };

    cmd_capture(&descriptor, &config);
    ExitCode::SUCCESS
}

fn cmd_install(logdir: &str, kernel_dir: &Path) -> Result<()> {
    let installation = install_current_exe(logdir, kernel_dir)
        .with_context(|| format!("installing into {}", kernel_dir.display()))?;

    info!(core_pattern = %installation.core_pattern.trim_end(), "core_pattern updated");
    println!("Installation done");
    Ok(())
}

fn drain_stdin() {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        let _ = std::io::copy(&mut stdin.lock(), &mut std::io::sink());
    }
}

fn cmd_capture(descriptor: &CrashDescriptor, config: &HandlerConfig) {
    let stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();

    CrashPipeline::run(
        descriptor,
        stdin,
        config,
        ProcessRunner::new(),
        &mut stdout,
        &mut stderr,
    );
}
