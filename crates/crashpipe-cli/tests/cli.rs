//! Drives the built `crashpipe` binary the way the kernel does.

use flate2::read::GzDecoder;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn crashpipe() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_crashpipe"));
    for var in [
        "CRASHPIPE_DEFAULT_DIR",
        "CRASHPIPE_UNIQUE_NAMES",
        "CRASHPIPE_TAR",
        "CRASHPIPE_WRITE_REPORT",
        "CRASHPIPE_KERNEL_DIR",
        "CRASHPIPE_LOG_JSON",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn run_with_stdin(mut cmd: Command, input: &[u8]) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn crashpipe");
    child.stdin.take().unwrap().write_all(input).unwrap();
    child.wait_with_output().unwrap()
}

fn unpack_single(path: &Path) -> Vec<u8> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut entry = archive.entries().unwrap().next().unwrap().unwrap();
    let mut data = Vec::new();
    entry.read_to_end(&mut data).unwrap();
    data
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

/// Test: kernel-style invocation with 5000 bytes on stdin
#[test]
fn test_crash_invocation_archives_core() {
    let dir = tempfile::tempdir().unwrap();
    let data: Vec<u8> = (0..5000u32).map(|i| (i % 256) as u8).collect();

    let mut cmd = crashpipe();
    cmd.args(["1234", "11", "1000", "1000"]).arg(dir.path());
    let output = run_with_stdin(cmd, &data);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("Total bytes in core dump: 5000"), "stdout: {stdout}");
    assert!(stderr.contains("Total bytes in core dump: 5000"), "stderr: {stderr}");

    assert!(!dir.path().join("coredump").exists());
    assert_eq!(unpack_single(&dir.path().join("coredump.tar.gz")), data);
    assert!(dir.path().join("coredump.json").exists());
}

/// Test: an unwritable destination still drains stdin and exits 0
#[test]
fn test_missing_destination_still_drains() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let data = vec![0x5Au8; 1 << 20];

    let mut cmd = crashpipe();
    cmd.args(["1", "6", "0", "0"]).arg(&missing);
    let output = run_with_stdin(cmd, &data);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("Total bytes in core dump: {}", data.len())));
    assert!(!missing.exists());
}

/// Test: destination falls back to the configured default directory
#[test]
fn test_default_directory_from_env() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = crashpipe();
    cmd.args(["42", "11", "1000", "1000"])
        .env("CRASHPIPE_DEFAULT_DIR", dir.path());
    let output = run_with_stdin(cmd, b"tiny core");

    assert!(output.status.success());
    assert_eq!(
        unpack_single(&dir.path().join("coredump.tar.gz")),
        b"tiny core"
    );
}

/// Test: --unique-names keys artifacts by pid
#[test]
fn test_unique_names_flag() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = crashpipe();
    cmd.args(["--unique-names", "--no-report", "777", "11", "0", "0"])
        .arg(dir.path());
    let output = run_with_stdin(cmd, b"abc");

    assert!(output.status.success());
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names.len(), 1, "unexpected files: {names:?}");
    assert!(names[0].starts_with("coredump.777."));
    assert!(names[0].ends_with(".tar.gz"));
}

/// Test: too few arguments prints usage and fails without touching disk
#[test]
fn test_insufficient_arguments_show_usage() {
    let dir = tempfile::tempdir().unwrap();

    let output = crashpipe()
        .args(["1234", "11"])
        .env("CRASHPIPE_DEFAULT_DIR", dir.path())
        .stdin(Stdio::null())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(255));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "stdout: {stdout}");
    assert!(dir_is_empty(dir.path()));
}

/// Test: --version exits 0 and names the version
#[test]
fn test_version_flag() {
    let output = crashpipe().arg("--version").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

/// Test: --install writes core_pattern and core_pipe_limit
#[test]
fn test_install_writes_kernel_settings() {
    let kernel = tempfile::tempdir().unwrap();

    let output = crashpipe()
        .args(["--install", "--logdir=/var/crash", "--kernel-dir"])
        .arg(kernel.path())
        .output()
        .unwrap();

    assert!(output.status.success(), "{output:?}");
    let program = Path::new(env!("CARGO_BIN_EXE_crashpipe"))
        .canonicalize()
        .unwrap();
    assert_eq!(
        std::fs::read_to_string(kernel.path().join("core_pattern")).unwrap(),
        format!("|{} %p %s %u %g /var/crash\n", program.display())
    );
    assert_eq!(
        std::fs::read_to_string(kernel.path().join("core_pipe_limit")).unwrap(),
        "0\n"
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("Installation done"));
}

/// Test: bare --logdir installs an empty log directory
#[test]
fn test_install_without_logdir_value() {
    let kernel = tempfile::tempdir().unwrap();

    let output = crashpipe()
        .args(["--install", "--logdir", "--kernel-dir"])
        .arg(kernel.path())
        .output()
        .unwrap();

    assert!(output.status.success(), "{output:?}");
    let pattern = std::fs::read_to_string(kernel.path().join("core_pattern")).unwrap();
    assert!(pattern.ends_with(" %p %s %u %g \n"), "pattern: {pattern:?}");
}

/// Test: an unwritable kernel directory fails with status 1
#[test]
fn test_install_failure_exits_one() {
    let kernel = tempfile::tempdir().unwrap();
    let missing = kernel.path().join("absent");

    let output = crashpipe()
        .args(["--install", "--logdir=/var/crash", "--kernel-dir"])
        .arg(&missing)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("core_pattern"), "stderr: {stderr}");
}

/// Test: an unquoted destination split into extra words still drains and archives
#[test]
fn test_trailing_arguments_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let first_word = dir.path().join("my");
    std::fs::create_dir(&first_word).unwrap();
    let data = vec![0xA5u8; 256 * 1024];

    let mut cmd = crashpipe();
    cmd.args(["1234", "11", "1000", "1000"])
        .arg(format!("{}/my", dir.path().display()))
        .arg("crashes");
    let output = run_with_stdin(cmd, &data);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("Total bytes in core dump: {}", data.len())));
    assert_eq!(unpack_single(&first_word.join("coredump.tar.gz")), data);
}

/// Test: an unknown flag is rejected only after stdin has been consumed
#[test]
fn test_unknown_flag_still_drains() {
    let data = vec![0u8; 1 << 20];

    let mut cmd = crashpipe();
    cmd.args(["--no-such-flag", "1", "6", "0", "0"]);
    let output = run_with_stdin(cmd, &data);

    assert_eq!(output.status.code(), Some(2));
}

/// Test: a log directory containing whitespace is refused
#[test]
fn test_install_refuses_whitespace_logdir() {
    let kernel = tempfile::tempdir().unwrap();

    let output = crashpipe()
        .args(["--install", "--logdir=/var/my crashes", "--kernel-dir"])
        .arg(kernel.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(!kernel.path().join("core_pattern").exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("whitespace"), "stderr: {stderr}");
}

/// Test: an install argument without `=` installs an empty log directory
#[test]
fn test_install_argument_without_equals() {
    let kernel = tempfile::tempdir().unwrap();

    let output = crashpipe()
        .args(["--install", "/var/crash", "--kernel-dir"])
        .arg(kernel.path())
        .output()
        .unwrap();

    assert!(output.status.success(), "{output:?}");
    let pattern = std::fs::read_to_string(kernel.path().join("core_pattern")).unwrap();
    assert!(pattern.ends_with(" %p %s %u %g \n"), "pattern: {pattern:?}");
}

/// Test: a read-only destination still drains stdin and exits 0
#[test]
fn test_read_only_destination_still_drains() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let perms = |mode| std::fs::Permissions::from_mode(mode);
    std::fs::set_permissions(dir.path(), perms(0o500)).unwrap();
    if std::fs::File::create(dir.path().join("writable")).is_ok() {
        // Running as root: permission bits are not enforced.
        std::fs::set_permissions(dir.path(), perms(0o700)).unwrap();
        return;
    }
    let data = vec![0x11u8; 1 << 20];

    let mut cmd = crashpipe();
    cmd.args(["1", "6", "0", "0"]).arg(dir.path());
    let output = run_with_stdin(cmd, &data);
    std::fs::set_permissions(dir.path(), perms(0o700)).unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("Total bytes in core dump: {}", data.len())));
    assert!(dir_is_empty(dir.path()));
}

/// Test: verbose logging never leaks onto stdout
#[test]
fn test_verbose_logs_stay_on_stderr() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = crashpipe();
    cmd.args(["--verbose", "1234", "11", "1000", "1000"])
        .arg(dir.path());
    let output = run_with_stdin(cmd, b"twelve bytes");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "Total bytes in core dump: 12\n"
    );
    assert!(!output.stderr.is_empty());
}
