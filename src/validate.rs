//! Out-of-process validation of a rendered config with `dnsmasq --test`.
//!
//! The daemon runs as a child process with its stdout and stderr joined into
//! one pipe. The parent drains the pipe until end-of-stream before waiting,
//! so the child never blocks on a full pipe.
//!
//! No timeout is applied: a hung daemon blocks the caller.

use crate::error::{ConfigError, Result};
use std::ffi::OsString;
use std::io::{self, Read};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Size of the diagnostic capture buffer.
///
/// Each read overwrites the buffer, so only the last chunk of a longer
/// output survives.
pub const DIAGNOSTIC_CAPACITY: usize = 1024;

/// Default daemon executable, looked up on `PATH`.
pub const DEFAULT_DAEMON: &str = "dnsmasq";

/// How to invoke the daemon's option parser.
///
/// The child is run as `<program> <leading args...> --conf-file=<path> --test`.
///
/// ```
/// use dnsmasq_conf::DaemonCommand;
///
/// let cmd = DaemonCommand::new("/usr/sbin/dnsmasq");
/// assert_eq!(cmd.program().to_str(), Some("/usr/sbin/dnsmasq"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonCommand {
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl DaemonCommand {
    /// Invokes `program` with no leading arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Inserts arguments before `--conf-file`, e.g. to run the daemon
    /// through a wrapper.
    #[must_use]
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the daemon executable.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Runs the daemon against `conf` and reports its verdict.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Pipe`] if the capture pipe cannot be created,
    /// or [`ConfigError::Spawn`] if the daemon cannot be started, read from
    /// or waited on. A daemon that runs and rejects the file is not an error
    /// here; see [`Verdict::passed`].
    pub fn test_config(&self, conf: &Path) -> Result<Verdict> {
        let (mut reader, writer) = io::pipe().map_err(ConfigError::Pipe)?;

        let mut child = {
            let mut cmd = Command::new(&self.program);
            cmd.args(&self.leading_args)
                .arg(conf_file_arg(conf))
                .arg("--test")
                .stdin(Stdio::null())
                .stdout(writer.try_clone().map_err(ConfigError::Pipe)?)
                .stderr(writer);
            cmd.spawn().map_err(|source| self.spawn_error(source))?
            // `cmd` drops here, closing the parent's write ends.
        };

        let drained = drain(&mut reader);
        let status = child.wait().map_err(|source| self.spawn_error(source))?;
        let diagnostic = drained.map_err(|source| self.spawn_error(source))?;

        let verdict = Verdict::from_status(status, diagnostic);
        tracing::debug!(code = ?verdict.code, "dnsmasq config test finished");
        if let Some(signal) = verdict.signal {
            tracing::error!(
                signal,
                core_dumped = verdict.core_dumped,
                "dnsmasq config test terminated by signal"
            );
        }
        Ok(verdict)
    }

    fn spawn_error(&self, source: io::Error) -> ConfigError {
        ConfigError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl Default for DaemonCommand {
    fn default() -> Self {
        Self::new(DEFAULT_DAEMON)
    }
}

/// Outcome of one `--test` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Terminating signal, if any.
    pub signal: Option<i32>,
    /// Whether the signal produced a core dump.
    pub core_dumped: bool,
    /// Last chunk of the daemon's combined stdout/stderr.
    pub diagnostic: String,
}

impl Verdict {
    fn from_status(status: ExitStatus, diagnostic: String) -> Self {
        Self {
            code: status.code(),
            signal: status.signal(),
            core_dumped: status.core_dumped(),
            diagnostic,
        }
    }

    /// `true` only for a clean exit with status 0.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.code == Some(0) && self.signal.is_none()
    }

    /// `true` if the daemon was killed by a signal.
    #[must_use]
    pub const fn crashed(&self) -> bool {
        self.signal.is_some()
    }
}

fn conf_file_arg(conf: &Path) -> OsString {
    let mut arg = OsString::from("--conf-file=");
    arg.push(conf.as_os_str());
    arg
}

/// Reads `reader` to end-of-stream, keeping only the most recent chunk.
fn drain<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut buf = [0u8; DIAGNOSTIC_CAPACITY];
    let mut last = String::new();
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(last),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        last = strip_newlines(&String::from_utf8_lossy(&buf[..n])).to_string();
        tracing::debug!(chunk = %last, "dnsmasq pipe");
    }
}

/// Removes one leading and one trailing newline.
fn strip_newlines(s: &str) -> &str {
    let s = s.strip_prefix('\n').unwrap_or(s);
    s.strip_suffix('\n').unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> DaemonCommand {
        DaemonCommand::new("/bin/sh").with_leading_args(["-c", script, "dnsmasq"])
    }

    #[test]
    fn clean_exit_passes() {
        let verdict = sh("exit 0").test_config(Path::new("/tmp/x.conf")).unwrap();
        assert!(verdict.passed());
        assert!(!verdict.crashed());
        assert_eq!(verdict.code, Some(0));
        assert_eq!(verdict.diagnostic, "");
    }

    #[test]
    fn nonzero_exit_fails_without_crash() {
        let verdict = sh("echo 'dnsmasq: bad option at line 3 of x' >&2; exit 1")
            .test_config(Path::new("/tmp/x.conf"))
            .unwrap();
        assert!(!verdict.passed());
        assert!(!verdict.crashed());
        assert_eq!(verdict.code, Some(1));
        assert_eq!(verdict.signal, None);
        assert_eq!(verdict.diagnostic, "dnsmasq: bad option at line 3 of x");
    }

    #[test]
    fn signal_is_recorded() {
        let verdict = sh("kill -9 $$").test_config(Path::new("/tmp/x.conf")).unwrap();
        assert!(!verdict.passed());
        assert!(verdict.crashed());
        assert_eq!(verdict.signal, Some(9));
        assert_eq!(verdict.code, None);
        assert!(!verdict.core_dumped);
    }

    #[test]
    fn receives_conf_file_and_test_flag() {
        let verdict = sh(r#"printf '%s %s' "$1" "$2""#)
            .test_config(Path::new("/tmp/x.conf"))
            .unwrap();
        assert!(verdict.passed());
        assert_eq!(verdict.diagnostic, "--conf-file=/tmp/x.conf --test");
    }

    #[test]
    fn stdout_is_captured_too() {
        let verdict = sh("echo 'dnsmasq: syntax check OK.'")
            .test_config(Path::new("/tmp/x.conf"))
            .unwrap();
        assert_eq!(verdict.diagnostic, "dnsmasq: syntax check OK.");
    }

    #[test]
    fn large_output_keeps_only_a_bounded_tail() {
        let verdict = sh("i=0; while [ $i -lt 400 ]; do echo 'dnsmasq: filler line'; i=$((i+1)); done; exit 1")
            .test_config(Path::new("/tmp/x.conf"))
            .unwrap();
        assert!(!verdict.passed());
        assert!(!verdict.diagnostic.is_empty());
        assert!(verdict.diagnostic.len() <= DIAGNOSTIC_CAPACITY);
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let err = DaemonCommand::new("/nonexistent/dnsmasq")
            .test_config(Path::new("/tmp/x.conf"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Spawn { .. }));
    }

    #[test]
    fn strips_one_newline_each_side() {
        assert_eq!(strip_newlines("\nmsg\n"), "msg");
        assert_eq!(strip_newlines("\n\nmsg\n\n"), "\nmsg\n");
        assert_eq!(strip_newlines("msg"), "msg");
        assert_eq!(strip_newlines(""), "");
    }

    #[test]
    fn drain_keeps_last_chunk() {
        struct Chunks(Vec<&'static [u8]>);
        impl Read for Chunks {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.0.is_empty() {
                    return Ok(0);
                }
                let chunk = self.0.remove(0);
                buf[..chunk.len()].copy_from_slice(chunk);
                Ok(chunk.len())
            }
        }

        let mut r = Chunks(vec![b"first\n", b"\nsecond line\n"]);
        assert_eq!(drain(&mut r).unwrap(), "second line");
    }
}
