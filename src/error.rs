//! Error types.

use crate::validate::Verdict;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors returned by rendering, validation, installation and import.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The temporary config file could not be opened for writing.
    #[error("cannot open {} for writing: {source}", .path.display())]
    Open {
        /// The file involved.
        path: PathBuf,
        /// The underlying OS error.
        source: std::io::Error,
    },

    /// The exclusive lock on the temporary file could not be acquired.
    #[error("cannot lock {} in exclusive mode: {source}", .path.display())]
    Lock {
        /// The file involved.
        path: PathBuf,
        /// The underlying OS error.
        source: std::io::Error,
    },

    /// The lock on the temporary file could not be released.
    #[error("cannot release lock on {}: {source}", .path.display())]
    Unlock {
        /// The file involved.
        path: PathBuf,
        /// The underlying OS error.
        source: std::io::Error,
    },

    /// Writing or flushing the rendered config failed.
    #[error("cannot write {}: {source}", .path.display())]
    Write {
        /// The file involved.
        path: PathBuf,
        /// The underlying OS error.
        source: std::io::Error,
    },

    /// The pipe for capturing daemon diagnostics could not be created.
    #[error("cannot create pipe for config test: {0}")]
    Pipe(#[source] std::io::Error),

    /// The daemon could not be started or waited on.
    #[error("cannot run {}: {source}", .program.display())]
    Spawn {
        /// The daemon executable.
        program: PathBuf,
        /// The underlying OS error.
        source: std::io::Error,
    },

    /// The daemon rejected the rendered config, or crashed while testing it.
    #[error("{}", rejection_message(.verdict, .line.as_ref()))]
    Rejected {
        /// Exit status and captured diagnostic.
        verdict: Verdict,
        /// Offending line number and its text, when the diagnostic names one.
        line: Option<(usize, String)>,
    },

    /// Renaming the validated file into place failed.
    #[error("cannot install {} to {}: {source}", .from.display(), .to.display())]
    Install {
        /// The validated temporary file.
        from: PathBuf,
        /// The install destination.
        to: PathBuf,
        /// The underlying OS error.
        source: std::io::Error,
    },

    /// Closing a file handle failed.
    #[error("cannot close {}: {source}", .path.display())]
    Close {
        /// The file involved.
        path: PathBuf,
        /// The underlying OS error.
        source: std::io::Error,
    },

    /// A present legacy file could not be read.
    #[error("cannot read legacy file {}: {source}", .path.display())]
    LegacyRead {
        /// The file involved.
        path: PathBuf,
        /// The underlying OS error.
        source: std::io::Error,
    },

    /// The structured configuration is not valid TOML.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Other filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Returns `true` if the underlying I/O error is `PermissionDenied`.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        self.io_source()
            .is_some_and(|e| e.kind() == std::io::ErrorKind::PermissionDenied)
    }

    /// Returns `true` if the daemon refused the rendered config.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    fn io_source(&self) -> Option<&std::io::Error> {
        match self {
            Self::Open { source, .. }
            | Self::Lock { source, .. }
            | Self::Unlock { source, .. }
            | Self::Write { source, .. }
            | Self::Spawn { source, .. }
            | Self::Install { source, .. }
            | Self::Close { source, .. }
            | Self::LegacyRead { source, .. }
            | Self::Pipe(source)
            | Self::Io(source) => Some(source),
            Self::Rejected { .. } | Self::Parse(_) => None,
        }
    }
}

fn rejection_message(verdict: &Verdict, line: Option<&(usize, String)>) -> String {
    let mut msg = format!("config rejected by dnsmasq: {}", verdict.diagnostic);
    if let Some(signal) = verdict.signal {
        msg.push_str(&format!(" (terminated by signal {signal})"));
    }
    if let Some((n, text)) = line {
        msg.push_str(&format!(" [line {n}: {text}]"));
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_is_detected() {
        let err = ConfigError::Open {
            path: PathBuf::from("/etc/x"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.is_permission_denied());
        assert!(!err.is_rejected());
        assert!(err.to_string().starts_with("cannot open /etc/x for writing"));
    }

    #[test]
    fn rejection_names_line() {
        let err = ConfigError::Rejected {
            verdict: Verdict {
                code: Some(1),
                signal: None,
                core_dumped: false,
                diagnostic: "bad option at line 3 of /tmp/x.conf".to_string(),
            },
            line: Some((3, "port=abc".to_string())),
        };
        assert!(err.is_rejected());
        assert!(!err.is_permission_denied());
        assert_eq!(
            err.to_string(),
            "config rejected by dnsmasq: bad option at line 3 of /tmp/x.conf [line 3: port=abc]"
        );
    }
}
