//! Render, validate and install cycle for the dnsmasq config file.
//!
//! The rendered file is written to a temporary path under an exclusive lock,
//! unlocked, tested by dnsmasq itself, and only then renamed over the
//! installed path. The installed file therefore always holds either the last
//! validated render or whatever predates the first successful install.

use crate::config::{DnsmasqConfig, DnsmasqPaths};
use crate::diagnostic;
use crate::error::{ConfigError, Result};
use crate::render::render_to;
use crate::util;
use crate::validate::DaemonCommand;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the dnsmasq config and installs it once dnsmasq accepts it.
///
/// Install cycles must be serialized by the caller; the file lock covers
/// only the write phase.
///
/// # Example
///
/// ```rust,ignore
/// use dnsmasq_conf::{ConfigWriter, DnsmasqConfig};
///
/// let writer = ConfigWriter::new();
/// writer.write_config(&DnsmasqConfig::load("/etc/dnsmasq-conf/dnsmasq.toml")?, true)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigWriter {
    paths: DnsmasqPaths,
    daemon: DaemonCommand,
}

impl ConfigWriter {
    /// Creates a writer for the default paths and `dnsmasq` on `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides all file locations (useful for testing).
    #[must_use]
    pub fn with_paths(mut self, paths: DnsmasqPaths) -> Self {
        self.paths = paths;
        self
    }

    /// Overrides how dnsmasq is invoked for `--test`.
    #[must_use]
    pub fn with_daemon(mut self, daemon: DaemonCommand) -> Self {
        self.daemon = daemon;
        self
    }

    /// Returns the file locations in use.
    #[must_use]
    pub const fn paths(&self) -> &DnsmasqPaths {
        &self.paths
    }

    /// Renders `config`, optionally tests it, and installs it.
    ///
    /// When `test_config` is set and dnsmasq rejects the file, the installed
    /// config is left unchanged and the rendered file stays at the temporary
    /// path for inspection.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Open`] / [`ConfigError::Lock`]: the temporary file
    ///   could not be opened or locked.
    /// - [`ConfigError::Write`] / [`ConfigError::Unlock`]: writing or
    ///   unlocking failed.
    /// - [`ConfigError::Pipe`] / [`ConfigError::Spawn`]: dnsmasq could not be
    ///   run.
    /// - [`ConfigError::Rejected`]: dnsmasq refused the file or crashed.
    /// - [`ConfigError::Install`]: the rename into place failed.
    /// - [`ConfigError::Close`]: closing the temporary file failed after a
    ///   successful install.
    pub fn write_config(&self, config: &DnsmasqConfig, test_config: bool) -> Result<()> {
        let temp = &self.paths.temp_conf;
        let installed = &self.paths.installed_conf;

        tracing::debug!(path = %temp.display(), "Opening dnsmasq config for writing");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp)
            .map_err(|source| {
                tracing::error!(
                    path = %temp.display(),
                    error = %source,
                    "Cannot open dnsmasq config for writing"
                );
                ConfigError::Open {
                    path: temp.clone(),
                    source,
                }
            })?;

        // May block while another process holds the file.
        util::lock_exclusive(&file).map_err(|source| {
            tracing::error!(path = %temp.display(), error = %source, "Cannot lock dnsmasq config");
            ConfigError::Lock {
                path: temp.clone(),
                source,
            }
        })?;

        self.write_locked(&file, config)?;

        util::unlock(&file).map_err(|source| {
            tracing::error!(path = %temp.display(), error = %source, "Cannot release lock on dnsmasq config");
            ConfigError::Unlock {
                path: temp.clone(),
                source,
            }
        })?;

        if test_config {
            self.test(temp)?;
        }

        tracing::debug!(from = %temp.display(), to = %installed.display(), "Installing dnsmasq config");
        std::fs::rename(temp, installed).map_err(|source| {
            tracing::error!(error = %source, "Cannot install dnsmasq config");
            ConfigError::Install {
                from: temp.clone(),
                to: installed.clone(),
                source,
            }
        })?;

        util::close(file).map_err(|source| {
            tracing::error!(error = %source, "Cannot close dnsmasq config");
            ConfigError::Close {
                path: installed.clone(),
                source,
            }
        })?;

        tracing::info!(path = %installed.display(), "Installed dnsmasq config");
        Ok(())
    }

    fn write_locked(&self, file: &File, config: &DnsmasqConfig) -> Result<()> {
        let mut out = BufWriter::new(file);
        render_to(&mut out, config, &self.paths, Local::now())
            .and_then(|()| out.flush())
            .map_err(|source| {
                tracing::error!(
                    path = %self.paths.temp_conf.display(),
                    error = %source,
                    "Cannot write dnsmasq config"
                );
                ConfigError::Write {
                    path: self.paths.temp_conf.clone(),
                    source,
                }
            })
    }

    fn test(&self, temp: &Path) -> Result<()> {
        tracing::debug!(path = %temp.display(), "Testing dnsmasq config");
        let verdict = self.daemon.test_config(temp)?;
        if verdict.passed() {
            return Ok(());
        }

        let line = diagnostic::locate(&verdict.diagnostic, temp);
        tracing::warn!(
            diagnostic = %verdict.diagnostic,
            line = ?line,
            "New dnsmasq configuration is not valid, config remains unchanged"
        );
        Err(ConfigError::Rejected { verdict, line })
    }
}
