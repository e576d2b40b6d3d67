//! One-time import of hand-edited dnsmasq fragments into [`DnsmasqConfig`].
//!
//! Each legacy file is read once; every line containing `<key>=` contributes
//! its trimmed value to a list field. Afterwards the file is moved to
//! `<path>.bck`, so a later run finds nothing to import.

use crate::config::DnsmasqConfig;
use crate::error::{ConfigError, Result};
use crate::util;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Static DHCP leases fragment.
pub const DEFAULT_STATIC_LEASES: &str = "/etc/dnsmasq.d/04-pihole-static-dhcp.conf";

/// Custom CNAME fragment.
pub const DEFAULT_CNAMES: &str = "/etc/dnsmasq.d/05-pihole-custom-cname.conf";

/// Suffix appended to a legacy file once imported.
pub const BACKUP_SUFFIX: &str = ".bck";

const DHCP_HOST_KEY: &str = "dhcp-host";
const CNAME_KEY: &str = "cname";

/// Locations of the legacy fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyFiles {
    /// Fragment holding `dhcp-host=` lines.
    pub static_leases: PathBuf,
    /// Fragment holding `cname=` lines.
    pub cnames: PathBuf,
}

impl Default for LegacyFiles {
    fn default() -> Self {
        Self {
            static_leases: PathBuf::from(DEFAULT_STATIC_LEASES),
            cnames: PathBuf::from(DEFAULT_CNAMES),
        }
    }
}

/// Entries imported by [`import_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Entries appended to `dhcp.hosts`.
    pub static_leases: usize,
    /// Entries appended to `cnames`.
    pub cnames: usize,
}

/// Imports both legacy fragments, static leases first.
///
/// # Errors
///
/// Returns [`ConfigError::LegacyRead`] or [`ConfigError::Close`] from the
/// first import that fails; the CNAME import is not attempted after a
/// failed lease import.
pub fn import_all(files: &LegacyFiles, config: &mut DnsmasqConfig) -> Result<ImportSummary> {
    Ok(ImportSummary {
        static_leases: import_static_leases(&files.static_leases, config)?,
        cnames: import_cnames(&files.cnames, config)?,
    })
}

/// Appends `dhcp-host=` values from `path` to `config.dhcp.hosts`.
///
/// # Errors
///
/// See [`import_list`].
pub fn import_static_leases(path: &Path, config: &mut DnsmasqConfig) -> Result<usize> {
    import_list(path, DHCP_HOST_KEY, &mut config.dhcp.hosts)
}

/// Appends `cname=` values from `path` to `config.cnames`.
///
/// # Errors
///
/// See [`import_list`].
pub fn import_cnames(path: &Path, config: &mut DnsmasqConfig) -> Result<usize> {
    import_list(path, CNAME_KEY, &mut config.cnames)
}

/// Appends the value of every line containing `<key>=` to `target`, in file
/// order, then moves `path` to `<path>.bck`.
///
/// A missing file is a successful no-op. A failed backup rename is logged
/// and does not fail the import.
///
/// # Errors
///
/// Returns [`ConfigError::LegacyRead`] if the file exists but cannot be
/// read, or [`ConfigError::Close`] if it cannot be closed. `target` is left
/// untouched in both cases.
pub fn import_list(path: &Path, key: &str, target: &mut Vec<String>) -> Result<usize> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No legacy file, nothing to import");
        return Ok(0);
    }

    let read_error = |source: std::io::Error| {
        tracing::error!(path = %path.display(), error = %source, "Cannot read legacy file");
        ConfigError::LegacyRead {
            path: path.to_path_buf(),
            source,
        }
    };

    let file = File::open(path).map_err(read_error)?;
    let values = parse_values(BufReader::new(&file), key).map_err(read_error)?;

    util::close(file).map_err(|source| {
        tracing::error!(path = %path.display(), error = %source, "Cannot close legacy file");
        ConfigError::Close {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let base = target.len();
    for (i, value) in values.iter().enumerate() {
        tracing::debug!(path = %path.display(), key, index = base + i, value = %value, "Importing legacy entry");
    }
    let imported = values.len();
    target.extend(values);

    retire(path);
    Ok(imported)
}

/// Extracts the trimmed text after the first `=` of every line mentioning
/// `<key>=`.
fn parse_values<R: BufRead>(reader: R, key: &str) -> std::io::Result<Vec<String>> {
    let needle = format!("{key}=");
    let mut values = Vec::new();
    for line in reader.split(b'\n') {
        let line = String::from_utf8_lossy(&line?).into_owned();
        if !line.contains(&needle) {
            continue;
        }
        if let Some((_, value)) = line.split_once('=') {
            values.push(value.trim().to_string());
        }
    }
    Ok(values)
}

/// Moves an imported file out of the way. Best effort.
fn retire(path: &Path) {
    let target = backup_path(path);
    tracing::info!(from = %path.display(), to = %target.display(), "Moving imported legacy file");
    if let Err(e) = std::fs::rename(path, &target) {
        tracing::warn!(
            from = %path.display(),
            to = %target.display(),
            error = %e,
            "Unable to move legacy file"
        );
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}
