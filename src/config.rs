//! Structured dnsmasq configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Interface used by the interface-bound listening modes when none is set.
pub const FALLBACK_INTERFACE: &str = "eth0";

/// Rendered file, written and locked before validation.
pub const DEFAULT_TEMP_CONF: &str = "/etc/dnsmasq-conf/dnsmasq.conf.temp";

/// File the running daemon reads.
pub const DEFAULT_INSTALLED_CONF: &str = "/etc/dnsmasq-conf/dnsmasq.conf";

/// Locally managed hosts list.
pub const DEFAULT_LOCAL_HOSTS: &str = "/etc/dnsmasq-conf/local.list";

/// User-defined custom DNS records.
pub const DEFAULT_CUSTOM_HOSTS: &str = "/etc/dnsmasq-conf/custom.list";

/// DHCP lease database.
pub const DEFAULT_LEASE_FILE: &str = "/etc/dnsmasq-conf/dhcp.leases";

/// User override directory, included only when present on disk.
pub const DEFAULT_USER_CONF_DIR: &str = "/etc/dnsmasq.d";

const DEFAULT_LOG_FILE: &str = "/var/log/dnsmasq-conf/dnsmasq.log";

/// Which interfaces and clients the resolver answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListeningMode {
    /// Only answer devices at most one hop away.
    #[default]
    Local,
    /// Listen on all interfaces, permit all origins.
    All,
    /// Listen on a single interface.
    Single,
    /// Listen on a single interface and bind the socket to it.
    Bind,
}

/// Reverse (PTR) lookup forwarding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RevServerConfig {
    /// Emit the reverse server clauses at all.
    pub active: bool,
    /// Address range in CIDR notation, e.g. `"192.168.0.0/16"`.
    pub cidr: String,
    /// Server handling the range, e.g. `"192.168.0.1#53"`.
    pub target: String,
    /// Local domain also routed to `target`. Empty disables it.
    pub domain: String,
}

/// Built-in DHCP server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DhcpConfig {
    /// Run the DHCP server.
    pub active: bool,
    /// First address of the lease range.
    pub start: String,
    /// Last address of the lease range.
    pub end: String,
    /// Gateway handed out as the router option.
    pub router: String,
    /// Lease duration, e.g. `"24h"`.
    pub lease_time: String,
    /// Also serve IPv6 through stateless router advertisements.
    pub ipv6: bool,
    /// Allow two-message DHCPv4 exchanges (RFC 4039).
    pub rapid_commit: bool,
    /// Static reservations, one `dhcp-host=` value each.
    pub hosts: Vec<String>,
}

impl Default for DhcpConfig {
    fn default() -> Self {
        Self {
            active: false,
            start: String::new(),
            end: String::new(),
            router: String::new(),
            lease_time: "24h".to_string(),
            ipv6: false,
            rapid_commit: false,
            hosts: Vec::new(),
        }
    }
}

/// Every tunable the renderer may emit.
///
/// String fields left empty mean "omit this clause". List fields keep
/// insertion order.
///
/// # Example
///
/// ```
/// use dnsmasq_conf::{DnsmasqConfig, ListeningMode};
///
/// let config = DnsmasqConfig::from_toml_str(
///     r#"
///     upstreams = ["9.9.9.9"]
///     listening_mode = "SINGLE"
///     interface = "enp3s0"
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.upstreams, vec!["9.9.9.9"]);
/// assert_eq!(config.listening_mode, ListeningMode::Single);
/// assert_eq!(config.port, 53);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DnsmasqConfig {
    /// Upstream resolvers, one `server=` line each.
    pub upstreams: Vec<String>,
    /// DNS listening port.
    pub port: u16,
    /// Cache size in names; 0 disables caching.
    pub cache_size: u32,
    /// Query logging.
    pub logging: bool,
    /// Daemon log file. Written even with query logging off.
    pub log_file: String,
    /// Answer private-range reverse lookups locally with NXDOMAIN.
    pub bogus_priv: bool,
    /// Never forward names without a dot.
    pub domain_needed: bool,
    /// Append the local domain to plain names from hosts files.
    pub expand_hosts: bool,
    /// Validate answers with DNSSEC against the root trust anchor.
    pub dnssec: bool,
    /// Local domain. Empty or `none` (any case) omits it.
    pub domain: String,
    /// Extra `host-record=` value. Empty omits it.
    pub host_record: String,
    /// Interface for `SINGLE`/`BIND` and the IPv6 RA range. Empty falls back
    /// to [`FALLBACK_INTERFACE`].
    pub interface: String,
    /// Which interfaces and clients are answered.
    pub listening_mode: ListeningMode,
    /// Reverse lookup forwarding.
    pub rev_server: RevServerConfig,
    /// Built-in DHCP server.
    pub dhcp: DhcpConfig,
    /// CNAME records, one `cname=` value each.
    pub cnames: Vec<String>,
}

impl Default for DnsmasqConfig {
    fn default() -> Self {
        Self {
            upstreams: Vec::new(),
            port: 53,
            cache_size: 10_000,
            logging: true,
            log_file: DEFAULT_LOG_FILE.to_string(),
            bogus_priv: true,
            domain_needed: false,
            expand_hosts: false,
            dnssec: false,
            domain: "lan".to_string(),
            host_record: String::new(),
            interface: String::new(),
            listening_mode: ListeningMode::Local,
            rev_server: RevServerConfig::default(),
            dhcp: DhcpConfig::default(),
            cnames: Vec::new(),
        }
    }
}

impl DnsmasqConfig {
    /// Parses a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`](crate::ConfigError::Parse) on malformed
    /// TOML or mistyped values.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`](crate::ConfigError::Io) if the file cannot
    /// be read, or [`ConfigError::Parse`](crate::ConfigError::Parse).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.as_ref().display(), "Loaded dnsmasq configuration");
        Ok(config)
    }

    /// Interface name for the interface-bound clauses.
    #[must_use]
    pub fn resolved_interface(&self) -> &str {
        if self.interface.is_empty() {
            FALLBACK_INTERFACE
        } else {
            &self.interface
        }
    }

    /// Domain to emit, or `None` when empty or the literal `none`.
    #[must_use]
    pub fn effective_domain(&self) -> Option<&str> {
        if self.domain.is_empty() || self.domain.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(&self.domain)
        }
    }
}

/// File-system locations used by the renderer and the installer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsmasqPaths {
    /// Where each render is written and tested.
    pub temp_conf: PathBuf,
    /// Where dnsmasq reads its config from.
    pub installed_conf: PathBuf,
    /// First `addn-hosts` file.
    pub local_hosts: PathBuf,
    /// Second `addn-hosts` file.
    pub custom_hosts: PathBuf,
    /// `dhcp-leasefile` target.
    pub lease_file: PathBuf,
    /// Override directory, emitted as `conf-dir` when it exists.
    pub user_conf_dir: PathBuf,
}

impl DnsmasqPaths {
    /// Places every file under `dir` (useful for testing).
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            temp_conf: dir.join("dnsmasq.conf.temp"),
            installed_conf: dir.join("dnsmasq.conf"),
            local_hosts: dir.join("local.list"),
            custom_hosts: dir.join("custom.list"),
            lease_file: dir.join("dhcp.leases"),
            user_conf_dir: dir.join("dnsmasq.d"),
        }
    }
}

impl Default for DnsmasqPaths {
    fn default() -> Self {
        Self {
            temp_conf: PathBuf::from(DEFAULT_TEMP_CONF),
            installed_conf: PathBuf::from(DEFAULT_INSTALLED_CONF),
            local_hosts: PathBuf::from(DEFAULT_LOCAL_HOSTS),
            custom_hosts: PathBuf::from(DEFAULT_CUSTOM_HOSTS),
            lease_file: PathBuf::from(DEFAULT_LEASE_FILE),
            user_conf_dir: PathBuf::from(DEFAULT_USER_CONF_DIR),
        }
    }
}
