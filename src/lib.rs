//! # dnsmasq-conf
//!
//! Render a structured resolver configuration into dnsmasq's config syntax,
//! have dnsmasq itself validate the result, and install it atomically.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use dnsmasq_conf::{ConfigWriter, DnsmasqConfig, LegacyFiles, legacy};
//!
//! let mut config = DnsmasqConfig::load("/etc/dnsmasq-conf/dnsmasq.toml")?;
//!
//! // Once, before the first render: fold hand-edited fragments in.
//! legacy::import_all(&LegacyFiles::default(), &mut config)?;
//!
//! // Render, run `dnsmasq --test`, then rename into place.
//! ConfigWriter::new().write_config(&config, true)?;
//! ```
//!
//! ## Install protocol
//!
//! 1. The config is rendered to a temporary file held under an exclusive
//!    `flock(2)`.
//! 2. The lock is released and `dnsmasq --conf-file=<temp> --test` runs as a
//!    child process; its combined output is captured through a pipe.
//! 3. Only if dnsmasq exits cleanly with status 0 is the temporary file
//!    renamed over the installed one. Otherwise the installed file is left
//!    untouched and [`ConfigError::Rejected`] carries the diagnostic, plus
//!    the offending line when dnsmasq names one.
//!
//! Install cycles are not serialized internally; run one at a time.
//!
//! ## Permissions
//!
//! The default paths live under `/etc` and require root. The caller is
//! responsible for privilege elevation.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod legacy;
pub mod render;
pub mod util;
pub mod validate;
pub mod writer;

pub use config::{DhcpConfig, DnsmasqConfig, DnsmasqPaths, ListeningMode, RevServerConfig};
pub use diagnostic::{config_line, line_number};
pub use error::{ConfigError, Result};
pub use legacy::{ImportSummary, LegacyFiles};
pub use render::{render, render_to};
pub use validate::{DaemonCommand, Verdict};
pub use writer::ConfigWriter;
