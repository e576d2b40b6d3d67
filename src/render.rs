//! Rendering of [`DnsmasqConfig`] into dnsmasq's native syntax.
//!
//! One line per setting, each block gated independently on the state of its
//! field. Rendering is deterministic for a fixed timestamp.

use crate::config::{DnsmasqConfig, DnsmasqPaths, ListeningMode};
use chrono::{DateTime, Local};
use std::io::{self, Write};

/// Marker line naming the tool that owns the rendered file.
pub const MANAGED_BY_MARKER: &str = "# managed by dnsmasq-conf";

/// 2017-02-02 root zone KSK (key tag 20326).
pub const ROOT_TRUST_ANCHOR: &str =
    ".,20326,8,2,E06D44B80B8F1D39A95C0B0D7C65D08458E880409BBC683457104237C7F8EC8D";

/// Names answered locally instead of forwarded upstream (RFC 6761 and the
/// IANA special-use registry).
pub const RESERVED_NAMES: [&str; 5] = ["test", "localhost", "invalid", "bind", "onion"];

const BANNER_RULE: &str =
    "###############################################################################";

/// Renders `config` into a string.
///
/// # Panics
///
/// Never in practice: the output buffer is an in-memory `Vec`.
///
/// # Example
///
/// ```
/// use chrono::Local;
/// use dnsmasq_conf::{DnsmasqConfig, DnsmasqPaths, render};
///
/// let mut config = DnsmasqConfig::default();
/// config.upstreams = vec!["9.9.9.9".into()];
///
/// let text = render(&config, &DnsmasqPaths::in_dir("/tmp/none"), Local::now());
/// assert!(text.contains("\nserver=9.9.9.9\n"));
/// assert!(text.contains("\nport=53\n"));
/// ```
#[must_use]
pub fn render(config: &DnsmasqConfig, paths: &DnsmasqPaths, generated_at: DateTime<Local>) -> String {
    let mut out = Vec::new();
    render_to(&mut out, config, paths, generated_at).expect("writing to a Vec cannot fail");
    String::from_utf8_lossy(&out).into_owned()
}

/// Renders `config` into `out`.
///
/// `paths` supplies the hosts lists, lease file and override directory; the
/// override directory is probed on disk and only included when it exists.
///
/// # Errors
///
/// Propagates any error from `out`.
pub fn render_to<W: Write>(
    out: &mut W,
    config: &DnsmasqConfig,
    paths: &DnsmasqPaths,
    generated_at: DateTime<Local>,
) -> io::Result<()> {
    write_header(out, paths, generated_at)?;

    writeln!(out, "addn-hosts={}", paths.local_hosts.display())?;
    writeln!(out, "addn-hosts={}", paths.custom_hosts.display())?;
    writeln!(out)?;
    writeln!(out, "# Don't read /etc/resolv.conf. Get upstream servers only from the configuration")?;
    writeln!(out, "no-resolv")?;
    writeln!(out)?;
    writeln!(out, "# DNS port to be used")?;
    writeln!(out, "port={}", config.port)?;

    if !config.upstreams.is_empty() {
        writeln!(out, "# List of upstream DNS server")?;
        for server in &config.upstreams {
            writeln!(out, "server={server}")?;
        }
        writeln!(out)?;
    }

    writeln!(out, "# Set the size of dnsmasq's cache. Setting the cache size to zero disables")?;
    writeln!(out, "# caching. Note: huge cache sizes impact performance")?;
    writeln!(out, "cache-size={}", config.cache_size)?;
    writeln!(out)?;

    writeln!(out, "# Return answers to DNS queries from /etc/hosts and interface-name and")?;
    writeln!(out, "# dynamic-host which depend on the interface over which the query was")?;
    writeln!(out, "# received. If a name has more than one address and at least one of them")?;
    writeln!(out, "# is on the subnet of the receiving interface, return only those.")?;
    writeln!(out, "localise-queries")?;
    writeln!(out)?;

    write_logging(out, config)?;
    write_feature_flags(out, config)?;
    write_domain(out, config)?;

    if !config.host_record.is_empty() {
        writeln!(out, "# Add A, AAAA and PTR records to the DNS")?;
        writeln!(out, "host-record={}", config.host_record)?;
    }

    let interface = config.resolved_interface();
    write_listening_mode(out, config.listening_mode, interface)?;
    write_rev_server(out, config)?;
    write_dhcp(out, config, paths, interface)?;

    if !config.cnames.is_empty() {
        writeln!(out, "# User-defined custom CNAMEs")?;
        for cname in &config.cnames {
            writeln!(out, "cname={cname}")?;
        }
        writeln!(out)?;
    }

    write_reserved_names(out)?;

    if paths.user_conf_dir.is_dir() {
        writeln!(out, "# Load possible additional user scripts")?;
        writeln!(out, "conf-dir={}", paths.user_conf_dir.display())?;
        writeln!(out)?;
    }

    Ok(())
}

fn write_header<W: Write>(out: &mut W, paths: &DnsmasqPaths, generated_at: DateTime<Local>) -> io::Result<()> {
    let timestamp = generated_at.format("%Y-%m-%d %H:%M:%S %Z");
    writeln!(out, "# dnsmasq configuration")?;
    writeln!(out, "{MANAGED_BY_MARKER}")?;
    writeln!(out)?;
    writeln!(out, "{BANNER_RULE}")?;
    writeln!(out, "#  FILE AUTOMATICALLY POPULATED, ANY CHANGES MADE HERE WILL BE LOST WHEN")?;
    writeln!(out, "#  THE CONFIGURATION CHANGES.")?;
    writeln!(out, "#")?;
    writeln!(out, "#  Make persistent changes in a separate file within")?;
    writeln!(out, "#      {}/yourname.conf", paths.user_conf_dir.display())?;
    writeln!(out, "#")?;
    writeln!(out, "#  Last update: {timestamp}")?;
    writeln!(out, "{BANNER_RULE}")?;
    writeln!(out)
}

fn write_logging<W: Write>(out: &mut W, config: &DnsmasqConfig) -> io::Result<()> {
    if config.logging {
        writeln!(out, "# Enable query logging")?;
        writeln!(out, "log-queries")?;
        writeln!(out, "log-async")?;
    } else {
        writeln!(out, "# Disable query logging")?;
        writeln!(out, "#log-queries")?;
        writeln!(out, "#log-async")?;
    }

    if !config.log_file.is_empty() {
        writeln!(out, "# Specify the log file to use")?;
        writeln!(out, "# Set even with query logging disabled so warnings and errors")?;
        writeln!(out, "# still land in this file.")?;
        writeln!(out, "log-facility={}", config.log_file)?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_feature_flags<W: Write>(out: &mut W, config: &DnsmasqConfig) -> io::Result<()> {
    if config.bogus_priv {
        writeln!(out, "# Bogus private reverse lookups. All reverse lookups for private IP")?;
        writeln!(out, "# ranges (ie 192.168.x.x, etc) which are not found in /etc/hosts or the")?;
        writeln!(out, "# DHCP leases file are answered with NXDOMAIN rather than being forwarded")?;
        writeln!(out, "bogus-priv")?;
        writeln!(out)?;
    }

    if config.domain_needed {
        writeln!(out, "# Never forward A or AAAA queries for plain names, without dots or")?;
        writeln!(out, "# domain parts, to upstream nameservers")?;
        writeln!(out, "domain-needed")?;
        writeln!(out)?;
    }

    if config.expand_hosts {
        writeln!(out, "# Add the domain to simple names (without a period) in /etc/hosts in")?;
        writeln!(out, "# the same way as for DHCP-derived names")?;
        writeln!(out, "expand-hosts")?;
        writeln!(out)?;
    }

    if config.dnssec {
        writeln!(out, "# Use DNSSEC")?;
        writeln!(out, "dnssec")?;
        writeln!(out, "# 2017-02-02 root zone trust anchor")?;
        writeln!(out, "trust-anchor={ROOT_TRUST_ANCHOR}")?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_domain<W: Write>(out: &mut W, config: &DnsmasqConfig) -> io::Result<()> {
    let Some(domain) = config.effective_domain() else {
        return Ok(());
    };

    writeln!(out, "# DNS domain for the DNS server")?;
    writeln!(out, "domain={domain}")?;
    writeln!(out)?;

    // The domain is purely local: answer from hosts/DHCP, never forward.
    if config.domain_needed {
        writeln!(out, "# Never forward queries for the local domain to upstream nameservers.")?;
        writeln!(out, "# If the name is not known from /etc/hosts or DHCP, NXDOMAIN is returned")?;
        writeln!(out, "local=/{domain}/")?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_listening_mode<W: Write>(out: &mut W, mode: ListeningMode, interface: &str) -> io::Result<()> {
    match mode {
        ListeningMode::Local => {
            writeln!(out, "# Only respond to queries from devices that are at most one hop away (local devices)")?;
            writeln!(out, "local-service")?;
        }
        ListeningMode::All => {
            writeln!(out, "# Listen on all interfaces, permit all origins")?;
            writeln!(out, "except-interface=nonexisting")?;
        }
        ListeningMode::Single => {
            writeln!(out, "# Listen on one interface")?;
            writeln!(out, "interface={interface}")?;
        }
        ListeningMode::Bind => {
            writeln!(out, "# Bind to one interface")?;
            writeln!(out, "interface={interface}")?;
            writeln!(out, "bind-interfaces")?;
        }
    }
    writeln!(out)
}

fn write_rev_server<W: Write>(out: &mut W, config: &DnsmasqConfig) -> io::Result<()> {
    let rev = &config.rev_server;
    if !rev.active {
        return Ok(());
    }

    writeln!(out, "# Reverse server setting")?;
    writeln!(out, "rev-server={},{}", rev.cidr, rev.target)?;

    if !rev.domain.is_empty() {
        writeln!(out, "server=/{}/{}", rev.domain, rev.target)?;
    }

    // Unqualified names go to the target only while they may be forwarded.
    if !config.domain_needed {
        writeln!(out, "server=//{}", rev.target)?;
    }
    writeln!(out)
}

fn write_dhcp<W: Write>(
    out: &mut W,
    config: &DnsmasqConfig,
    paths: &DnsmasqPaths,
    interface: &str,
) -> io::Result<()> {
    let dhcp = &config.dhcp;
    if !dhcp.active {
        return Ok(());
    }

    writeln!(out, "# DHCP server setting")?;
    writeln!(out, "dhcp-authoritative")?;
    writeln!(out, "dhcp-leasefile={}", paths.lease_file.display())?;
    writeln!(out, "dhcp-range={},{},{}", dhcp.start, dhcp.end, dhcp.lease_time)?;
    writeln!(out, "dhcp-option=option:router,{}", dhcp.router)?;

    if dhcp.rapid_commit {
        writeln!(out, "dhcp-rapid-commit")?;
    }

    if dhcp.ipv6 {
        writeln!(out, "dhcp-option=option6:dns-server,[::]")?;
        writeln!(out, "dhcp-range=::,constructor:{interface},ra-names,ra-stateless,64")?;
    }
    writeln!(out)?;

    if !dhcp.hosts.is_empty() {
        writeln!(out, "# Per host parameters for the DHCP server")?;
        for host in &dhcp.hosts {
            writeln!(out, "dhcp-host={host}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_reserved_names<W: Write>(out: &mut W) -> io::Result<()> {
    let [test, localhost, invalid, bind, onion] = RESERVED_NAMES;

    writeln!(out, "# RFC 6761: Caching DNS servers SHOULD recognize")?;
    writeln!(out, "#     test, localhost, invalid")?;
    writeln!(out, "# names as special and SHOULD NOT attempt to look up NS records for them, or")?;
    writeln!(out, "# otherwise query authoritative DNS servers in an attempt to resolve these")?;
    writeln!(out, "# names.")?;
    writeln!(out, "server=/{test}/")?;
    writeln!(out, "server=/{localhost}/")?;
    writeln!(out, "server=/{invalid}/")?;
    writeln!(out)?;
    writeln!(out, "# The same RFC requests something similar for")?;
    writeln!(out, "#     10.in-addr.arpa.      21.172.in-addr.arpa.  27.172.in-addr.arpa.")?;
    writeln!(out, "#     16.172.in-addr.arpa.  22.172.in-addr.arpa.  28.172.in-addr.arpa.")?;
    writeln!(out, "#     17.172.in-addr.arpa.  23.172.in-addr.arpa.  29.172.in-addr.arpa.")?;
    writeln!(out, "#     18.172.in-addr.arpa.  24.172.in-addr.arpa.  30.172.in-addr.arpa.")?;
    writeln!(out, "#     19.172.in-addr.arpa.  25.172.in-addr.arpa.  31.172.in-addr.arpa.")?;
    writeln!(out, "#     20.172.in-addr.arpa.  26.172.in-addr.arpa.  168.192.in-addr.arpa.")?;
    writeln!(out, "# which is covered by \"bogus-priv\" above (if enabled), including IPv6.")?;
    writeln!(out)?;
    writeln!(out, "# Special-use domains from the IANA registry, see")?;
    writeln!(out, "# https://www.iana.org/assignments/special-use-domain-names/special-use-domain-names.xhtml")?;
    writeln!(out, "# \".local\" is left to mDNS.")?;
    writeln!(out, "server=/{bind}/")?;
    writeln!(out, "server=/{onion}/")?;
    writeln!(out)
}
