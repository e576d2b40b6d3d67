//! Integration tests for `dnsmasq-conf`.
//!
//! dnsmasq is stood in for by `/bin/sh -c '<script>'`. Tests marked
//! `#[ignore]` need a real `dnsmasq` on `PATH`:
//!
//! ```bash
//! cargo test -- --ignored
//! ```

use dnsmasq_conf::{
    ConfigError, ConfigWriter, DaemonCommand, DnsmasqConfig, DnsmasqPaths, LegacyFiles,
    ListeningMode, legacy,
};
use std::path::Path;

fn fake_dnsmasq(script: &str) -> DaemonCommand {
    DaemonCommand::new("/bin/sh").with_leading_args(["-c", script, "dnsmasq"])
}

fn writer(dir: &Path, script: &str) -> ConfigWriter {
    ConfigWriter::new()
        .with_paths(DnsmasqPaths::in_dir(dir))
        .with_daemon(fake_dnsmasq(script))
}

// ---------------------------------------------------------------------------
// Install cycle
// ---------------------------------------------------------------------------

#[test]
fn import_then_install() {
    let dir = tempfile::tempdir().unwrap();
    let files = LegacyFiles {
        static_leases: dir.path().join("04-static-dhcp.conf"),
        cnames: dir.path().join("05-custom-cname.conf"),
    };
    std::fs::write(
        &files.static_leases,
        "dhcp-host=aa:bb:cc:dd:ee:ff,fixed-host\ndhcp-range=192.168.1.10,192.168.1.99,24h\n",
    )
    .unwrap();
    std::fs::write(&files.cnames, "cname=nas.lan,storage.lan\n").unwrap();

    let mut config = DnsmasqConfig::default();
    config.dhcp.active = true;
    config.upstreams = vec!["9.9.9.9".into()];
    legacy::import_all(&files, &mut config).unwrap();

    // Accept only files that carry the imported entries.
    let w = writer(
        dir.path(),
        r#"f="${1#--conf-file=}"; grep -q '^dhcp-host=aa:bb:cc:dd:ee:ff,fixed-host$' "$f" && grep -q '^cname=nas.lan,storage.lan$' "$f""#,
    );
    w.write_config(&config, true).unwrap();

    let installed = std::fs::read_to_string(&w.paths().installed_conf).unwrap();
    assert!(installed.contains("\nserver=9.9.9.9\n"));
    assert!(installed.contains("\ndhcp-host=aa:bb:cc:dd:ee:ff,fixed-host\n"));
    assert!(installed.contains("\ncname=nas.lan,storage.lan\n"));

    // Legacy files are retired; a second import changes nothing.
    assert!(!files.static_leases.exists());
    assert!(!files.cnames.exists());
    let before = config.clone();
    let summary = legacy::import_all(&files, &mut config).unwrap();
    assert_eq!(summary.static_leases + summary.cnames, 0);
    assert_eq!(config, before);
}

#[test]
fn failed_validation_preserves_installed_file() {
    let dir = tempfile::tempdir().unwrap();

    // Prior good install.
    let good = writer(dir.path(), "exit 0");
    let mut config = DnsmasqConfig::default();
    config.listening_mode = ListeningMode::All;
    good.write_config(&config, true).unwrap();
    let installed_before = std::fs::read(&good.paths().installed_conf).unwrap();

    // dnsmasq complains about the line holding `port=`.
    let bad = writer(
        dir.path(),
        r#"f="${1#--conf-file=}"; n=$(grep -n '^port=' "$f" | cut -d: -f1); echo; echo "dnsmasq: bad port at line $n of $f"; exit 1"#,
    );
    config.port = 5353;
    let err = bad.write_config(&config, true).unwrap_err();

    assert!(err.is_rejected());
    let ConfigError::Rejected { verdict, line } = &err else {
        unreachable!()
    };
    assert!(!verdict.crashed());
    assert!(verdict.diagnostic.starts_with("dnsmasq: bad port at line "));
    assert_eq!(line.as_ref().map(|(_, text)| text.as_str()), Some("port=5353"));
    assert!(err.to_string().contains("port=5353"));

    assert_eq!(std::fs::read(&bad.paths().installed_conf).unwrap(), installed_before);
    let temp = std::fs::read_to_string(&bad.paths().temp_conf).unwrap();
    assert!(temp.contains("\nport=5353\n"));
}

#[test]
fn crashed_validation_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let w = writer(dir.path(), "kill -9 $$");

    let err = w.write_config(&DnsmasqConfig::default(), true).unwrap_err();
    let ConfigError::Rejected { verdict, .. } = err else {
        panic!("expected rejection, got {err:?}");
    };
    assert!(verdict.crashed());
    assert_eq!(verdict.signal, Some(9));
    assert!(!w.paths().installed_conf.exists());
}

#[test]
fn repeated_installs_replace_file() {
    let dir = tempfile::tempdir().unwrap();
    let w = writer(dir.path(), "exit 0");

    let mut config = DnsmasqConfig::default();
    w.write_config(&config, true).unwrap();
    config.cache_size = 0;
    w.write_config(&config, true).unwrap();

    let installed = std::fs::read_to_string(&w.paths().installed_conf).unwrap();
    assert!(installed.contains("\ncache-size=0\n"));
    assert!(!installed.contains("cache-size=10000"));
}

#[test]
fn user_conf_dir_is_included_when_present() {
    let dir = tempfile::tempdir().unwrap();
    let w = writer(dir.path(), "exit 0");
    std::fs::create_dir(&w.paths().user_conf_dir).unwrap();

    w.write_config(&DnsmasqConfig::default(), false).unwrap();

    let installed = std::fs::read_to_string(&w.paths().installed_conf).unwrap();
    let expected = format!("\nconf-dir={}\n", w.paths().user_conf_dir.display());
    assert!(installed.contains(&expected));
}

// ---------------------------------------------------------------------------
// Real dnsmasq
// ---------------------------------------------------------------------------

#[test]
#[ignore = "requires dnsmasq on PATH"]
fn real_dnsmasq_accepts_default_render() {
    let dir = tempfile::tempdir().unwrap();
    let w = ConfigWriter::new().with_paths(DnsmasqPaths::in_dir(dir.path()));
    std::fs::write(&w.paths().local_hosts, "").unwrap();
    std::fs::write(&w.paths().custom_hosts, "").unwrap();

    let mut config = DnsmasqConfig::default();
    config.log_file.clear();
    config.upstreams = vec!["9.9.9.9".into()];
    w.write_config(&config, true).unwrap();
    assert!(w.paths().installed_conf.exists());
}
