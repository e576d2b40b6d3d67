//! Mapping dnsmasq diagnostics back to the offending config line.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

const LINE_LOCATOR: &str = " at line ";

/// Extracts `N` from the first `" at line N of ..."` in a dnsmasq diagnostic.
///
/// Line numbers are 1-based; `0` is treated as no locator.
///
/// ```
/// use dnsmasq_conf::line_number;
///
/// let msg = "dnsmasq: syntax check OK... bad option at line 42 of /tmp/x.conf";
/// assert_eq!(line_number(msg), Some(42));
/// assert_eq!(line_number("dnsmasq: syntax check OK."), None);
/// ```
#[must_use]
pub fn line_number(diagnostic: &str) -> Option<usize> {
    let start = diagnostic.find(LINE_LOCATOR)? + LINE_LOCATOR.len();
    let rest = &diagnostic[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse::<usize>().ok().filter(|&n| n > 0)
}

/// Returns the text of the 1-based line `lineno` of `path`, without its
/// newline, or `None` if the file has fewer lines.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read.
pub fn config_line(path: &Path, lineno: usize) -> io::Result<Option<String>> {
    if lineno == 0 {
        return Ok(None);
    }

    let reader = BufReader::new(File::open(path)?);
    match reader.split(b'\n').nth(lineno - 1) {
        Some(line) => Ok(Some(String::from_utf8_lossy(&line?).into_owned())),
        None => Ok(None),
    }
}

/// Resolves a diagnostic to `(line number, line text)` in `path`.
///
/// Lookup failures are logged and yield `None`; they never mask the
/// diagnostic itself.
#[must_use]
pub fn locate(diagnostic: &str, path: &Path) -> Option<(usize, String)> {
    let lineno = line_number(diagnostic)?;
    match config_line(path, lineno) {
        Ok(Some(text)) => Some((lineno, text)),
        Ok(None) => {
            tracing::debug!(path = %path.display(), lineno, "Diagnostic names a line past end of file");
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot read config to locate diagnostic");
            None
        }
    }
}
