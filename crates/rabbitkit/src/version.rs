//! rabbitmqctl version detection.
//!
//! Newer rabbitmqctl releases print table headers in list output unless
//! `--no-table-headers` is passed, and older ones reject that flag.

use regex::Regex;
use std::sync::LazyLock;

pub use semver::Version;

/// First release that understands `--no-table-headers`.
pub const NO_TABLE_HEADERS_SINCE: Version = Version::new(3, 7, 9);

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"RabbitMQ(?:",\s*"|\s+version:\s*)(\d+(?:\.\d+){0,2})"#)
        .expect("VERSION_RE is a valid regex pattern")
});

/// Parse "3.8" or "3.8.9". Missing components are zero.
pub fn parse_version(s: &str) -> Option<Version> {
    let s = s.trim();
    let padded = match s.matches('.').count() {
        0 => format!("{s}.0.0"),
        1 => format!("{s}.0"),
        _ => s.to_string(),
    };
    Version::parse(&padded).ok()
}

/// Whether list commands accept `--no-table-headers`.
pub fn supports_no_table_headers(version: &Version) -> bool {
    *version >= NO_TABLE_HEADERS_SINCE
}

/// Extract the broker version from `rabbitmqctl -q status` output.
///
/// Handles both the Erlang-term status of 3.7 and earlier
/// (`{rabbit,"RabbitMQ","3.6.16"}`) and the 3.8+ report
/// (`RabbitMQ version: 3.8.9`).
pub fn parse_status_version(status: &str) -> Option<Version> {
    VERSION_RE
        .captures(status)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_version(m.as_str()))
}
