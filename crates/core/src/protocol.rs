//! Controller/worker wire protocol constants.
//!
//! The worker announces its bound port with a single sentinel line on
//! standard output; everything else it prints is advisory logging. The
//! controller parses only the sentinel.

/// Prefix of the one contractual stdout line.
pub const SENTINEL_PREFIX: &str = "JAMDECK_PORT=";

/// Port tried first when the user expressed no preference.
pub const DEFAULT_PORT: u16 = 8080;

/// Number of sequential ports scanned automatically, starting at
/// [`DEFAULT_PORT`].
pub const PORT_SCAN_SPAN: u16 = 10;

/// Render the sentinel line for a bound port.
pub fn format_sentinel(port: u16) -> String {
    format!("{SENTINEL_PREFIX}{port}")
}

/// Parse a worker output line as a sentinel. Returns `None` for advisory
/// log lines and for malformed sentinels (which the controller ignores
/// rather than trusting a garbled port).
pub fn parse_sentinel(line: &str) -> Option<u16> {
    line.trim()
        .strip_prefix(SENTINEL_PREFIX)?
        .parse::<u16>()
        .ok()
}
