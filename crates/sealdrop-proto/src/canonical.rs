//! The canonical request string and the replay window
//!
//! `CR = "{username}|{timestamp}|{METHOD}|{path}|{body}"` where body is the
//! exact byte sequence of the HTTP body. Client and server must produce the
//! same bytes or nothing verifies, so this module is the single source of
//! truth for both.

use crate::error::AuthError;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Requests are valid strictly within ±60 seconds of the server clock
pub const REPLAY_WINDOW_SECS: i64 = 60;

/// ISO-8601 UTC seconds, e.g. `2026-08-01T12:00:00Z`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format a timestamp the way the canonical string expects
pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a canonical timestamp; anything else is malformed
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, AuthError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| AuthError::Malformed(format!("bad timestamp {s:?}")))
}

/// Whether a signed timestamp is inside the replay window
///
/// The boundary is rejected: a request at exactly ±60 s is stale.
pub fn is_fresh(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(timestamp).num_seconds().abs() < REPLAY_WINDOW_SECS
}

/// Build the canonical request bytes
pub fn request_canonical(
    username: &str,
    timestamp: &str,
    method: &str,
    path: &str,
    body: &[u8],
) -> Vec<u8> {
    let mut canonical =
        Vec::with_capacity(username.len() + timestamp.len() + method.len() + path.len() + body.len() + 4);
    canonical.extend_from_slice(username.as_bytes());
    canonical.push(b'|');
    canonical.extend_from_slice(timestamp.as_bytes());
    canonical.push(b'|');
    canonical.extend_from_slice(method.as_bytes());
    canonical.push(b'|');
    canonical.extend_from_slice(path.as_bytes());
    canonical.push(b'|');
    canonical.extend_from_slice(body);
    canonical
}
