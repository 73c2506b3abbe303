//! Timestamp formatting helpers
//!
//! All persisted timestamps use RFC 3339 with millisecond precision and a
//! trailing `Z`. The fixed width keeps lexicographic comparison of stored
//! strings consistent with chronological order, which the stuck-record
//! sweep relies on.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

/// Current UTC time in the canonical stored form.
pub fn now_rfc3339() -> String {
    format_rfc3339(Utc::now())
}

/// Format a timestamp in the canonical stored form.
pub fn format_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp back to UTC.
pub fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", raw, e)))
}
