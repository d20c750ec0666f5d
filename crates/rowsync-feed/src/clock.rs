//! `updated` clock parsing
//!
//! Feeds carry the row clock either as integer epoch milliseconds or as
//! RFC 3339 text (spreadsheet Atom feeds use the latter).

use chrono::DateTime;
use rowsync_core::Timestamp;

/// Parse a row clock; `None` when the text is neither form, or names the
/// reserved [`Timestamp::NEVER`] value
pub fn parse_updated(text: &str) -> Option<Timestamp> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(millis) = text.parse::<i64>() {
        return Some(Timestamp::from_millis(millis)).filter(|ts| !ts.is_never());
    }

    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| Timestamp::from_millis(dt.timestamp_millis()))
}
