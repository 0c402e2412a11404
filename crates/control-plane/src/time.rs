use chrono::{Duration, SecondsFormat, Utc};

const MAX_OFFSET_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Current UTC time as an RFC 3339 string with millisecond precision.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Offsets are clamped to a century.
pub fn rfc3339_after_secs(seconds: u64) -> String {
    let offset = Duration::seconds(seconds.min(MAX_OFFSET_SECS) as i64);
    (Utc::now() + offset).to_rfc3339_opts(SecondsFormat::Millis, true)
}
