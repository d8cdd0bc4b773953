use chrono::Utc;
use couch_core::Timestamp;

/// Returns the current time in seconds since the unix epoch, with millisecond precision
pub fn now() -> Timestamp {
    Utc::now().timestamp_millis() as f64 / 1000.
}
