use crate::types::Timestamp;

/// Current UTC Unix timestamp, seconds.
pub fn now_unix() -> Timestamp {
    chrono::Utc::now().timestamp()
}
