//! Identifier and clock helpers shared by sessions and messages.

use uuid::Uuid;

/// A fresh random (v4) UUID in hyphenated form.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
