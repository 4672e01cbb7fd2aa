use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const KEY_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3f";
pub const KEY_TOKEN_LEN: usize = 8;

pub fn key_timestamp(now: DateTime<Utc>) -> String {
    now.format(KEY_TIMESTAMP_FORMAT).to_string()
}

pub fn random_key_token() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(KEY_TOKEN_LEN);
    token
}

/// `<prefix>/<timestamp>_<token>.zip`
pub fn export_object_key(base_prefix: &str, timestamp: &str, token: &str) -> String {
    let trimmed = base_prefix.trim_matches('/');
    if trimmed.is_empty() {
        format!("{timestamp}_{token}.zip")
    } else {
        format!("{trimmed}/{timestamp}_{token}.zip")
    }
}

/// Fresh object key for one export. Call once per invocation: the
/// timestamp alone does not separate concurrent or retried exports.
pub fn generate_export_key(base_prefix: &str) -> String {
    export_object_key(base_prefix, &key_timestamp(Utc::now()), &random_key_token())
}
