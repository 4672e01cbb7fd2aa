use std::path::Path;
use std::time::Duration;

/// Object storage used to publish export archives.
///
/// Credentials and request signing are owned by the implementation.
pub trait BlobStore {
    fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), String>;

    /// Returns a GET-only URL for `bucket/key` that expires after `ttl`.
    fn presign(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, String>;
}
