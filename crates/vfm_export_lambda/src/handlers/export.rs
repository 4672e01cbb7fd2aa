use serde_json::Value;
use tracing::{debug, error, info};
use vfm_export_core::archive::archive_shapefile;
use vfm_export_core::artifact::ArchiveArtifact;
use vfm_export_core::contract::{ExportSuccess, FeatureCollection, ARCHIVE_MEMBER_BASE_NAME};
use vfm_export_core::encoder::encode_feature_collection;
use vfm_export_core::error::ExportError;
use vfm_export_core::storage_keys::generate_export_key;

use crate::adapters::blob_store::BlobStore;
use crate::config::ExportConfig;
use crate::handlers::request::{is_preflight, normalize_event};
use crate::handlers::response::{
    failure_response, preflight_response, success_response, ApiGatewayResponse,
};

/// Handles one API Gateway (or direct) invocation.
///
/// Preflight requests return 204 without touching the pipeline. Everything
/// else ends in exactly one 200 or 500 response.
pub fn handle_export_event(
    event: Value,
    config: &ExportConfig,
    store: &dyn BlobStore,
) -> ApiGatewayResponse {
    if is_preflight(&event) {
        debug!("preflight_handled");
        return preflight_response();
    }

    let outcome =
        normalize_event(event).and_then(|collection| run_export(&collection, config, store));

    match outcome {
        Ok(success) => {
            info!(key = %success.key, "export_completed");
            success_response(&success)
        }
        Err(export_error) => {
            error!(
                error_kind = export_error.kind().as_str(),
                error = %export_error,
                "export_failed"
            );
            failure_response(&export_error)
        }
    }
}

/// Encodes, archives and publishes one feature collection.
///
/// All intermediate files live in a per-invocation directory under
/// `config.work_dir` that is removed when this returns.
pub fn run_export(
    collection: &FeatureCollection,
    config: &ExportConfig,
    store: &dyn BlobStore,
) -> Result<ExportSuccess, ExportError> {
    info!(features = collection.features.len(), "export_started");

    let work_dir = tempfile::Builder::new()
        .prefix("shapefile-export-")
        .tempdir_in(&config.work_dir)
        .map_err(|error| {
            ExportError::encoding(format!(
                "failed to create work directory in '{}': {error}",
                config.work_dir.display()
            ))
        })?;

    let base_path = work_dir.path().join(ARCHIVE_MEMBER_BASE_NAME);
    let artifacts = encode_feature_collection(collection, &base_path)?;
    info!(records = artifacts.record_count(), "shapefile_encoded");

    let zip_path = base_path.with_extension("zip");
    let archive = archive_shapefile(&artifacts, &zip_path)?;
    info!(
        size_bytes = archive.size_bytes,
        entries = ?archive.entries,
        "archive_written"
    );

    publish_archive(&archive, config, store)
}

/// Uploads the archive under a fresh key and presigns a download link.
///
/// One attempt each; any failure is a `PublishError`.
pub fn publish_archive(
    archive: &ArchiveArtifact,
    config: &ExportConfig,
    store: &dyn BlobStore,
) -> Result<ExportSuccess, ExportError> {
    let key = generate_export_key(&config.key_prefix);

    store
        .upload(&archive.path, &config.bucket, &key)
        .map_err(|error| ExportError::publish(format!("upload of '{key}' failed: {error}")))?;
    info!(bucket = %config.bucket, key = %key, "archive_uploaded");

    let download_url = store
        .presign(&config.bucket, &key, config.url_ttl)
        .map_err(|error| ExportError::publish(format!("presigning '{key}' failed: {error}")))?;

    Ok(ExportSuccess { key, download_url })
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    struct RecordingStore {
        uploads: Mutex<Vec<(String, String, u64)>>,
        presigned: Mutex<Vec<(String, String, Duration)>>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                uploads: Mutex::new(Vec::new()),
                presigned: Mutex::new(Vec::new()),
            }
        }

        fn uploads(&self) -> Vec<(String, String, u64)> {
            self.uploads.lock().expect("poisoned mutex").clone()
        }

        fn presigned(&self) -> Vec<(String, String, Duration)> {
            self.presigned.lock().expect("poisoned mutex").clone()
        }
    }

    impl BlobStore for RecordingStore {
        fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), String> {
            let size = std::fs::metadata(local_path)
                .map_err(|error| error.to_string())?
                .len();
            self.uploads.lock().expect("poisoned mutex").push((
                bucket.to_string(),
                key.to_string(),
                size,
            ));
            Ok(())
        }

        fn presign(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, String> {
            self.presigned.lock().expect("poisoned mutex").push((
                bucket.to_string(),
                key.to_string(),
                ttl,
            ));
            Ok(format!(
                "https://{bucket}.s3.example.test/{key}?X-Amz-Expires={}",
                ttl.as_secs()
            ))
        }
    }

    struct FailingUploadStore;

    impl BlobStore for FailingUploadStore {
        fn upload(&self, _local_path: &Path, bucket: &str, _key: &str) -> Result<(), String> {
            Err(format!("NoSuchBucket: {bucket}"))
        }

        fn presign(&self, _bucket: &str, _key: &str, _ttl: Duration) -> Result<String, String> {
            panic!("presign must not run after a failed upload");
        }
    }

    struct FailingPresignStore;

    impl BlobStore for FailingPresignStore {
        fn upload(&self, _local_path: &Path, _bucket: &str, _key: &str) -> Result<(), String> {
            Ok(())
        }

        fn presign(&self, _bucket: &str, _key: &str, _ttl: Duration) -> Result<String, String> {
            Err("credentials expired".to_string())
        }
    }

    struct UnreachableStore;

    impl BlobStore for UnreachableStore {
        fn upload(&self, _local_path: &Path, _bucket: &str, _key: &str) -> Result<(), String> {
            panic!("preflight must not upload");
        }

        fn presign(&self, _bucket: &str, _key: &str, _ttl: Duration) -> Result<String, String> {
            panic!("preflight must not presign");
        }
    }

    fn test_config(work_dir: &Path) -> ExportConfig {
        ExportConfig {
            bucket: "vfmaker-test".to_string(),
            key_prefix: "shapefiles".to_string(),
            url_ttl: Duration::from_secs(3600),
            work_dir: work_dir.to_path_buf(),
        }
    }

    fn sample_event() -> Value {
        json!({
            "httpMethod": "POST",
            "body": "{\"features\":[{\"geometry\":{\"coordinates\":[[[0,0],[0,1],[1,1],[1,0],[0,0]]]},\"properties\":{\"amount_fertilization_total\":42}}]}"
        })
    }

    fn body_json(response: &ApiGatewayResponse) -> Value {
        serde_json::from_str(response.body.as_deref().expect("body")).expect("json body")
    }

    #[test]
    fn preflight_never_touches_the_pipeline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = handle_export_event(
            json!({"httpMethod": "OPTIONS", "body": "{not json"}),
            &test_config(dir.path()),
            &UnreachableStore,
        );

        assert_eq!(response.status_code, 204);
        assert!(response.body.is_none());
    }

    #[test]
    fn uploads_once_and_returns_presigned_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RecordingStore::new();

        let response = handle_export_event(sample_event(), &test_config(dir.path()), &store);

        assert_eq!(response.status_code, 200);
        let uploads = store.uploads();
        assert_eq!(uploads.len(), 1);
        let (bucket, key, size) = &uploads[0];
        assert_eq!(bucket, "vfmaker-test");
        assert!(key.starts_with("shapefiles/") && key.ends_with(".zip"));
        assert!(*size > 0);

        let presigned = store.presigned();
        assert_eq!(presigned, vec![(bucket.clone(), key.clone(), Duration::from_secs(3600))]);

        let body = body_json(&response);
        assert!(body["download_url"].as_str().expect("url").contains(key.as_str()));
    }

    #[test]
    fn work_directory_is_removed_after_export() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RecordingStore::new();

        handle_export_event(sample_event(), &test_config(dir.path()), &store);

        let leftovers = std::fs::read_dir(dir.path()).expect("read work dir").count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn malformed_body_yields_500_with_error_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RecordingStore::new();

        let response = handle_export_event(
            json!({"httpMethod": "POST", "body": "{\"features\": ["}),
            &test_config(dir.path()),
            &store,
        );

        assert_eq!(response.status_code, 500);
        let body = body_json(&response);
        assert_eq!(body["message"], "Internal server error");
        assert!(!body["error"].as_str().expect("error").is_empty());
        assert_eq!(body["error_kind"], "malformed_input");
        assert!(store.uploads().is_empty());
    }

    #[test]
    fn feature_without_geometry_is_reported_as_encoding_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RecordingStore::new();

        let response = handle_export_event(
            json!({"features": [{"properties": {"amount_fertilization_total": 1}}]}),
            &test_config(dir.path()),
            &store,
        );

        assert_eq!(response.status_code, 500);
        assert_eq!(body_json(&response)["error_kind"], "encoding_error");
        assert!(store.uploads().is_empty());
    }

    #[test]
    fn upload_failure_is_a_publish_error() {
        let dir = tempfile::tempdir().expect("tempdir");

        let response =
            handle_export_event(sample_event(), &test_config(dir.path()), &FailingUploadStore);

        assert_eq!(response.status_code, 500);
        let body = body_json(&response);
        assert_eq!(body["error_kind"], "publish_error");
        assert!(body["error"]
            .as_str()
            .expect("error")
            .contains("NoSuchBucket: vfmaker-test"));
    }

    #[test]
    fn presign_failure_is_a_publish_error() {
        let dir = tempfile::tempdir().expect("tempdir");

        let error = normalize_event(sample_event())
            .and_then(|collection| {
                run_export(&collection, &test_config(dir.path()), &FailingPresignStore)
            })
            .expect_err("presign failure should surface");

        assert!(matches!(error, ExportError::PublishError(_)));
        assert!(error.to_string().contains("credentials expired"));
    }

    #[test]
    fn missing_work_dir_fails_before_publishing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RecordingStore::new();
        let config = test_config(&dir.path().join("does-not-exist"));

        let response = handle_export_event(sample_event(), &config, &store);

        assert_eq!(response.status_code, 500);
        assert!(store.uploads().is_empty());
    }
}
