use std::path::Path;
use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::info;
use vfm_export_lambda::adapters::blob_store::BlobStore;
use vfm_export_lambda::config::ExportConfig;
use vfm_export_lambda::handlers::export::handle_export_event;
use vfm_export_lambda::handlers::response::ApiGatewayResponse;
use vfm_export_lambda::telemetry::init_tracing;

struct S3BlobStore {
    s3_client: aws_sdk_s3::Client,
}

impl BlobStore for S3BlobStore {
    fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), String> {
        let body_bytes = std::fs::read(local_path).map_err(|error| {
            format!("failed to read archive '{}': {error}", local_path.display())
        })?;
        let bucket = bucket.to_string();
        let object_key = key.to_string();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_object()
                    .bucket(bucket)
                    .key(object_key)
                    .content_type("application/zip")
                    .body(ByteStream::from(body_bytes))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to write object to s3: {error}"))
            })
        })
    }

    fn presign(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, String> {
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|error| format!("invalid presign expiry: {error}"))?;
        let bucket = bucket.to_string();
        let object_key = key.to_string();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .get_object()
                    .bucket(bucket)
                    .key(object_key)
                    .presigned(presigning)
                    .await
                    .map(|request| request.uri().to_string())
                    .map_err(|error| format!("failed to presign s3 object: {error}"))
            })
        })
    }
}

#[derive(Clone)]
struct RuntimeDependencies {
    config: ExportConfig,
    s3_client: aws_sdk_s3::Client,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    deps: &RuntimeDependencies,
) -> Result<ApiGatewayResponse, Error> {
    let store = S3BlobStore {
        s3_client: deps.s3_client.clone(),
    };
    Ok(handle_export_event(event.payload, &deps.config, &store))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = ExportConfig::from_env().map_err(|error| Error::from(error.to_string()))?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    info!(
        bucket = %config.bucket,
        key_prefix = %config.key_prefix,
        url_ttl_secs = config.url_ttl.as_secs(),
        "shapefile export lambda initialized"
    );

    let deps = RuntimeDependencies {
        config,
        s3_client: aws_sdk_s3::Client::new(&aws_config),
    };

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let deps = deps.clone();
        async move { handle_request(event, &deps).await }
    }))
    .await
}
