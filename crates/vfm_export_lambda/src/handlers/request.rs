use serde_json::{json, Value};
use vfm_export_core::contract::{parse_feature_collection, FeatureCollection};
use vfm_export_core::error::ExportError;

/// HTTP method of an API Gateway event, REST (`httpMethod`) or HTTP API v2
/// (`requestContext.http.method`). Direct invocations have none.
pub fn request_method(event: &Value) -> Option<&str> {
    event
        .get("httpMethod")
        .and_then(Value::as_str)
        .or_else(|| {
            event
                .pointer("/requestContext/http/method")
                .and_then(Value::as_str)
        })
}

pub fn is_preflight(event: &Value) -> bool {
    request_method(event)
        .map(|method| method.eq_ignore_ascii_case("OPTIONS"))
        .unwrap_or(false)
}

/// Extracts the GeoJSON feature collection carried by an event.
///
/// A text `body` is parsed as JSON, an object `body` is used as is, and an
/// event without `body` is itself taken as the collection.
pub fn normalize_event(event: Value) -> Result<FeatureCollection, ExportError> {
    let Some(object) = event.as_object() else {
        return Err(ExportError::malformed_input(
            "request payload must be a JSON object",
        ));
    };

    let Some(body) = object.get("body") else {
        return parse_feature_collection(event);
    };

    let payload = match body {
        Value::Null => json!({}),
        Value::Object(_) => body.clone(),
        Value::String(text) => serde_json::from_str(text).map_err(|error| {
            ExportError::malformed_input(format!("malformed JSON body: {error}"))
        })?,
        _ => {
            return Err(ExportError::malformed_input(
                "request body must be a JSON object or a JSON string",
            ))
        }
    };

    parse_feature_collection(payload)
}
