use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vfm_export_core::contract::{ExportSuccess, FailureBody, SuccessBody};
use vfm_export_core::error::ExportError;

pub const ALLOWED_HEADERS: &str = "Content-Type";
pub const ALLOWED_METHODS: &str = "POST,OPTIONS";
pub const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ApiGatewayResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(Value::as_str)
    }
}

pub fn preflight_response() -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code: 204,
        headers: json!({
            "Access-Control-Allow-Origin": "*",
            "Access-Control-Allow-Headers": ALLOWED_HEADERS,
            "Access-Control-Allow-Methods": ALLOWED_METHODS,
        }),
        body: None,
    }
}

pub fn success_response(success: &ExportSuccess) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code: 200,
        headers: json!({
            "Content-Type": "application/json",
            "Access-Control-Allow-Origin": "*",
            "Cache-Control": "no-store",
            "Access-Control-Allow-Headers": ALLOWED_HEADERS,
            "Access-Control-Allow-Methods": ALLOWED_METHODS,
            "Strict-Transport-Security": HSTS_VALUE,
            "X-Content-Type-Options": "nosniff",
        }),
        body: Some(json_body(&SuccessBody::from(success))),
    }
}

// CORS headers only: HSTS, nosniff and Cache-Control are sent on success alone.
pub fn failure_response(error: &ExportError) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code: error.status_code(),
        headers: json!({
            "Content-Type": "application/json",
            "Access-Control-Allow-Origin": "*",
            "Access-Control-Allow-Headers": ALLOWED_HEADERS,
            "Access-Control-Allow-Methods": ALLOWED_METHODS,
        }),
        body: Some(json_body(&FailureBody::from(error))),
    }
}

fn json_body(payload: &impl Serialize) -> String {
    serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string())
}
