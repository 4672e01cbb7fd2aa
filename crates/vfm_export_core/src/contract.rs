use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ExportError;

pub const TOTAL_AMOUNT_FIELD: &str = "TOTAL_AMT";
pub const TOTAL_AMOUNT_FIELD_LENGTH: u8 = 50;
pub const TOTAL_AMOUNT_FIELD_DECIMALS: u8 = 5;
pub const TOTAL_AMOUNT_PROPERTY: &str = "amount_fertilization_total";
pub const ARCHIVE_MEMBER_BASE_NAME: &str = "output";
pub const DEFAULT_BUCKET: &str = "vfmaker";
pub const DEFAULT_KEY_PREFIX: &str = "shapefiles";
pub const DEFAULT_URL_TTL_SECS: u64 = 3600;
pub const SUCCESS_MESSAGE: &str = "Download link generated.";
pub const FAILURE_MESSAGE: &str = "Internal server error";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub collection_type: Option<String>,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

/// Geometry as sent by the client.
///
/// Coordinates stay as raw JSON so that shape problems are reported by the
/// encoder rather than rejected while parsing the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Geometry {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportSuccess {
    pub key: String,
    pub download_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuccessBody {
    pub message: String,
    pub download_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureBody {
    pub message: String,
    pub error: String,
    pub error_kind: String,
}

impl From<&ExportSuccess> for SuccessBody {
    fn from(success: &ExportSuccess) -> Self {
        Self {
            message: SUCCESS_MESSAGE.to_string(),
            download_url: success.download_url.clone(),
        }
    }
}

impl From<&ExportError> for FailureBody {
    fn from(error: &ExportError) -> Self {
        Self {
            message: FAILURE_MESSAGE.to_string(),
            error: error.to_string(),
            error_kind: error.kind().as_str().to_string(),
        }
    }
}

pub fn parse_feature_collection(value: Value) -> Result<FeatureCollection, ExportError> {
    if !value.is_object() {
        return Err(ExportError::malformed_input(
            "GeoJSON payload must be a JSON object",
        ));
    }

    serde_json::from_value(value).map_err(|error| {
        ExportError::malformed_input(format!("invalid feature collection: {error}"))
    })
}
