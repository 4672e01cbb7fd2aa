use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use vfm_export_core::contract::{DEFAULT_BUCKET, DEFAULT_KEY_PREFIX, DEFAULT_URL_TTL_SECS};

pub const BUCKET_ENV: &str = "SHAPEFILE_BUCKET";
pub const KEY_PREFIX_ENV: &str = "SHAPEFILE_KEY_PREFIX";
pub const URL_TTL_ENV: &str = "DOWNLOAD_URL_TTL_SECS";
pub const WORK_DIR_ENV: &str = "SHAPEFILE_WORK_DIR";

/// S3 rejects presigned URLs valid for longer than seven days.
pub const MAX_URL_TTL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must not be empty")]
    Empty { name: &'static str },
    #[error("{name} must be a positive integer number of seconds, got '{value}'")]
    InvalidTtl { name: &'static str, value: String },
    #[error("{name} must not exceed {max} seconds, got {value}")]
    TtlTooLong {
        name: &'static str,
        value: u64,
        max: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub bucket: String,
    pub key_prefix: String,
    pub url_ttl: Duration,
    pub work_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            url_ttl: Duration::from_secs(DEFAULT_URL_TTL_SECS),
            work_dir: std::env::temp_dir(),
        }
    }
}

impl ExportConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bucket = match lookup(BUCKET_ENV) {
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::Empty { name: BUCKET_ENV })
            }
            Some(value) => value.trim().to_string(),
            None => defaults.bucket,
        };

        let key_prefix = lookup(KEY_PREFIX_ENV)
            .map(|value| value.trim().trim_matches('/').to_string())
            .unwrap_or(defaults.key_prefix);

        let url_ttl = match lookup(URL_TTL_ENV) {
            Some(value) => parse_ttl(&value)?,
            None => defaults.url_ttl,
        };

        let work_dir = lookup(WORK_DIR_ENV)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.work_dir);

        Ok(Self {
            bucket,
            key_prefix,
            url_ttl,
            work_dir,
        })
    }
}

fn parse_ttl(value: &str) -> Result<Duration, ConfigError> {
    let seconds = value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|seconds| *seconds > 0)
        .ok_or_else(|| ConfigError::InvalidTtl {
            name: URL_TTL_ENV,
            value: value.to_string(),
        })?;

    if seconds > MAX_URL_TTL_SECS {
        return Err(ConfigError::TtlTooLong {
            name: URL_TTL_ENV,
            value: seconds,
            max: MAX_URL_TTL_SECS,
        });
    }

    Ok(Duration::from_secs(seconds))
}
