//! Shared shapefile export domain primitives.
//!
//! This crate owns the GeoJSON input contract, the shapefile encoder, the zip
//! archiver and storage key generation. It intentionally excludes AWS SDK and
//! Lambda runtime concerns.

pub mod archive;
pub mod artifact;
pub mod contract;
pub mod encoder;
pub mod error;
pub mod storage_keys;
