//! AWS-oriented adapters and handlers for the shapefile export Lambda.
//!
//! This crate owns runtime integration details (event normalization, response
//! envelopes, configuration, tracing and the blob store seam). Encoding and
//! archiving live in `vfm_export_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod telemetry;
