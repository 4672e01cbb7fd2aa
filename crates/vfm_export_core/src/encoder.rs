//! Polygon shapefile encoder.
//!
//! Each feature becomes one polygon shape paired with one `TOTAL_AMT`
//! attribute record. Shape and record are written through a single
//! `write_shape_and_record` call so the Nth geometry always lines up with the
//! Nth attribute row.

use std::path::Path;

use serde_json::Value;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing};
use tracing::debug;

use crate::artifact::{ArtifactKind, ShapefileArtifacts};
use crate::contract::{
    Feature, FeatureCollection, TOTAL_AMOUNT_FIELD, TOTAL_AMOUNT_FIELD_DECIMALS,
    TOTAL_AMOUNT_FIELD_LENGTH, TOTAL_AMOUNT_PROPERTY,
};
use crate::error::ExportError;

/// Writes `<base_path>.shp`, `.shx` and `.dbf` for the collection.
///
/// Existing files at those paths are truncated. All three files are flushed
/// and their headers finalized before this returns.
pub fn encode_feature_collection(
    collection: &FeatureCollection,
    base_path: &Path,
) -> Result<ShapefileArtifacts, ExportError> {
    let artifacts = ShapefileArtifacts::new(base_path, collection.features.len());

    let field_name = FieldName::try_from(TOTAL_AMOUNT_FIELD).map_err(|error| {
        ExportError::encoding(format!("invalid attribute field name: {error:?}"))
    })?;
    let table_builder = TableWriterBuilder::new().add_numeric_field(
        field_name,
        TOTAL_AMOUNT_FIELD_LENGTH,
        TOTAL_AMOUNT_FIELD_DECIMALS,
    );

    let mut writer =
        shapefile::Writer::from_path(artifacts.path(ArtifactKind::Shp), table_builder).map_err(
            |error| ExportError::encoding(format!("failed to create shapefile: {error}")),
        )?;

    for (index, feature) in collection.features.iter().enumerate() {
        let polygon = feature_polygon(feature)
            .map_err(|message| ExportError::encoding(format!("feature {index}: {message}")))?;
        let total = feature_total_amount(feature)
            .and_then(fit_total_amount)
            .map_err(|message| ExportError::encoding(format!("feature {index}: {message}")))?;

        let mut record = Record::default();
        record.insert(
            TOTAL_AMOUNT_FIELD.to_string(),
            FieldValue::Numeric(Some(total)),
        );

        writer
            .write_shape_and_record(&polygon, &record)
            .map_err(|error| {
                ExportError::encoding(format!("failed to write feature {index}: {error}"))
            })?;
    }

    // Headers (bounding box, file length, record count) are finalized on drop.
    drop(writer);

    debug!(
        base_path = %artifacts.base_path().display(),
        records = artifacts.record_count(),
        "shapefile written"
    );
    Ok(artifacts)
}

/// Builds the polygon for a feature from `geometry.coordinates`.
///
/// The first ring is the exterior, any further rings are holes. Ring closure
/// and winding order are left to the shapefile writer.
pub fn feature_polygon(feature: &Feature) -> Result<Polygon, String> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| "missing geometry".to_string())?;
    let coordinates = geometry
        .coordinates
        .as_ref()
        .ok_or_else(|| "geometry is missing coordinates".to_string())?;

    let rings = coordinates
        .as_array()
        .ok_or_else(|| "polygon coordinates must be an array of rings".to_string())?;
    if rings.is_empty() {
        return Err("polygon must have at least one ring".to_string());
    }

    let mut polygon_rings = Vec::with_capacity(rings.len());
    for (ring_index, ring) in rings.iter().enumerate() {
        let points =
            ring_points(ring).map_err(|message| format!("ring {ring_index}: {message}"))?;
        if ring_index == 0 {
            polygon_rings.push(PolygonRing::Outer(points));
        } else {
            polygon_rings.push(PolygonRing::Inner(points));
        }
    }

    Ok(Polygon::with_rings(polygon_rings))
}

fn ring_points(ring: &Value) -> Result<Vec<Point>, String> {
    let positions = ring
        .as_array()
        .ok_or_else(|| "ring must be an array of positions".to_string())?;
    if positions.is_empty() {
        return Err("ring has no positions".to_string());
    }

    positions
        .iter()
        .enumerate()
        .map(|(position_index, position)| {
            position_point(position)
                .ok_or_else(|| format!("position {position_index} is not an [x, y] pair"))
        })
        .collect()
}

fn position_point(position: &Value) -> Option<Point> {
    let ordinates = position.as_array()?;
    if ordinates.len() < 2 {
        return None;
    }
    let x = ordinates[0].as_f64()?;
    let y = ordinates[1].as_f64()?;
    Some(Point::new(x, y))
}

/// Reads `properties.amount_fertilization_total`, defaulting to 0.
///
/// Absent properties, an absent key and JSON `null` all count as 0. Numeric
/// text is accepted unless it spells a non-finite value.
pub fn feature_total_amount(feature: &Feature) -> Result<f64, String> {
    let Some(value) = feature
        .properties
        .as_ref()
        .and_then(|properties| properties.get(TOTAL_AMOUNT_PROPERTY))
    else {
        return Ok(0.0);
    };

    match value {
        Value::Null => Ok(0.0),
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| format!("{TOTAL_AMOUNT_PROPERTY} is out of range")),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|total| total.is_finite())
            .ok_or_else(|| format!("{TOTAL_AMOUNT_PROPERTY} '{text}' is not numeric")),
        _ => Err(format!("{TOTAL_AMOUNT_PROPERTY} must be a number")),
    }
}

/// Rejects amounts whose text form does not fit the `TOTAL_AMT` column.
///
/// The dBASE writer stores the shortest decimal text of the value and cuts
/// anything past the field width.
fn fit_total_amount(total: f64) -> Result<f64, String> {
    if !total.is_finite() {
        return Err(format!("{TOTAL_AMOUNT_PROPERTY} must be finite"));
    }
    let text = total.to_string();
    if text.len() > usize::from(TOTAL_AMOUNT_FIELD_LENGTH) {
        return Err(format!(
            "{TOTAL_AMOUNT_PROPERTY} {text} does not fit {TOTAL_AMOUNT_FIELD} \
             ({TOTAL_AMOUNT_FIELD_LENGTH} characters)"
        ));
    }
    Ok(total)
}
