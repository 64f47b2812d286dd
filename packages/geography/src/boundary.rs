//! `GeoJSON` boundary document parsing.

use std::io::Read;

use geo::MultiPolygon;
use geojson::{Feature, GeoJson};

use crate::GeoError;

/// Reads a `GeoJSON` `FeatureCollection` and returns its features.
///
/// # Errors
///
/// Returns [`GeoError`] if the document is malformed or is not a
/// `FeatureCollection`.
pub fn read_features(reader: impl Read) -> Result<Vec<Feature>, GeoError> {
    match GeoJson::from_reader(reader).map_err(geojson::Error::from)? {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Feature(_) => Err(GeoError::NotFeatureCollection { found: "Feature" }),
        GeoJson::Geometry(_) => Err(GeoError::NotFeatureCollection { found: "Geometry" }),
    }
}

/// Converts a feature's geometry into a [`MultiPolygon`].
///
/// Handles both `Polygon` and `MultiPolygon` geometry types. Returns `None`
/// for missing geometry or any other geometry type.
#[must_use]
pub fn feature_multipolygon(feature: &Feature) -> Option<MultiPolygon<f64>> {
    let geometry = feature.geometry.clone()?;
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Reads a string-or-number property as a string.
///
/// Boundary files store codes either way (`"06037"` or `6037`).
#[must_use]
pub fn property_string(feature: &Feature, name: &str) -> Option<String> {
    match feature.property(name)? {
        geojson::JsonValue::String(s) => Some(s.clone()),
        geojson::JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
