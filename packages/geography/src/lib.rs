#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! County boundary parsing and point-in-polygon region lookup.
//!
//! Reads the county boundary `GeoJSON` document, converts feature
//! geometries into [`geo`] polygons and builds an R-tree so that a click on
//! the choropleth (a longitude/latitude pair) resolves to the county under
//! it, or to nothing when the click lands on the map background.

pub mod boundary;
pub mod index;

use thiserror::Error;

pub use index::RegionIndex;

/// Errors that can occur while reading boundary data.
#[derive(Debug, Error)]
pub enum GeoError {
    /// The document is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The document parsed but is not a `FeatureCollection`.
    #[error("Expected a GeoJSON FeatureCollection, found {found}")]
    NotFeatureCollection {
        /// The top-level `GeoJSON` object type that was found.
        found: &'static str,
    },
}
