//! In-memory spatial index over county boundaries.

use std::collections::BTreeMap;

use geo::{BoundingRect, Centroid, Contains, MultiPolygon};
use outage_map_geography_models::RegionId;
use rstar::{AABB, RTree, RTreeObject};

/// A county polygon stored in the R-tree.
#[derive(Debug, Clone)]
struct RegionEntry {
    id: RegionId,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for RegionEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree of county boundaries for click hit testing.
///
/// Built once after the boundary document is read and shared by every
/// consumer of the dataset.
#[derive(Debug, Clone, Default)]
pub struct RegionIndex {
    tree: RTree<RegionEntry>,
    centroids: BTreeMap<RegionId, (f64, f64)>,
}

impl RegionIndex {
    /// Bulk-loads the index from `(county, polygon)` pairs.
    pub fn build(boundaries: impl IntoIterator<Item = (RegionId, MultiPolygon<f64>)>) -> Self {
        let mut centroids = BTreeMap::new();
        let entries: Vec<RegionEntry> = boundaries
            .into_iter()
            .map(|(id, polygon)| {
                if let Some(c) = polygon.centroid() {
                    centroids.insert(id, (c.x(), c.y()));
                }
                RegionEntry {
                    id,
                    envelope: compute_envelope(&polygon),
                    polygon,
                }
            })
            .collect();

        log::debug!("Indexed {} county boundaries", entries.len());

        Self {
            tree: RTree::bulk_load(entries),
            centroids,
        }
    }

    /// Number of indexed counties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Looks up the county containing a point.
    ///
    /// Counties tile the map without overlap; if malformed input does
    /// overlap, the lowest FIPS code wins so that the answer is stable.
    /// Returns `None` when the point is on the map background.
    #[must_use]
    pub fn locate(&self, lon: f64, lat: f64) -> Option<RegionId> {
        let point = geo::Point::new(lon, lat);
        let query_env = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .map(|entry| entry.id)
            .min()
    }

    /// Centroid of a county's boundary as `(lon, lat)`.
    #[must_use]
    pub fn centroid(&self, id: RegionId) -> Option<(f64, f64)> {
        self.centroids.get(&id).copied()
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]])
    }

    fn id(code: u32) -> RegionId {
        RegionId::new(code).unwrap()
    }

    #[test]
    fn locates_containing_county() {
        let index = RegionIndex::build([
            (id(6037), square(0.0, 0.0, 1.0)),
            (id(6059), square(1.0, 0.0, 1.0)),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.locate(0.5, 0.5), Some(id(6037)));
        assert_eq!(index.locate(1.5, 0.5), Some(id(6059)));
    }

    #[test]
    fn background_point_matches_nothing() {
        let index = RegionIndex::build([(id(6037), square(0.0, 0.0, 1.0))]);
        assert_eq!(index.locate(5.0, 5.0), None);
    }

    #[test]
    fn overlapping_boundaries_resolve_to_lowest_code() {
        let index = RegionIndex::build([
            (id(6059), square(0.0, 0.0, 2.0)),
            (id(6037), square(0.0, 0.0, 1.0)),
        ]);
        assert_eq!(index.locate(0.5, 0.5), Some(id(6037)));
    }

    #[test]
    fn records_centroids() {
        let index = RegionIndex::build([(id(6037), square(0.0, 0.0, 2.0))]);
        let (x, y) = index.centroid(id(6037)).unwrap();
        assert!((x - 1.0).abs() < 1e-9);
        assert!((y - 1.0).abs() < 1e-9);
    }
}
