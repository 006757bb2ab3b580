use geo::{AffineOps, Area, Orient, Polygon, SimplifyVwPreserve, Validation};
use geo::orient::Direction;
use rastertrace::{trace_regions, Connectivity};

use crate::raster::Mask;

/// One output polygon with its provenance and planar area.
#[derive(Debug, Clone, PartialEq)]
pub struct LakePolygon {
    pub polygon: Polygon<f64>,
    /// Name of the classified raster the polygon was traced from.
    pub source: String,
    /// Area in map units squared.
    pub area: f64,
}

impl LakePolygon {
    pub fn new(polygon: Polygon<f64>, source: &str) -> Self {
        let area = polygon.unsigned_area();
        Self { polygon, source: source.to_string(), area }
    }
}

/// Trace every connected region of set cells into a map-space polygon.
///
/// Rings come out exterior counter-clockwise, holes clockwise.  Every polygon
/// is valid; a hole may touch its exterior at a single corner.
pub fn polygonize_mask(mask: &Mask, connectivity: Connectivity) -> Vec<Polygon<f64>> {
    let (rows, cols) = mask.shape();
    let affine = mask.transform.to_affine();
    trace_regions(cols, rows, connectivity, |c, r| mask.is_set(c, r))
        .into_iter()
        .map(|poly| poly.affine_transform(&affine).orient(Direction::Default))
        .collect()
}

/// Topology-preserving Visvalingam-Whyatt simplification with an area
/// threshold of `tolerance²`. Polygons that collapse are dropped; a polygon
/// whose simplified form is invalid keeps its traced outline.
pub fn simplify_polygons(polygons: Vec<Polygon<f64>>, tolerance: f64) -> Vec<Polygon<f64>> {
    if tolerance <= 0.0 {
        return polygons;
    }
    let epsilon = tolerance * tolerance;
    polygons.into_iter()
        .filter_map(|poly| {
            let simplified = poly.simplify_vw_preserve(&epsilon);
            if simplified.exterior().0.len() < 4 || simplified.unsigned_area() <= 0.0 {
                None
            } else if simplified.is_valid() {
                Some(simplified)
            } else {
                Some(poly)
            }
        })
        .collect()
}

/// Keep polygons strictly larger than `min_area`.
pub fn filter_by_area(lakes: Vec<LakePolygon>, min_area: f64) -> Vec<LakePolygon> {
    lakes.into_iter().filter(|lake| lake.area > min_area).collect()
}
