use std::path::Path;

use anyhow::{bail, Result};
use geo::{BooleanOps, BoundingRect, MultiPolygon, Polygon};
use rstar::RTree;

use crate::geom::bbox::{envelope, BoundingBox};
use crate::io;

/// Polygons of a shoreline layer, indexed by bounding box. Used only as a
/// clip boundary.
#[derive(Debug, Clone)]
pub struct Shoreline {
    parts: Vec<Polygon<f64>>,
    rtree: RTree<BoundingBox>,
}

impl Shoreline {
    /// Index the polygons of `shapes`; empty parts are ignored.
    pub fn new(shapes: impl IntoIterator<Item = MultiPolygon<f64>>) -> Self {
        let parts: Vec<Polygon<f64>> = shapes.into_iter().flat_map(|mp| mp.0).collect();
        let boxes = parts.iter().enumerate()
            .filter_map(|(i, part)| part.bounding_rect().map(|rect| BoundingBox::new(i, rect)))
            .collect();
        Self { parts, rtree: RTree::bulk_load(boxes) }
    }

    /// Read a shoreline layer from a Shapefile or GeoJSON file.
    pub fn read(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        let shapes = match ext.as_deref() {
            Some("shp") => io::shp::read_polygons(path)?,
            Some("geojson" | "json") => io::geojson::read_polygons(path)?,
            _ => bail!("[geom::shoreline] Unsupported layer format: {}", path.display()),
        };
        Ok(Self::new(shapes))
    }

    #[inline] pub fn len(&self) -> usize { self.parts.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.parts.is_empty() }

    /// The part of `polygon` that lies inside the shoreline. Empty when the
    /// polygon is wholly outside.
    pub fn clip(&self, polygon: &Polygon<f64>) -> MultiPolygon<f64> {
        let Some(rect) = polygon.bounding_rect() else {
            return MultiPolygon::new(Vec::new());
        };
        let boundary = self.rtree.locate_in_envelope_intersecting(&envelope(&rect))
            .map(|bbox| MultiPolygon::new(vec![self.parts[bbox.idx()].clone()]))
            .reduce(|a, b| a.union(&b));
        match boundary {
            Some(boundary) => polygon.intersection(&boundary),
            None => MultiPolygon::new(Vec::new()),
        }
    }
}
