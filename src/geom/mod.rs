//! Vector side of the polygonizer: tracing masks into map-space polygons,
//! simplification, shoreline clipping and area filtering.

mod bbox;
mod lakes;
mod shoreline;

pub use lakes::{filter_by_area, polygonize_mask, simplify_polygons, LakePolygon};
pub use shoreline::Shoreline;
