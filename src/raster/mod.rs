//! In-memory raster model and the raster operators of both stages.

mod cluster;
mod reclass;
mod resample;

use geo::AffineTransform;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub use cluster::{iso_cluster, ClusterParams};
pub use reclass::{fill_enclosed, majority_filter, reclassify_binary, value_domain};
pub use resample::{resample, ResampleMethod};

/// Cluster index reserved for NoData in classified rasters.
pub const CLASS_NODATA: u8 = u8::MAX;

/// North-up affine placement of a raster: the map coordinates of the
/// top-left corner and the (positive) size of one cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub cell_width: f64,
    pub cell_height: f64,
}

impl GeoTransform {
    /// Pixel-space (col, row) corners to map coordinates.
    pub fn to_affine(&self) -> AffineTransform<f64> {
        AffineTransform::new(self.cell_width, 0.0, self.origin_x, 0.0, -self.cell_height, self.origin_y)
    }

    /// Map coordinates of the centre of cell `(col, row)`.
    #[inline]
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.cell_width,
            self.origin_y - (row as f64 + 0.5) * self.cell_height,
        )
    }

    /// Fractional pixel position of map coordinates, relative to cell centres.
    #[inline]
    pub fn to_pixel_center(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.cell_width - 0.5,
            (self.origin_y - y) / self.cell_height - 0.5,
        )
    }

    /// Same origin, new cell size.
    pub fn with_cell_size(&self, cell_size: f64) -> Self {
        Self { cell_width: cell_size, cell_height: cell_size, ..*self }
    }
}

/// GeoTIFF coordinate reference keys, carried through unchanged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpatialRef {
    pub geo_keys: Option<Vec<u16>>,
    pub geo_doubles: Option<Vec<f64>>,
    pub geo_ascii: Option<String>,
}

/// A multi-band raster with `f64` samples.
#[derive(Clone, Debug)]
pub struct Raster {
    pub bands: Vec<Array2<f64>>,
    pub transform: GeoTransform,
    pub spatial_ref: SpatialRef,
    pub nodata: Option<f64>,
}

impl Raster {
    /// (rows, cols) of the raster.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.bands.first().map(|b| b.dim()).unwrap_or((0, 0))
    }

    #[inline] pub fn band_count(&self) -> usize { self.bands.len() }

    /// True if any band holds NoData at `(row, col)`.
    #[inline]
    pub fn is_nodata(&self, row: usize, col: usize) -> bool {
        match self.nodata {
            Some(nodata) => self.bands.iter().any(|b| {
                let v = b[[row, col]];
                v == nodata || v.is_nan()
            }),
            None => self.bands.iter().any(|b| b[[row, col]].is_nan()),
        }
    }
}

/// Provenance of a classified raster, persisted alongside its cells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub source: String,
    pub classes_requested: usize,
    pub cell_size: f64,
}

/// A single-band raster of cluster indices (`0..K-1`, NoData = 255).
#[derive(Clone, Debug)]
pub struct ClassRaster {
    pub classes: Array2<u8>,
    pub transform: GeoTransform,
    pub spatial_ref: SpatialRef,
    pub info: Option<ClassInfo>,
}

impl ClassRaster {
    #[inline] pub fn shape(&self) -> (usize, usize) { self.classes.dim() }
}

/// A binary raster: 1 for cells of interest, 0 elsewhere.
#[derive(Clone, Debug)]
pub struct Mask {
    pub cells: Array2<u8>,
    pub transform: GeoTransform,
}

impl Mask {
    #[inline] pub fn shape(&self) -> (usize, usize) { self.cells.dim() }

    #[inline]
    pub fn is_set(&self, col: usize, row: usize) -> bool {
        self.cells[[row, col]] == 1
    }

    /// Number of set cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&v| v == 1).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

    fn transform() -> GeoTransform {
        GeoTransform { origin_x: 100.0, origin_y: 50.0, cell_width: 2.0, cell_height: 2.0 }
    }

    #[test]
    fn affine_flips_rows_downwards() {
        let c = transform().to_affine().apply(Coord { x: 1.0, y: 1.0 });
        assert_eq!(c, Coord { x: 102.0, y: 48.0 });
    }

    #[test]
    fn pixel_center_roundtrip() {
        let t = transform();
        let (x, y) = t.cell_center(3, 4);
        assert_eq!(t.to_pixel_center(x, y), (3.0, 4.0));
    }

    #[test]
    fn nodata_checks_every_band() {
        let raster = Raster {
            bands: vec![Array2::from_elem((1, 2), 1.0), Array2::from_shape_vec((1, 2), vec![1.0, -9.0]).unwrap()],
            transform: transform(),
            spatial_ref: SpatialRef::default(),
            nodata: Some(-9.0),
        };
        assert!(!raster.is_nodata(0, 0));
        assert!(raster.is_nodata(0, 1));
    }
}
