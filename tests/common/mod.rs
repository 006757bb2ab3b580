#![allow(dead_code)]

use std::fs;
use std::path::Path;

use ndarray::Array2;
use topolakes::raster::{ClassRaster, GeoTransform, Raster, SpatialRef};

pub const NAMES: [&str; 3] = ["map_1904", "map_1932", "map_1955"];

pub fn transform(cell: f64) -> GeoTransform {
    GeoTransform { origin_x: 0.0, origin_y: 100.0, cell_width: cell, cell_height: cell }
}

/// A 40x40 single-band map at 2.5 units per cell with plenty of distinct values.
pub fn source_raster(seed: usize) -> Raster {
    let band = Array2::from_shape_fn((40, 40), |(r, c)| ((r * 7 + c * 13 + seed * 5) % 97) as f64);
    Raster { bands: vec![band], transform: transform(2.5), spatial_ref: SpatialRef::default(), nodata: None }
}

/// Write the three source maps into `dir`.
pub fn write_sources(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    for (i, name) in NAMES.iter().enumerate() {
        topolakes::write_raster(&dir.join(format!("{name}.tif")), &source_raster(i)).unwrap();
    }
}

/// A 10x10 classified raster with domain {0..5}: class 1 forms two separate
/// blocks (6 and 12 cells), the last row holds the other classes.
pub fn class_raster() -> ClassRaster {
    let mut classes = Array2::<u8>::zeros((10, 10));
    for r in 1..3 {
        for c in 1..4 {
            classes[[r, c]] = 1;
        }
    }
    for r in 5..8 {
        for c in 5..9 {
            classes[[r, c]] = 1;
        }
    }
    for (c, v) in [2u8, 3, 4, 5].into_iter().enumerate() {
        classes[[9, c]] = v;
    }
    ClassRaster { classes, transform: transform(5.0), spatial_ref: SpatialRef::default(), info: None }
}

pub fn write_manifest(path: &Path, rows: &[(&str, &str)]) {
    let mut text = String::from("classified_raster,water_class\n");
    for (name, label) in rows {
        text.push_str(&format!("{name},{label}\n"));
    }
    fs::write(path, text).unwrap();
}
