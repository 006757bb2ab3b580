//! File-format reading and writing, organised by format.
//!
//! - `tiff` - GeoTIFF rasters (source maps and classified rasters)
//! - `csv` - the classification manifest
//! - `shp` - Shapefile feature classes (shoreline input, lake output)
//! - `geojson` - GeoJSON feature classes (shoreline input, lake output)
//!
//! Every writer goes through a temporary file that is renamed into place.

pub(crate) mod csv;
pub(crate) mod geojson;
pub(crate) mod shp;
pub(crate) mod tiff;
