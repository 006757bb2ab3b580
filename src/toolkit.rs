//! The geoprocessing operations the stages delegate to.
//!
//! Every method has a default backed by this crate's native routines, so an
//! implementation only overrides what it needs to replace.

use anyhow::Result;
use geo::Polygon;
use rastertrace::Connectivity;

use crate::geom::{polygonize_mask, simplify_polygons, Shoreline};
use crate::raster::{self, ClassRaster, ClusterParams, Mask, Raster, ResampleMethod};

pub trait Toolkit {
    fn resample(&self, raster: &Raster, cell_size: f64, method: ResampleMethod) -> Result<Raster> {
        Ok(raster::resample(raster, cell_size, method)?)
    }

    fn classify(&self, raster: &Raster, params: &ClusterParams) -> Result<ClassRaster> {
        Ok(raster::iso_cluster(raster, params)?)
    }

    fn reclassify(&self, raster: &ClassRaster, water_class: u8) -> Result<Mask> {
        Ok(raster::reclassify_binary(raster, water_class))
    }

    fn majority_filter(&self, mask: &Mask) -> Result<Mask> {
        Ok(raster::majority_filter(mask))
    }

    fn fill_holes(&self, mask: &Mask, connectivity: Connectivity) -> Result<Mask> {
        Ok(raster::fill_enclosed(mask, connectivity))
    }

    fn polygonize(&self, mask: &Mask, connectivity: Connectivity) -> Result<Vec<Polygon<f64>>> {
        Ok(polygonize_mask(mask, connectivity))
    }

    fn simplify(&self, polygons: Vec<Polygon<f64>>, tolerance: f64) -> Result<Vec<Polygon<f64>>> {
        Ok(simplify_polygons(polygons, tolerance))
    }

    fn clip(&self, polygons: Vec<Polygon<f64>>, shoreline: &Shoreline) -> Result<Vec<Polygon<f64>>> {
        Ok(polygons.iter().flat_map(|poly| shoreline.clip(poly).0).collect())
    }
}

/// The production toolkit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeToolkit;

impl Toolkit for NativeToolkit {}
