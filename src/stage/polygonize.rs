use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, error, info, warn};

use crate::common::ensure_dir_exists;
use crate::config::{OutputFormat, PolygonizeConfig};
use crate::error::Error;
use crate::geom::{filter_by_area, LakePolygon, Shoreline};
use crate::io;
use crate::manifest::{Label, Manifest, ManifestRow};
use crate::naming::lake_name;
use crate::raster::{value_domain, ClassRaster};
use crate::summary::RunSummary;
use crate::toolkit::{NativeToolkit, Toolkit};

pub const STAGE: &str = "polygonize";

/// Result of processing one labelled row.
enum Outcome {
    Written(usize),
    Skipped(String),
}

/// Turns the labelled water class of every manifest row into a lake
/// feature class.
#[derive(Debug, Clone)]
pub struct Polygonizer<T: Toolkit = NativeToolkit> {
    config: PolygonizeConfig,
    toolkit: T,
}

impl Polygonizer<NativeToolkit> {
    pub fn new(config: PolygonizeConfig) -> Self {
        Self { config, toolkit: NativeToolkit }
    }
}

impl<T: Toolkit> Polygonizer<T> {
    pub fn with_toolkit(config: PolygonizeConfig, toolkit: T) -> Self {
        Self { config, toolkit }
    }

    #[inline] pub fn config(&self) -> &PolygonizeConfig { &self.config }

    /// Run the stage over every manifest row.
    pub fn run(&self) -> Result<RunSummary, Error> {
        let config = &self.config;
        config.validate()?;
        let manifest = Manifest::read(&config.manifest)?;
        let shoreline = config.shoreline.as_deref()
            .map(|path| {
                Shoreline::read(path).map_err(|source| Error::Layer { path: path.to_path_buf(), source })
            })
            .transpose()?;
        if let Some(shoreline) = &shoreline {
            debug!(parts = shoreline.len(), "loaded shoreline");
        }
        ensure_dir_exists(&config.output).map_err(Error::Io)?;

        let mut summary = RunSummary::new(STAGE, config).map_err(Error::Io)?;
        let mut claimed = HashSet::new();
        let total = manifest.len();

        for (i, row) in manifest.rows().iter().enumerate() {
            let name = row.classified_raster.as_str();
            info!("Processing {} of {}: {}", i + 1, total, name);

            let water_class = match row.label() {
                Label::Class(v) => v,
                Label::Missing => {
                    warn!(raster = %name, "no water_class assigned, skipping");
                    summary.skip(name, "no water_class assigned");
                    continue;
                }
                Label::Invalid(text) => {
                    warn!(raster = %name, "water_class `{text}` is not an integer, skipping");
                    summary.skip(name, format!("water_class `{text}` is not an integer"));
                    continue;
                }
            };

            let lakes = lake_name(name);
            if !claimed.insert(lakes.clone()) {
                let reason = format!("output name `{lakes}` is already produced by another row");
                error!(raster = %name, "{reason}");
                summary.fail(name, reason);
                continue;
            }

            let out_path = config.output.join(format!("{lakes}.{}", config.format.extension()));
            if config.skip_existing && out_path.exists() {
                info!(raster = %name, "skipping, feature class exists");
                summary.skip(name, format!("{} already exists", out_path.display()));
                continue;
            }

            match self.polygonize_one(row, water_class, shoreline.as_ref(), &out_path) {
                Ok(Outcome::Written(count)) => {
                    info!(raster = %name, lakes = count, "wrote {}", out_path.display());
                    summary.succeed(name);
                }
                Ok(Outcome::Skipped(reason)) => {
                    warn!(raster = %name, "{reason}, skipping");
                    summary.skip(name, reason);
                }
                Err(err) => {
                    error!(raster = %name, "polygonizing failed: {err:#}");
                    summary.fail(name, format!("{err:#}"));
                }
            }
        }

        summary.write(&config.output).map_err(Error::Io)?;
        Ok(summary)
    }

    fn polygonize_one(
        &self,
        row: &ManifestRow,
        water_class: i64,
        shoreline: Option<&Shoreline>,
        out_path: &Path,
    ) -> anyhow::Result<Outcome> {
        let config = &self.config;
        let name = row.classified_raster.as_str();
        let raster_path = config.rasters.join(format!("{name}.tif"));
        let raster = io::tiff::read_class_raster(&raster_path)
            .with_context(|| format!("[stage::polygonize] Failed to read {}", raster_path.display()))?;

        let Some(water_class) = in_domain(&raster, water_class) else {
            let domain: Vec<u8> = value_domain(&raster).into_iter().collect();
            return Ok(Outcome::Skipped(format!("water_class {water_class} is not in the raster's classes {domain:?}")));
        };

        let mut mask = self.toolkit.reclassify(&raster, water_class)
            .context("[stage::polygonize] Reclassify failed")?;
        if config.majority_filter {
            mask = self.toolkit.majority_filter(&mask)
                .context("[stage::polygonize] Majority filter failed")?;
        }
        if config.fill_holes {
            mask = self.toolkit.fill_holes(&mask, config.connectivity)
                .context("[stage::polygonize] Hole filling failed")?;
        }
        debug!(raster = %name, cells = mask.count(), "water mask");

        let polygons = self.toolkit.polygonize(&mask, config.connectivity)
            .context("[stage::polygonize] Raster to polygon conversion failed")?;
        let traced = polygons.len();
        let mut polygons = self.toolkit.simplify(polygons, config.tolerance)
            .context("[stage::polygonize] Simplification failed")?;
        if let Some(shoreline) = shoreline {
            polygons = self.toolkit.clip(polygons, shoreline)
                .context("[stage::polygonize] Clipping failed")?;
        }
        let lakes = filter_by_area(
            polygons.into_iter().map(|poly| LakePolygon::new(poly, name)).collect(),
            config.min_area,
        );
        debug!(raster = %name, traced, kept = lakes.len(), "polygons");

        if lakes.is_empty() {
            return Ok(Outcome::Skipped("no lake polygons remain".to_string()));
        }
        match config.format {
            OutputFormat::Shapefile => io::shp::write_lakes(out_path, &lakes)?,
            OutputFormat::GeoJson => io::geojson::write_lakes(out_path, &lakes)?,
        }
        Ok(Outcome::Written(lakes.len()))
    }
}

/// `value` as a class index, if the raster contains it.
fn in_domain(raster: &ClassRaster, value: i64) -> Option<u8> {
    let class = u8::try_from(value).ok()?;
    value_domain(raster).contains(&class).then_some(class)
}
