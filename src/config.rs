//! Stage configuration. Built once (by the CLI or a caller), validated up
//! front, then passed to the stage; nothing is read from the environment.

use std::path::{Path, PathBuf};

use rastertrace::Connectivity;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::manifest::{default_manifest_path, ManifestMode};
use crate::naming::NamingScheme;
use crate::raster::{ClusterParams, ResampleMethod, CLASS_NODATA};

/// Parameters of the classifier stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// Raster container holding the source GeoTIFFs.
    pub input: PathBuf,
    /// Raster container receiving the classified rasters.
    pub output: PathBuf,
    pub manifest: PathBuf,
    /// Target cell size in map units.
    pub cell_size: f64,
    pub cluster: ClusterParams,
    pub resampling: ResampleMethod,
    /// Regular expression matched against source raster names.
    pub pattern: Option<String>,
    pub depth: usize,
    pub naming: NamingScheme,
    pub manifest_mode: ManifestMode,
    pub skip_existing: bool,
}

impl ClassifyConfig {
    /// Defaults for everything but the containers and the cell size; the
    /// manifest lands in the output container.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, cell_size: f64) -> Self {
        let output = output.into();
        Self {
            input: input.into(),
            manifest: default_manifest_path(&output),
            output,
            cell_size,
            cluster: ClusterParams::default(),
            resampling: ResampleMethod::default(),
            pattern: None,
            depth: 1,
            naming: NamingScheme::default(),
            manifest_mode: ManifestMode::default(),
            skip_existing: false,
        }
    }

    /// The compiled name filter, if any.
    pub fn pattern(&self) -> Result<Option<Regex>, Error> {
        self.pattern.as_deref()
            .map(|p| Regex::new(p).map_err(|e| Error::config("pattern", e.to_string())))
            .transpose()
    }

    /// Range and path checks; the first offending parameter is reported.
    pub fn validate(&self) -> Result<(), Error> {
        check_existing_dir("input", &self.input)?;
        check_output_dir("output", &self.output)?;
        if self.manifest.is_dir() {
            return Err(Error::config("manifest", format!("{} is a directory", self.manifest.display())));
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(Error::config("cell_size", format!("must be a positive number, got {}", self.cell_size)));
        }
        let max_classes = CLASS_NODATA as usize - 1;
        if !(2..=max_classes).contains(&self.cluster.num_classes) {
            return Err(Error::config(
                "classes",
                format!("must be between 2 and {max_classes}, got {}", self.cluster.num_classes),
            ));
        }
        if self.cluster.min_class_size == 0 {
            return Err(Error::config("min_class_size", "must be at least 1"));
        }
        if self.cluster.sample_interval == 0 {
            return Err(Error::config("sample_interval", "must be at least 1"));
        }
        if self.cluster.max_iterations == 0 {
            return Err(Error::config("max_iterations", "must be at least 1"));
        }
        if self.depth == 0 {
            return Err(Error::config("depth", "must be at least 1"));
        }
        self.pattern()?;
        Ok(())
    }
}

/// Feature class encoding written by the polygonizer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Shapefile,
    GeoJson,
}

impl OutputFormat {
    #[inline]
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Shapefile => "shp",
            OutputFormat::GeoJson => "geojson",
        }
    }
}

/// Parameters of the polygonizer stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolygonizeConfig {
    pub manifest: PathBuf,
    /// Raster container holding the classified rasters named in the manifest.
    pub rasters: PathBuf,
    /// Container receiving the lake feature classes.
    pub output: PathBuf,
    /// Optional clip boundary (Shapefile or GeoJSON).
    pub shoreline: Option<PathBuf>,
    /// Simplification tolerance in map units; 0 disables simplification.
    pub tolerance: f64,
    /// Polygons must be strictly larger than this (map units squared).
    pub min_area: f64,
    pub connectivity: Connectivity,
    pub majority_filter: bool,
    pub fill_holes: bool,
    pub format: OutputFormat,
    pub skip_existing: bool,
}

impl PolygonizeConfig {
    /// Defaults for everything but the paths; classified rasters are looked up
    /// next to the manifest.
    pub fn new(manifest: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let manifest = manifest.into();
        let rasters = match manifest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            manifest,
            rasters,
            output: output.into(),
            shoreline: None,
            tolerance: 0.0,
            min_area: 0.0,
            connectivity: Connectivity::default(),
            majority_filter: false,
            fill_holes: false,
            format: OutputFormat::default(),
            skip_existing: false,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !self.manifest.is_file() {
            return Err(Error::config("manifest", format!("{} is not a readable file", self.manifest.display())));
        }
        check_existing_dir("rasters", &self.rasters)?;
        check_output_dir("output", &self.output)?;
        if let Some(shoreline) = &self.shoreline {
            if !shoreline.is_file() {
                return Err(Error::config("shoreline", format!("{} does not exist", shoreline.display())));
            }
            let ext = shoreline.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
            if !matches!(ext.as_deref(), Some("shp" | "geojson" | "json")) {
                return Err(Error::config("shoreline", "expected a .shp or .geojson file"));
            }
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(Error::config("tolerance", format!("must be a non-negative number, got {}", self.tolerance)));
        }
        if !(self.min_area.is_finite() && self.min_area >= 0.0) {
            return Err(Error::config("min_area", format!("must be a non-negative number, got {}", self.min_area)));
        }
        Ok(())
    }
}

fn check_existing_dir(parameter: &'static str, path: &Path) -> Result<(), Error> {
    if !path.is_dir() {
        return Err(Error::config(parameter, format!("{} is not a directory", path.display())));
    }
    Ok(())
}

/// The output container may be missing (it is created) but must not be a file.
fn check_output_dir(parameter: &'static str, path: &Path) -> Result<(), Error> {
    if path.exists() && !path.is_dir() {
        return Err(Error::config(parameter, format!("{} exists and is not a directory", path.display())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parameter(err: Error) -> &'static str {
        match err {
            Error::Config { parameter, .. } => parameter,
            other => panic!("expected a configuration error, got {other}"),
        }
    }

    #[test]
    fn classify_defaults_validate() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClassifyConfig::new(dir.path(), dir.path().join("out"), 5.0);
        assert_eq!(config.manifest, dir.path().join("out/classified_rasters.csv"));
        config.validate().unwrap();
    }

    #[test]
    fn classify_names_the_offending_parameter() {
        let dir = tempfile::tempdir().unwrap();
        let base = ClassifyConfig::new(dir.path(), dir.path().join("out"), 5.0);

        let mut config = base.clone();
        config.cell_size = 0.0;
        assert_eq!(parameter(config.validate().unwrap_err()), "cell_size");

        let mut config = base.clone();
        config.cluster.num_classes = 255;
        assert_eq!(parameter(config.validate().unwrap_err()), "classes");

        let mut config = base.clone();
        config.pattern = Some("(".into());
        assert_eq!(parameter(config.validate().unwrap_err()), "pattern");

        let mut config = base;
        config.input = dir.path().join("missing");
        assert_eq!(parameter(config.validate().unwrap_err()), "input");
    }

    #[test]
    fn polygonize_checks_paths_and_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("classified_rasters.csv");
        std::fs::write(&manifest, "classified_raster,water_class\n").unwrap();

        let config = PolygonizeConfig::new(&manifest, dir.path().join("lakes"));
        assert_eq!(config.rasters, dir.path());
        config.validate().unwrap();

        let mut bad = config.clone();
        bad.tolerance = -1.0;
        assert_eq!(parameter(bad.validate().unwrap_err()), "tolerance");

        let mut bad = config.clone();
        bad.shoreline = Some(dir.path().join("coast.shp"));
        assert_eq!(parameter(bad.validate().unwrap_err()), "shoreline");

        let mut bad = config;
        bad.manifest = dir.path().join("absent.csv");
        assert_eq!(parameter(bad.validate().unwrap_err()), "manifest");
    }
}
