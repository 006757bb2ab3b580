use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogError, RasterCatalog, RasterEntry};
use crate::common::ensure_dir_exists;
use crate::config::ClassifyConfig;
use crate::error::Error;
use crate::io;
use crate::manifest::{Manifest, ManifestMode, ManifestRow};
use crate::naming::CLASSIFIED_SUFFIX;
use crate::raster::ClassInfo;
use crate::summary::RunSummary;
use crate::toolkit::{NativeToolkit, Toolkit};

pub const STAGE: &str = "classify";

/// Resamples and clusters every raster of the input container, recording
/// each classified raster in the manifest as soon as it is written.
#[derive(Debug, Clone)]
pub struct Classifier<T: Toolkit = NativeToolkit> {
    config: ClassifyConfig,
    toolkit: T,
}

impl Classifier<NativeToolkit> {
    pub fn new(config: ClassifyConfig) -> Self {
        Self { config, toolkit: NativeToolkit }
    }
}

impl<T: Toolkit> Classifier<T> {
    pub fn with_toolkit(config: ClassifyConfig, toolkit: T) -> Self {
        Self { config, toolkit }
    }

    #[inline] pub fn config(&self) -> &ClassifyConfig { &self.config }

    /// Run the stage. Only configuration, manifest and output-container
    /// problems are returned as errors; per-raster failures end up in the
    /// summary.
    pub fn run(&self) -> Result<RunSummary, Error> {
        let config = &self.config;
        config.validate()?;
        ensure_dir_exists(&config.output).map_err(Error::Io)?;

        let mut manifest = Manifest::load_for_update(&config.manifest, config.manifest_mode)?;
        if config.manifest_mode == ManifestMode::Overwrite || !config.manifest.exists() {
            manifest.write(&config.manifest)?;
        }

        let mut catalog = RasterCatalog::new(&config.input).with_max_depth(config.depth);
        if let Some(pattern) = config.pattern()? {
            catalog = catalog.with_pattern(pattern);
        }
        let mut entries = match catalog.scan() {
            Ok(entries) => entries,
            Err(err @ CatalogError::NotFound { .. }) => {
                warn!("{err}");
                Vec::new()
            }
        };
        // The input and output containers may be the same directory.
        let output_dir = config.output.canonicalize().ok();
        let scanned = entries.len();
        entries.retain(|entry| !is_product(entry, output_dir.as_deref()));
        if entries.len() < scanned {
            info!("ignoring {} classified rasters in the output container", scanned - entries.len());
        }

        let mut summary = RunSummary::new(STAGE, config).map_err(Error::Io)?;
        let mut claimed = HashSet::new();
        let total = entries.len();

        for (i, entry) in entries.iter().enumerate() {
            info!("Processing {} of {}: {}", i + 1, total, entry.name);
            let name = config.naming.classified_name(&entry.name);

            if !claimed.insert(name.clone()) {
                let reason = format!("output name `{name}` is already produced by another raster");
                error!(raster = %entry.name, "{reason}");
                summary.fail(&entry.name, reason);
                continue;
            }

            let out_path = config.output.join(format!("{name}.tif"));
            if config.skip_existing && out_path.exists() && manifest.contains(&name) {
                info!(raster = %entry.name, output = %name, "skipping, already classified");
                summary.skip(&entry.name, format!("`{name}` already classified"));
                continue;
            }

            if let Err(err) = self.classify_one(entry, &name, &out_path) {
                error!(raster = %entry.name, "classification failed: {err:#}");
                summary.fail(&entry.name, format!("{err:#}"));
                continue;
            }

            if let Some(existing) = manifest.upsert(ManifestRow::unlabelled(&name)) {
                if let Some(label) = &existing.water_class {
                    warn!(
                        output = %name,
                        "manifest keeps water_class `{label}` from an earlier run; cluster indices may have changed"
                    );
                }
            }
            manifest.write(&config.manifest)?;
            summary.succeed(&entry.name);
        }

        summary.write(&config.output).map_err(Error::Io)?;
        Ok(summary)
    }

    fn classify_one(&self, entry: &RasterEntry, name: &str, out_path: &Path) -> anyhow::Result<()> {
        let config = &self.config;
        let source = io::tiff::read_raster(&entry.path)
            .with_context(|| format!("[stage::classify] Failed to read {}", entry.path.display()))?;
        let (rows, cols) = source.shape();
        debug!(raster = %entry.name, rows, cols, bands = source.band_count(), "read raster");

        let resampled = self.toolkit.resample(&source, config.cell_size, config.resampling)
            .context("[stage::classify] Resampling failed")?;
        let (rows, cols) = resampled.shape();
        debug!(raster = %entry.name, rows, cols, cell_size = config.cell_size, "resampled");

        let mut classified = self.toolkit.classify(&resampled, &config.cluster)
            .context("[stage::classify] Classification failed")?;
        classified.info = Some(ClassInfo {
            source: entry.name.clone(),
            classes_requested: config.cluster.num_classes,
            cell_size: config.cell_size,
        });

        io::tiff::write_class_raster(out_path, &classified)
            .with_context(|| format!("[stage::classify] Failed to write {name}"))?;
        Ok(())
    }
}

/// Whether `entry` is a classified raster sitting in the output container.
fn is_product(entry: &RasterEntry, output_dir: Option<&Path>) -> bool {
    let Some(output_dir) = output_dir else { return false };
    entry.name.ends_with(CLASSIFIED_SUFFIX)
        && entry.path.parent()
            .and_then(|dir| dir.canonicalize().ok())
            .is_some_and(|dir| dir == output_dir)
}
