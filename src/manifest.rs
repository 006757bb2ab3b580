//! The classification manifest: the CSV a human edits between the stages.
//!
//! One row per classified raster, `classified_raster,water_class`. The
//! classifier writes rows with an empty `water_class`; the operator fills in
//! the cluster index that shows water; the polygonizer only processes rows
//! whose label is a class present in the raster.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use polars::{frame::DataFrame, prelude::NamedFrom, series::Series};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ManifestError;
use crate::io::csv::{read_string_csv, write_csv};

pub const RASTER_COLUMN: &str = "classified_raster";
pub const WATER_COLUMN: &str = "water_class";

/// What the classifier does with a manifest left by an earlier run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestMode {
    /// Keep existing rows and labels; add rows for newly classified rasters.
    #[default]
    Append,
    /// Start from an empty manifest.
    Overwrite,
}

/// Parsed `water_class` of a row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Label {
    Missing,
    Invalid(String),
    Class(i64),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestRow {
    pub classified_raster: String,
    /// Raw operator text, `None` when the field is empty.
    pub water_class: Option<String>,
}

impl ManifestRow {
    /// A fresh row awaiting a label.
    pub fn unlabelled(classified_raster: impl Into<String>) -> Self {
        Self { classified_raster: classified_raster.into(), water_class: None }
    }

    pub fn label(&self) -> Label {
        match self.water_class.as_deref().map(str::trim) {
            None | Some("") => Label::Missing,
            Some(text) => match text.parse::<i64>() {
                Ok(v) => Label::Class(v),
                Err(_) => Label::Invalid(text.to_string()),
            },
        }
    }
}

/// Ordered manifest rows, unique by `classified_raster`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    rows: Vec<ManifestRow>,
}

impl Manifest {
    #[inline] pub fn new() -> Self { Self::default() }
    #[inline] pub fn len(&self) -> usize { self.rows.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }
    #[inline] pub fn rows(&self) -> &[ManifestRow] { &self.rows }

    pub fn get(&self, classified_raster: &str) -> Option<&ManifestRow> {
        self.rows.iter().find(|row| row.classified_raster == classified_raster)
    }

    #[inline]
    pub fn contains(&self, classified_raster: &str) -> bool {
        self.get(classified_raster).is_some()
    }

    /// Insert `row` unless a row for the same raster exists. Returns the
    /// existing row when one was kept instead.
    pub fn upsert(&mut self, row: ManifestRow) -> Option<&ManifestRow> {
        match self.rows.iter().position(|r| r.classified_raster == row.classified_raster) {
            Some(idx) => Some(&self.rows[idx]),
            None => {
                self.rows.push(row);
                None
            }
        }
    }

    /// Read and validate a manifest file.
    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        if let Err(source) = std::fs::metadata(path) {
            return Err(ManifestError::Open { path: path.to_path_buf(), source });
        }
        let df = read_string_csv(path)
            .map_err(|e| ManifestError::Format { path: path.to_path_buf(), message: format!("{e:#}") })?;
        Self::from_frame(&df, path)
    }

    /// Load `path` for the classifier according to `mode`; a missing file is an
    /// empty manifest.
    pub fn load_for_update(path: &Path, mode: ManifestMode) -> Result<Self, ManifestError> {
        match mode {
            ManifestMode::Overwrite => Ok(Self::new()),
            ManifestMode::Append if path.exists() => Self::read(path),
            ManifestMode::Append => Ok(Self::new()),
        }
    }

    fn from_frame(df: &DataFrame, path: &Path) -> Result<Self, ManifestError> {
        let format_err = |e: polars::error::PolarsError| ManifestError::Format {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        for column in [RASTER_COLUMN, WATER_COLUMN] {
            if !names.iter().any(|n| n == column) {
                return Err(ManifestError::MissingColumn { path: path.to_path_buf(), column });
            }
        }
        let extra: Vec<&str> = names.iter()
            .map(String::as_str)
            .filter(|n| *n != RASTER_COLUMN && *n != WATER_COLUMN)
            .collect();
        if !extra.is_empty() {
            warn!(manifest = %path.display(), columns = ?extra, "ignoring extra manifest columns");
        }

        let rasters = df.column(RASTER_COLUMN).map_err(format_err)?.str().map_err(format_err)?;
        let labels = df.column(WATER_COLUMN).map_err(format_err)?.str().map_err(format_err)?;

        let mut seen = HashSet::new();
        let mut rows = Vec::with_capacity(df.height());
        for (idx, (raster, label)) in rasters.into_iter().zip(labels.into_iter()).enumerate() {
            let name = raster.map(str::trim).unwrap_or_default();
            if name.is_empty() {
                return Err(ManifestError::Format {
                    path: path.to_path_buf(),
                    message: format!("row {} has an empty `{RASTER_COLUMN}`", idx + 1),
                });
            }
            if !seen.insert(name.to_string()) {
                return Err(ManifestError::DuplicateRaster { path: path.to_path_buf(), name: name.to_string() });
            }
            rows.push(ManifestRow {
                classified_raster: name.to_string(),
                water_class: label.map(str::to_string).filter(|s| !s.trim().is_empty()),
            });
        }
        Ok(Self { rows })
    }

    /// Write the manifest to `path` atomically with the exact two-column header.
    pub fn write(&self, path: &Path) -> Result<(), ManifestError> {
        let write_err = |source: anyhow::Error| ManifestError::Write { path: path.to_path_buf(), source };
        let (rasters, labels): (Vec<&str>, Vec<Option<&str>>) = self.rows.iter()
            .map(|row| (row.classified_raster.as_str(), row.water_class.as_deref()))
            .unzip();
        let mut df = DataFrame::new(vec![
            Series::new(RASTER_COLUMN.into(), rasters).into(),
            Series::new(WATER_COLUMN.into(), labels).into(),
        ])
        .map_err(|e| write_err(e.into()))?;
        write_csv(&mut df, path).map_err(write_err)
    }
}

/// Default manifest location inside an output container.
pub fn default_manifest_path(output: &Path) -> PathBuf {
    output.join("classified_rasters.csv")
}
