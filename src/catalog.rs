//! Enumeration of the raster datasets in a raster container.

use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use walkdir::WalkDir;

/// Extensions recognised as raster datasets (compared case-insensitively).
const RASTER_EXTENSIONS: [&str; 2] = ["tif", "tiff"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no raster datasets found in {}", root.display())]
    NotFound { root: PathBuf },
}

/// One raster dataset: its name (file stem) and location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Scanner over a directory of GeoTIFFs.
#[derive(Clone, Debug)]
pub struct RasterCatalog {
    root: PathBuf,
    pattern: Option<Regex>,
    max_depth: usize,
}

impl RasterCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), pattern: None, max_depth: 1 }
    }

    /// Only list datasets whose name matches `pattern`.
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Directory levels to descend; 1 lists only direct children.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    #[inline] pub fn root(&self) -> &Path { &self.root }

    /// List matching datasets sorted by name.
    pub fn scan(&self) -> Result<Vec<RasterEntry>, CatalogError> {
        if !self.root.is_dir() {
            return Err(CatalogError::NotFound { root: self.root.clone() });
        }

        let mut entries: Vec<RasterEntry> = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(self.max_depth)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let path = entry.into_path();
                let ext = path.extension()
                    .and_then(|s| s.to_str())
                    .map(|s| s.to_ascii_lowercase())
                    .unwrap_or_default();
                if !RASTER_EXTENSIONS.contains(&ext.as_str()) {
                    return None;
                }
                let name = path.file_stem()?.to_str()?.to_string();
                Some(RasterEntry { name, path })
            })
            .filter(|entry| self.pattern.as_ref().is_none_or(|re| re.is_match(&entry.name)))
            .collect();

        if entries.is_empty() {
            return Err(CatalogError::NotFound { root: self.root.clone() });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
        Ok(entries)
    }
}
