use std::path::PathBuf;

use thiserror::Error;

/// Stage-level errors. Any of these stops a batch before (or instead of)
/// processing further items; per-item failures never surface here.
#[derive(Debug, Error)]
pub enum Error {
    /// A parameter or path is invalid. Raised before any processing starts.
    #[error("invalid `{parameter}`: {message}")]
    Config { parameter: &'static str, message: String },

    /// The manifest CSV cannot be used.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A boundary layer cannot be read.
    #[error("failed to read layer {}: {source:#}", path.display())]
    Layer { path: PathBuf, source: anyhow::Error },

    /// Stage outputs (containers, summary) cannot be written.
    #[error("{0:#}")]
    Io(anyhow::Error),
}

impl Error {
    pub(crate) fn config(parameter: &'static str, message: impl Into<String>) -> Self {
        Error::Config { parameter, message: message.into() }
    }
}

/// Problems with the manifest CSV contract.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to open manifest {}: {source}", path.display())]
    Open { path: PathBuf, source: std::io::Error },

    #[error("malformed manifest {}: {message}", path.display())]
    Format { path: PathBuf, message: String },

    #[error("manifest {} is missing required column `{column}`", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("manifest {} lists `{name}` more than once", path.display())]
    DuplicateRaster { path: PathBuf, name: String },

    #[error("failed to write manifest {}: {source:#}", path.display())]
    Write { path: PathBuf, source: anyhow::Error },
}

/// Per-raster failures raised by the raster codecs and operators.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("failed to open raster: {0}")]
    Open(#[from] std::io::Error),

    #[error("failed to decode raster: {0}")]
    Decode(#[from] tiff::TiffError),

    #[error("unsupported raster layout: {0}")]
    Unsupported(String),

    #[error("raster has no usable georeferencing: {0}")]
    Georeference(String),

    #[error("only {samples} valid sample cells for {classes} classes; lower the sample interval")]
    InsufficientSamples { samples: usize, classes: usize },

    #[error("clustering failed: {0}")]
    Cluster(String),
}
