#![doc = "Unsupervised classification of historical topographic maps and lake polygon extraction"]
mod common;
mod io;

pub mod catalog;
pub mod config;
pub mod error;
pub mod geom;
pub mod manifest;
pub mod naming;
pub mod raster;
pub mod stage;
pub mod summary;
pub mod toolkit;

#[doc(inline)]
pub use error::{Error, ManifestError, RasterError};

#[doc(inline)]
pub use config::{ClassifyConfig, OutputFormat, PolygonizeConfig};

#[doc(inline)]
pub use stage::{Classifier, Polygonizer};

#[doc(inline)]
pub use summary::RunSummary;

#[doc(inline)]
pub use toolkit::{NativeToolkit, Toolkit};

#[doc(inline)]
pub use io::tiff::{read_class_raster, read_raster, write_class_raster, write_raster};

pub use rastertrace::Connectivity;
