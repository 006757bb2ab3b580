//! The two batch stages.

pub mod classify;
pub mod polygonize;

pub use classify::Classifier;
pub use polygonize::Polygonizer;
