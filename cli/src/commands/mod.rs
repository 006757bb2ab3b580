pub mod classify;
pub mod polygonize;
