//! Region labelling and boundary tracing for boolean rasters.
//!
//! A raster is addressed by `(col, row)` with `row` growing downwards.  Cell
//! `(c, r)` covers the unit square whose corners are `(c, r)` and
//! `(c + 1, r + 1)` in *pixel space*; all polygons produced by this crate use
//! those pixel-space corner coordinates.  Mapping to a coordinate reference
//! system (and fixing ring orientation afterwards) is the caller's job.
//!
//! # Connectivity
//!
//! [`Connectivity::Four`] joins cells sharing an edge only; two cells touching
//! at a corner belong to different regions.  [`Connectivity::Eight`] also
//! joins corner neighbours, so a region may consist of lobes that touch only
//! at a vertex; those are traced as separate polygons.

pub mod label;
pub mod trace;

pub use label::{label_regions, Labels};
pub use trace::trace_regions;

/// Neighbourhood rule used to decide whether two set cells are connected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(rename_all = "lowercase"))]
pub enum Connectivity {
    /// Edge neighbours only (N, E, S, W).
    #[default]
    Four,
    /// Edge and corner neighbours.
    Eight,
}

impl Connectivity {
    /// Neighbour offsets `(dx, dy)` for this rule.
    pub fn offsets(self) -> &'static [(isize, isize)] {
        const FOUR: [(isize, isize); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
        const EIGHT: [(isize, isize); 8] = [
            (1, 0), (1, 1), (0, 1), (-1, 1),
            (-1, 0), (-1, -1), (0, -1), (1, -1),
        ];
        match self {
            Connectivity::Four => &FOUR,
            Connectivity::Eight => &EIGHT,
        }
    }

    /// The complementary rule, i.e. the one background cells must use so
    /// that foreground and background regions never cross each other.
    pub fn complement(self) -> Self {
        match self {
            Connectivity::Four => Connectivity::Eight,
            Connectivity::Eight => Connectivity::Four,
        }
    }
}
