use std::collections::BTreeSet;

use ndarray::Array2;
use rastertrace::{label_regions, Connectivity};

use crate::raster::{ClassRaster, Mask, CLASS_NODATA};

/// Distinct class indices present in `raster`, NoData excluded.
pub fn value_domain(raster: &ClassRaster) -> BTreeSet<u8> {
    let mut seen = [false; 256];
    for &v in raster.classes.iter() {
        seen[v as usize] = true;
    }
    (0..CLASS_NODATA).filter(|&v| seen[v as usize]).collect()
}

/// Collapse `raster` to a water mask: cells equal to `water_class` become 1,
/// everything else (NoData included) becomes 0.
pub fn reclassify_binary(raster: &ClassRaster, water_class: u8) -> Mask {
    Mask {
        cells: raster.classes.mapv(|v| u8::from(v == water_class && v != CLASS_NODATA)),
        transform: raster.transform,
    }
}

/// 8-neighbour majority filter.
///
/// A cell takes the other value when strictly more than half of its in-bounds
/// neighbours hold that value; ties and minorities leave it unchanged.
pub fn majority_filter(mask: &Mask) -> Mask {
    let (rows, cols) = mask.shape();
    let src = &mask.cells;
    let cells = Array2::from_shape_fn((rows, cols), |(r, c)| {
        let current = src[[r, c]];
        let (mut same, mut other) = (0usize, 0usize);
        for &(dx, dy) in Connectivity::Eight.offsets() {
            let (Some(nc), Some(nr)) = (c.checked_add_signed(dx), r.checked_add_signed(dy)) else {
                continue;
            };
            if nr >= rows || nc >= cols {
                continue;
            }
            if src[[nr, nc]] == current { same += 1 } else { other += 1 }
        }
        if other > same { 1 - current } else { current }
    });
    Mask { cells, transform: mask.transform }
}

/// Set every 0-region that cannot reach the raster border.
///
/// `connectivity` is the rule the mask's regions are traced with; the
/// background is flooded with the complementary rule so that a gap which
/// separates two traced regions also lets the background through.
pub fn fill_enclosed(mask: &Mask, connectivity: Connectivity) -> Mask {
    let (rows, cols) = mask.shape();
    let background = label_regions(cols, rows, connectivity.complement(), |c, r| !mask.is_set(c, r));
    let open = background.border_labels();
    let cells = Array2::from_shape_fn((rows, cols), |(r, c)| {
        let label = background.get(c, r);
        if label == 0 || !open[label as usize] { 1 } else { 0 }
    });
    Mask { cells, transform: mask.transform }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{GeoTransform, SpatialRef};

    fn transform() -> GeoTransform {
        GeoTransform { origin_x: 0.0, origin_y: 0.0, cell_width: 1.0, cell_height: 1.0 }
    }

    fn classes(rows: &[&[u8]]) -> ClassRaster {
        let (h, w) = (rows.len(), rows[0].len());
        ClassRaster {
            classes: Array2::from_shape_fn((h, w), |(r, c)| rows[r][c]),
            transform: transform(),
            spatial_ref: SpatialRef::default(),
            info: None,
        }
    }

    fn mask(rows: &[&str]) -> Mask {
        let (h, w) = (rows.len(), rows[0].len());
        Mask {
            cells: Array2::from_shape_fn((h, w), |(r, c)| u8::from(rows[r].as_bytes()[c] == b'#')),
            transform: transform(),
        }
    }

    #[test]
    fn binary_mask_marks_exactly_the_water_cells() {
        let raster = classes(&[&[0, 1, 2], &[1, 1, 0], &[2, 2, 1]]);
        let out = reclassify_binary(&raster, 1);
        assert!(out.cells.iter().all(|&v| v == 0 || v == 1));
        for (&src, &dst) in raster.classes.iter().zip(out.cells.iter()) {
            assert_eq!(dst == 1, src == 1);
        }
        assert_eq!(out.count(), 4);
    }

    #[test]
    fn nodata_never_becomes_water() {
        let raster = classes(&[&[CLASS_NODATA, 3]]);
        assert_eq!(reclassify_binary(&raster, CLASS_NODATA).count(), 0);
    }

    #[test]
    fn domain_excludes_nodata() {
        let raster = classes(&[&[4, 0, CLASS_NODATA], &[4, 2, 0]]);
        assert_eq!(value_domain(&raster).into_iter().collect::<Vec<_>>(), vec![0, 2, 4]);
    }

    #[test]
    fn majority_removes_speckle_and_fills_pinholes() {
        let out = majority_filter(&mask(&[
            ".....",
            ".#...",
            ".....",
            "###..",
            "#.#..",
            "###..",
        ]));
        assert_eq!(out.cells[[1, 1]], 0);
        assert_eq!(out.cells[[4, 1]], 1);
    }

    #[test]
    fn fill_closes_enclosed_holes_only() {
        let out = fill_enclosed(&mask(&[
            "#####.",
            "#..#..",
            "#####.",
        ]), Connectivity::Four);
        assert_eq!(out.cells[[1, 1]], 1);
        assert_eq!(out.cells[[1, 2]], 1);
        assert_eq!(out.cells[[1, 4]], 0);
        assert_eq!(out.cells[[0, 5]], 0);
    }

    #[test]
    fn fill_lets_background_through_diagonal_gaps() {
        // Under 4-connectivity the two arms do not touch, so the hole leaks.
        let m = mask(&[
            ".#.",
            "#.#",
            ".#.",
        ]);
        assert_eq!(fill_enclosed(&m, Connectivity::Four).cells[[1, 1]], 0);
        assert_eq!(fill_enclosed(&m, Connectivity::Eight).cells[[1, 1]], 1);
    }
}
