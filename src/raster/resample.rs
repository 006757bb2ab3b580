use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::RasterError;
use crate::raster::Raster;

/// Interpolation used when changing a raster's cell size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleMethod {
    /// Value of the source cell under the target cell centre. Safe for
    /// already-discretised map colours.
    #[default]
    Nearest,
    Bilinear,
    /// Catmull-Rom cubic convolution over a 4x4 neighbourhood.
    Cubic,
}

/// Resample `raster` to square cells of `cell_size` map units, keeping its extent.
pub fn resample(raster: &Raster, cell_size: f64, method: ResampleMethod) -> Result<Raster, RasterError> {
    if !(cell_size.is_finite() && cell_size > 0.0) {
        return Err(RasterError::Georeference(format!("invalid target cell size {cell_size}")));
    }
    let t = raster.transform;
    if !(t.cell_width > 0.0 && t.cell_height > 0.0) {
        return Err(RasterError::Georeference(format!(
            "non-positive source cell size {}x{}", t.cell_width, t.cell_height
        )));
    }
    let (rows, cols) = raster.shape();
    if rows == 0 || cols == 0 {
        return Err(RasterError::Unsupported("raster has no cells".into()));
    }
    if t.cell_width == cell_size && t.cell_height == cell_size {
        return Ok(raster.clone());
    }

    let out_cols = ((cols as f64 * t.cell_width) / cell_size).round().max(1.0) as usize;
    let out_rows = ((rows as f64 * t.cell_height) / cell_size).round().max(1.0) as usize;
    let target = t.with_cell_size(cell_size);

    let mut bands: Vec<Array2<f64>> = (0..raster.band_count())
        .map(|_| Array2::zeros((out_rows, out_cols)))
        .collect();

    for row in 0..out_rows {
        for col in 0..out_cols {
            let (x, y) = target.cell_center(col, row);
            let (px, py) = t.to_pixel_center(x, y);
            let (nr, nc) = nearest_cell(px, py, rows, cols);

            let interpolated = match method {
                ResampleMethod::Nearest => None,
                ResampleMethod::Bilinear => window_is_valid(raster, px, py, 0, 1)
                    .then(|| raster.bands.iter().map(|b| bilinear(b, px, py)).collect::<Vec<_>>()),
                ResampleMethod::Cubic => window_is_valid(raster, px, py, 1, 2)
                    .then(|| raster.bands.iter().map(|b| cubic(b, px, py)).collect::<Vec<_>>()),
            };

            match interpolated {
                Some(values) => {
                    for (band, value) in bands.iter_mut().zip(values) {
                        band[[row, col]] = value;
                    }
                }
                None => {
                    for (band, source) in bands.iter_mut().zip(&raster.bands) {
                        band[[row, col]] = source[[nr, nc]];
                    }
                }
            }
        }
    }

    Ok(Raster {
        bands,
        transform: target,
        spatial_ref: raster.spatial_ref.clone(),
        nodata: raster.nodata,
    })
}

#[inline]
fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

#[inline]
fn nearest_cell(px: f64, py: f64, rows: usize, cols: usize) -> (usize, usize) {
    (clamp_index(py.round() as isize, rows), clamp_index(px.round() as isize, cols))
}

/// True if no cell in the (clamped) window around `(px, py)` is NoData.
fn window_is_valid(raster: &Raster, px: f64, py: f64, before: isize, after: isize) -> bool {
    let (rows, cols) = raster.shape();
    let (x0, y0) = (px.floor() as isize, py.floor() as isize);
    for dy in -before..=after {
        for dx in -before..=after {
            let (r, c) = (clamp_index(y0 + dy, rows), clamp_index(x0 + dx, cols));
            if raster.is_nodata(r, c) {
                return false;
            }
        }
    }
    true
}

fn bilinear(band: &Array2<f64>, px: f64, py: f64) -> f64 {
    let (rows, cols) = band.dim();
    let (x0, y0) = (px.floor(), py.floor());
    let (fx, fy) = (px - x0, py - y0);
    let at = |dx: isize, dy: isize| {
        band[[clamp_index(y0 as isize + dy, rows), clamp_index(x0 as isize + dx, cols)]]
    };
    let top = at(0, 0) * (1.0 - fx) + at(1, 0) * fx;
    let bottom = at(0, 1) * (1.0 - fx) + at(1, 1) * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Catmull-Rom weights (a = -0.5) for the four taps around `t` in [0, 1).
fn cubic_weights(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        -0.5 * t3 + t2 - 0.5 * t,
        1.5 * t3 - 2.5 * t2 + 1.0,
        -1.5 * t3 + 2.0 * t2 + 0.5 * t,
        0.5 * t3 - 0.5 * t2,
    ]
}

fn cubic(band: &Array2<f64>, px: f64, py: f64) -> f64 {
    let (rows, cols) = band.dim();
    let (x0, y0) = (px.floor(), py.floor());
    let wx = cubic_weights(px - x0);
    let wy = cubic_weights(py - y0);
    let mut sum = 0.0;
    for (j, wyj) in wy.iter().enumerate() {
        let r = clamp_index(y0 as isize + j as isize - 1, rows);
        for (i, wxi) in wx.iter().enumerate() {
            let c = clamp_index(x0 as isize + i as isize - 1, cols);
            sum += wyj * wxi * band[[r, c]];
        }
    }
    sum
}
