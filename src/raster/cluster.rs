use linfa::prelude::*;
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RasterError;
use crate::raster::{ClassRaster, Raster, CLASS_NODATA};

/// Rows assigned per prediction batch.
const PREDICT_ROWS: usize = 256;

/// Parameters of the unsupervised (ISO-cluster style) classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterParams {
    /// Number of classes requested; the result may hold fewer.
    pub num_classes: usize,
    /// Clusters with fewer assigned cells are dissolved into their nearest neighbour.
    pub min_class_size: usize,
    /// Every `sample_interval`-th row and column is used to fit the clusters.
    pub sample_interval: usize,
    pub max_iterations: u64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self { num_classes: 6, min_class_size: 20, sample_interval: 10, max_iterations: 100 }
    }
}

/// Cluster the cells of `raster` by their band values.
///
/// Cluster indices are ordered by centroid brightness (sum over bands), so the
/// darkest class is always `0`. NoData cells become [`CLASS_NODATA`].
pub fn iso_cluster(raster: &Raster, params: &ClusterParams) -> Result<ClassRaster, RasterError> {
    let (rows, cols) = raster.shape();
    let bands = raster.band_count();
    if bands == 0 || rows == 0 || cols == 0 {
        return Err(RasterError::Unsupported("raster has no cells".into()));
    }
    let k = params.num_classes;
    if k < 2 || k >= CLASS_NODATA as usize {
        return Err(RasterError::Cluster(format!("class count {k} outside 2..{}", CLASS_NODATA)));
    }

    let samples = training_samples(raster, params.sample_interval.max(1));
    let n_samples = samples.nrows();
    if n_samples < k {
        return Err(RasterError::InsufficientSamples { samples: n_samples, classes: k });
    }
    debug!(samples = n_samples, classes = k, "fitting k-means");

    let model = KMeans::params(k)
        .max_n_iterations(params.max_iterations.max(1))
        .tolerance(1e-4)
        .fit(&DatasetBase::from(samples))
        .map_err(|e| RasterError::Cluster(e.to_string()))?;
    let centroids = model.centroids().to_owned();

    // First pass: raw assignment of every valid cell.
    let mut labels = Array2::<u8>::from_elem((rows, cols), CLASS_NODATA);
    let mut sizes = vec![0usize; k];
    for start in (0..rows).step_by(PREDICT_ROWS) {
        let end = (start + PREDICT_ROWS).min(rows);
        let (cells, features) = cell_features(raster, start..end);
        if cells.is_empty() {
            continue;
        }
        let assigned: Array1<usize> = model.predict(&features);
        for (&(r, c), &cluster) in cells.iter().zip(assigned.iter()) {
            labels[[r, c]] = cluster as u8;
            sizes[cluster] += 1;
        }
    }

    let remap = dissolve_small_clusters(&centroids, &sizes, params.min_class_size);
    let class_count = remap.iter().map(|&c| c as usize + 1).max().unwrap_or(0);
    debug!(requested = k, produced = class_count, "clusters after size pruning");

    labels.mapv_inplace(|v| if v == CLASS_NODATA { v } else { remap[v as usize] });

    Ok(ClassRaster {
        classes: labels,
        transform: raster.transform,
        spatial_ref: raster.spatial_ref.clone(),
        info: None,
    })
}

/// Feature vectors of the valid cells on the sampling lattice.
fn training_samples(raster: &Raster, interval: usize) -> Array2<f64> {
    let (rows, cols) = raster.shape();
    let mut data = Vec::new();
    let mut n = 0;
    for r in (0..rows).step_by(interval) {
        for c in (0..cols).step_by(interval) {
            if raster.is_nodata(r, c) {
                continue;
            }
            data.extend(raster.bands.iter().map(|b| b[[r, c]]));
            n += 1;
        }
    }
    Array2::from_shape_vec((n, raster.band_count()), data)
        .unwrap_or_else(|_| Array2::zeros((0, raster.band_count())))
}

/// Positions and feature vectors of the valid cells in `rows`.
fn cell_features(raster: &Raster, rows: std::ops::Range<usize>) -> (Vec<(usize, usize)>, Array2<f64>) {
    let (_, cols) = raster.shape();
    let mut cells = Vec::new();
    let mut data = Vec::new();
    for r in rows {
        for c in 0..cols {
            if raster.is_nodata(r, c) {
                continue;
            }
            cells.push((r, c));
            data.extend(raster.bands.iter().map(|b| b[[r, c]]));
        }
    }
    let features = Array2::from_shape_vec((cells.len(), raster.band_count()), data)
        .unwrap_or_else(|_| Array2::zeros((0, raster.band_count())));
    (cells, features)
}

/// Map raw cluster ids to final class indices.
///
/// Clusters smaller than `min_size` are merged into the nearest surviving
/// centroid; survivors are renumbered by ascending brightness. The largest
/// cluster always survives.
fn dissolve_small_clusters(centroids: &Array2<f64>, sizes: &[usize], min_size: usize) -> Vec<u8> {
    let k = sizes.len();
    let largest = (0..k).max_by_key(|&i| sizes[i]).unwrap_or(0);
    let mut survivors: Vec<usize> = (0..k)
        .filter(|&i| sizes[i] > 0 && sizes[i] >= min_size)
        .collect();
    if survivors.is_empty() {
        survivors.push(largest);
    }

    let brightness = |i: usize| centroids.row(i).sum();
    survivors.sort_by(|&a, &b| brightness(a).total_cmp(&brightness(b)).then(a.cmp(&b)));

    let distance = |a: ArrayView1<f64>, b: ArrayView1<f64>| {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f64>()
    };

    (0..k)
        .map(|i| {
            if let Some(pos) = survivors.iter().position(|&s| s == i) {
                return pos as u8;
            }
            survivors.iter()
                .enumerate()
                .min_by(|&(_, &a), &(_, &b)| {
                    distance(centroids.row(i), centroids.row(a))
                        .total_cmp(&distance(centroids.row(i), centroids.row(b)))
                })
                .map(|(pos, _)| pos as u8)
                .unwrap_or(0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use crate::raster::{value_domain, GeoTransform, SpatialRef};

    /// Three flat gray levels in vertical stripes plus a tiny bright patch.
    fn striped(patch: bool) -> Raster {
        let band = Array2::from_shape_fn((30, 30), |(r, c)| {
            if patch && r < 2 && c < 2 {
                250.0
            } else {
                match c / 10 { 0 => 200.0, 1 => 20.0, _ => 110.0 }
            }
        });
        Raster {
            bands: vec![band],
            transform: GeoTransform { origin_x: 0.0, origin_y: 30.0, cell_width: 1.0, cell_height: 1.0 },
            spatial_ref: SpatialRef::default(),
            nodata: None,
        }
    }

    #[test]
    fn classes_are_ordered_by_brightness() {
        let params = ClusterParams { num_classes: 3, min_class_size: 1, sample_interval: 1, max_iterations: 100 };
        let out = iso_cluster(&striped(false), &params).unwrap();
        assert_eq!(out.classes[[5, 15]], 0);
        assert_eq!(out.classes[[5, 25]], 1);
        assert_eq!(out.classes[[5, 5]], 2);
        assert_eq!(value_domain(&out).into_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn small_clusters_are_dissolved() {
        let params = ClusterParams { num_classes: 4, min_class_size: 20, sample_interval: 1, max_iterations: 100 };
        let out = iso_cluster(&striped(true), &params).unwrap();
        // The 4-cell bright patch is merged into the nearest (brightest) stripe.
        assert_eq!(value_domain(&out).len(), 3);
        assert_eq!(out.classes[[0, 0]], out.classes[[5, 5]]);
    }

    #[test]
    fn too_few_samples_is_an_error() {
        let params = ClusterParams { num_classes: 6, min_class_size: 1, sample_interval: 15, max_iterations: 10 };
        let err = iso_cluster(&striped(false), &params).unwrap_err();
        assert!(matches!(err, RasterError::InsufficientSamples { samples: 4, classes: 6 }));
    }

    #[test]
    fn nodata_cells_stay_nodata() {
        let mut raster = striped(false);
        raster.nodata = Some(-1.0);
        raster.bands[0][[0, 0]] = -1.0;
        let params = ClusterParams { num_classes: 3, min_class_size: 1, sample_interval: 1, max_iterations: 100 };
        let out = iso_cluster(&raster, &params).unwrap();
        assert_eq!(out.classes[[0, 0]], CLASS_NODATA);
    }

    #[test]
    fn dissolve_keeps_largest_when_all_small() {
        let centroids = array![[0.0], [10.0], [5.0]];
        let remap = dissolve_small_clusters(&centroids, &[3, 5, 1], 100);
        assert_eq!(remap, vec![0, 0, 0]);
    }

    #[test]
    fn dissolve_renumbers_by_brightness() {
        let centroids = array![[50.0], [10.0], [40.0]];
        let remap = dissolve_small_clusters(&centroids, &[10, 10, 1], 5);
        // Survivors in brightness order: cluster 1 (10.0), cluster 0 (50.0).
        // Cluster 2 (40.0) joins its nearest survivor, cluster 0.
        assert_eq!(remap, vec![1, 0, 1]);
    }
}
