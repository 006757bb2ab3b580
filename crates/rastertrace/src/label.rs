//! Connected-component labelling.

use std::collections::VecDeque;

use crate::Connectivity;

/// Region labels for every cell of a `width x height` raster.
///
/// Label `0` marks unset cells; regions are numbered `1..=count` in the order
/// their first cell appears in a row-major scan.
#[derive(Clone, Debug)]
pub struct Labels {
    width: usize,
    height: usize,
    labels: Vec<u32>,
    count: u32,
}

impl Labels {
    #[inline] pub fn width(&self) -> usize { self.width }
    #[inline] pub fn height(&self) -> usize { self.height }

    /// Number of labelled regions.
    #[inline] pub fn count(&self) -> u32 { self.count }

    /// Label of cell `(col, row)`; `0` for unset cells.
    #[inline]
    pub fn get(&self, col: usize, row: usize) -> u32 {
        self.labels[row * self.width + col]
    }

    /// Row-major label buffer.
    #[inline] pub fn as_slice(&self) -> &[u32] { &self.labels }

    /// Number of cells carrying each label, indexed by label (`[0]` counts unset cells).
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.count as usize + 1];
        for &label in &self.labels {
            sizes[label as usize] += 1;
        }
        sizes
    }

    /// Labels of the regions that touch the raster border.
    pub fn border_labels(&self) -> Vec<bool> {
        let mut touches = vec![false; self.count as usize + 1];
        if self.width == 0 || self.height == 0 {
            return touches;
        }
        for col in 0..self.width {
            touches[self.get(col, 0) as usize] = true;
            touches[self.get(col, self.height - 1) as usize] = true;
        }
        for row in 0..self.height {
            touches[self.get(0, row) as usize] = true;
            touches[self.get(self.width - 1, row) as usize] = true;
        }
        touches[0] = false;
        touches
    }
}

/// Label the connected regions of the cells for which `is_set(col, row)` holds.
pub fn label_regions<F>(width: usize, height: usize, connectivity: Connectivity, is_set: F) -> Labels
where
    F: Fn(usize, usize) -> bool,
{
    let mut labels = vec![0u32; width * height];
    let mut count = 0u32;
    let mut queue = VecDeque::new();

    for row in 0..height {
        for col in 0..width {
            if labels[row * width + col] != 0 || !is_set(col, row) {
                continue;
            }
            count += 1;
            labels[row * width + col] = count;
            queue.push_back((col, row));

            while let Some((c, r)) = queue.pop_front() {
                for &(dx, dy) in connectivity.offsets() {
                    let (Some(nc), Some(nr)) = (c.checked_add_signed(dx), r.checked_add_signed(dy)) else {
                        continue;
                    };
                    if nc >= width || nr >= height {
                        continue;
                    }
                    let idx = nr * width + nc;
                    if labels[idx] == 0 && is_set(nc, nr) {
                        labels[idx] = count;
                        queue.push_back((nc, nr));
                    }
                }
            }
        }
    }

    Labels { width, height, labels, count }
}
