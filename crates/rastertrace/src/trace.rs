//! Boundary tracing of labelled regions into polygons.
//!
//! Every set cell contributes one directed *boundary edge* per side that faces
//! an unset cell (or the raster border).  Edges run clockwise around each cell
//! in pixel space, so the region always lies to the right of an edge.  Each
//! vertex has either one outgoing edge or, where two regions (or two parts of
//! one region) meet only at a corner, exactly two.  The successor of an edge
//! is therefore unique once the corner rule is fixed:
//!
//! * [`Connectivity::Four`] turns right at such a corner, keeping the two
//!   diagonal cells apart;
//! * [`Connectivity::Eight`] turns left, walking around both of them.
//!
//! The successor map is a permutation of the edges, so following it from any
//! unvisited edge yields a closed walk.  A walk that passes the same corner
//! twice is cut there into simple rings: clockwise rings are shells and
//! counter-clockwise rings are holes, so a pocket that reaches the outside
//! only through a corner becomes a hole touching its shell at one point.

use ahash::AHashMap;
use geo::{Contains, Coord, LineString, Point, Polygon};

use crate::label::{label_regions, Labels};
use crate::Connectivity;

const NONE: usize = usize::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dir { East, South, West, North }

impl Dir {
    #[inline]
    fn step(self, (x, y): (usize, usize)) -> (usize, usize) {
        match self {
            Dir::East => (x + 1, y),
            Dir::South => (x, y + 1),
            Dir::West => (x - 1, y),
            Dir::North => (x, y - 1),
        }
    }

    /// Clockwise turn in pixel space (rows grow downwards).
    #[inline]
    fn right(self) -> Self {
        match self {
            Dir::East => Dir::South,
            Dir::South => Dir::West,
            Dir::West => Dir::North,
            Dir::North => Dir::East,
        }
    }

    #[inline]
    fn left(self) -> Self {
        match self {
            Dir::East => Dir::North,
            Dir::North => Dir::West,
            Dir::West => Dir::South,
            Dir::South => Dir::East,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Edge {
    from: (usize, usize),
    dir: Dir,
    label: u32,
}

impl Edge {
    #[inline] fn to(&self) -> (usize, usize) { self.dir.step(self.from) }
}

/// Label the cells for which `is_set(col, row)` holds and trace one polygon
/// per region, in label order.
pub fn trace_regions<F>(width: usize, height: usize, connectivity: Connectivity, is_set: F) -> Vec<Polygon<f64>>
where
    F: Fn(usize, usize) -> bool,
{
    let labels = label_regions(width, height, connectivity, is_set);
    trace_labels(&labels, connectivity)
}

/// Trace the polygons of every region of an existing labelling.
///
/// `connectivity` must be the rule the labels were produced with.  Regions
/// come out in label order, normally as one polygon each; a region pinched at
/// a corner (only possible under [`Connectivity::Eight`]) yields one polygon
/// per lobe.  Every ring is simple and collinear vertices are never emitted.
pub fn trace_labels(labels: &Labels, connectivity: Connectivity) -> Vec<Polygon<f64>> {
    let edges = boundary_edges(labels);
    if edges.is_empty() {
        return Vec::new();
    }

    // At most two edges leave any vertex.
    let mut outgoing: AHashMap<(usize, usize), [usize; 2]> = AHashMap::with_capacity(edges.len());
    for (idx, edge) in edges.iter().enumerate() {
        let slots = outgoing.entry(edge.from).or_insert([NONE, NONE]);
        if slots[0] == NONE { slots[0] = idx } else { slots[1] = idx }
    }

    let successor = |idx: usize| -> usize {
        let edge = &edges[idx];
        let [first, second] = outgoing[&edge.to()];
        if second == NONE {
            return first;
        }
        let wanted = match connectivity {
            Connectivity::Four => edge.dir.right(),
            Connectivity::Eight => edge.dir.left(),
        };
        if edges[first].dir == wanted { first } else { second }
    };

    let mut rings: Vec<Vec<Ring>> = (0..=labels.count()).map(|_| Vec::new()).collect();
    let mut visited = vec![false; edges.len()];
    let mut walk: Vec<(usize, usize)> = Vec::new();

    for start in 0..edges.len() {
        if visited[start] {
            continue;
        }
        walk.clear();
        let mut current = start;
        loop {
            visited[current] = true;
            walk.push(edges[current].from);
            current = successor(current);
            if current == start {
                break;
            }
        }
        let region = &mut rings[edges[start].label as usize];
        region.extend(split_pinches(&walk).iter().map(|cycle| Ring::new(cycle)));
    }

    rings.into_iter()
        .skip(1)
        .filter(|region| !region.is_empty())
        .flat_map(assemble_polygons)
        .collect()
}

/// A simple closed ring in pixel space.
struct Ring {
    line: LineString<f64>,
    /// Twice the signed shoelace area; positive for shells.
    area2: f64,
    /// Midpoint of the first unit edge, never on any other ring.
    probe: Point<f64>,
}

impl Ring {
    /// Build a ring from the corner sequence of a simple cycle of unit steps.
    fn new(cycle: &[(usize, usize)]) -> Self {
        let n = cycle.len();
        let mut coords: Vec<Coord<f64>> = (0..n)
            .filter(|&i| step(cycle[(i + n - 1) % n], cycle[i]) != step(cycle[i], cycle[(i + 1) % n]))
            .map(|i| corner(cycle[i]))
            .collect();
        if let Some(&first) = coords.first() {
            coords.push(first);
        }
        let line = LineString(coords);
        let (a, b) = (corner(cycle[0]), corner(cycle[1 % n]));
        Ring {
            area2: signed_area2(&line),
            line,
            probe: Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0),
        }
    }
}

#[inline]
fn corner((x, y): (usize, usize)) -> Coord<f64> {
    Coord { x: x as f64, y: y as f64 }
}

#[inline]
fn step(from: (usize, usize), to: (usize, usize)) -> (isize, isize) {
    (to.0 as isize - from.0 as isize, to.1 as isize - from.1 as isize)
}

/// Cut a closed walk of corners into cycles that visit no corner twice.
fn split_pinches(walk: &[(usize, usize)]) -> Vec<Vec<(usize, usize)>> {
    let mut cycles = Vec::new();
    let mut stack: Vec<(usize, usize)> = Vec::with_capacity(walk.len());
    let mut position: AHashMap<(usize, usize), usize> = AHashMap::new();
    for &vertex in walk {
        if let Some(&at) = position.get(&vertex) {
            let cycle: Vec<(usize, usize)> = stack.drain(at..).collect();
            for v in &cycle {
                position.remove(v);
            }
            cycles.push(cycle);
        }
        position.insert(vertex, stack.len());
        stack.push(vertex);
    }
    cycles.push(stack);
    cycles
}

/// Collect the clockwise boundary edges of every labelled cell.
fn boundary_edges(labels: &Labels) -> Vec<Edge> {
    let (width, height) = (labels.width(), labels.height());
    let is_set = |col: Option<usize>, row: Option<usize>| match (col, row) {
        (Some(c), Some(r)) if c < width && r < height => labels.get(c, r) != 0,
        _ => false,
    };

    let mut edges = Vec::new();
    for row in 0..height {
        for col in 0..width {
            let label = labels.get(col, row);
            if label == 0 {
                continue;
            }
            if !is_set(Some(col), row.checked_sub(1)) {
                edges.push(Edge { from: (col, row), dir: Dir::East, label });
            }
            if !is_set(Some(col + 1), Some(row)) {
                edges.push(Edge { from: (col + 1, row), dir: Dir::South, label });
            }
            if !is_set(Some(col), Some(row + 1)) {
                edges.push(Edge { from: (col + 1, row + 1), dir: Dir::West, label });
            }
            if !is_set(col.checked_sub(1), Some(row)) {
                edges.push(Edge { from: (col, row + 1), dir: Dir::North, label });
            }
        }
    }
    edges
}

/// Twice the signed shoelace area of a closed ring.
fn signed_area2(ring: &LineString<f64>) -> f64 {
    ring.0.windows(2)
        .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
        .sum()
}

/// Attach every hole of a region to the smallest shell around it.
fn assemble_polygons(rings: Vec<Ring>) -> Vec<Polygon<f64>> {
    let (shells, holes): (Vec<Ring>, Vec<Ring>) = rings.into_iter().partition(|ring| ring.area2 > 0.0);
    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); shells.len()];

    if shells.len() == 1 {
        interiors[0].extend(holes.into_iter().map(|hole| hole.line));
    } else {
        let outlines: Vec<Polygon<f64>> = shells.iter()
            .map(|shell| Polygon::new(shell.line.clone(), Vec::new()))
            .collect();
        for hole in holes {
            let owner = outlines.iter()
                .enumerate()
                .filter(|(_, outline)| outline.contains(&hole.probe))
                .min_by(|a, b| shells[a.0].area2.total_cmp(&shells[b.0].area2))
                .map_or(0, |(idx, _)| idx);
            interiors[owner].push(hole.line);
        }
    }

    shells.into_iter()
        .zip(interiors)
        .map(|(shell, holes)| Polygon::new(shell.line, holes))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_are_inverse() {
        for dir in [Dir::East, Dir::South, Dir::West, Dir::North] {
            assert_eq!(dir.right().left(), dir);
        }
    }

    #[test]
    fn walk_through_a_corner_twice_splits_in_two() {
        let walk = [(0, 0), (1, 0), (1, 1), (2, 1), (2, 2), (1, 2), (1, 1), (0, 1)];
        let cycles = split_pinches(&walk);
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0], vec![(1, 1), (2, 1), (2, 2), (1, 2)]);
        assert_eq!(cycles[1], vec![(0, 0), (1, 0), (1, 1), (0, 1)]);
    }

    #[test]
    fn ring_drops_collinear_corners() {
        let ring = Ring::new(&[(0, 0), (1, 0), (2, 0), (2, 1), (1, 1), (0, 1)]);
        assert_eq!(ring.line.0.len(), 5);
        assert_eq!(ring.area2, 4.0);
        assert_eq!(ring.probe, Point::new(0.5, 0.0));
    }

    #[test]
    fn single_cell_yields_unit_square() {
        let polys = trace_regions(1, 1, Connectivity::Four, |_, _| true);
        assert_eq!(polys.len(), 1);
        let ring = &polys[0].exterior().0;
        assert_eq!(ring.len(), 5);
        assert_eq!(signed_area2(polys[0].exterior()).abs(), 2.0);
    }
}
