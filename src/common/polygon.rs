use anyhow::{bail, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile as shp;

/// Ensure first and last are the same.
fn ensure_closed(coords: &mut Vec<Coord<f64>>) {
    if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
        if first != last {
            coords.push(first);
        }
    }
}

/// Signed shoelace area of a closed coordinate list (positive for CCW).
fn signed_area(pts: &[Coord<f64>]) -> f64 {
    pts.windows(2)
        .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
        .sum::<f64>() / 2.0
}

/// Convert any polygon-like shapefile shape to a `geo::MultiPolygon<f64>`.
///
/// Shapefile rings are ordered `[outer CW, holes CCW..., next outer CW, ...]`;
/// rings are grouped by orientation. M and Z values are dropped.
pub(crate) fn shape_to_multipolygon(shape: shp::Shape) -> Result<MultiPolygon<f64>> {
    let rings: Vec<Vec<Coord<f64>>> = match shape {
        shp::Shape::Polygon(p) => p.rings().iter()
            .map(|ring| ring.points().iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect())
            .collect(),
        shp::Shape::PolygonM(p) => p.rings().iter()
            .map(|ring| ring.points().iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect())
            .collect(),
        shp::Shape::PolygonZ(p) => p.rings().iter()
            .map(|ring| ring.points().iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect())
            .collect(),
        shp::Shape::NullShape => Vec::new(),
        other => bail!("expected a polygon shape, found {}", other.shapetype()),
    };

    let mut polys: Vec<Polygon<f64>> = Vec::new();
    let mut current_exterior: Option<LineString<f64>> = None;
    let mut current_holes: Vec<LineString<f64>> = Vec::new();

    for mut coords in rings {
        ensure_closed(&mut coords);
        if coords.len() < 4 {
            continue;
        }
        // CW => exterior in Shapefile.
        let is_exterior = signed_area(&coords) < 0.0;
        let ls = LineString(coords);
        if is_exterior {
            if let Some(ext) = current_exterior.take() {
                polys.push(Polygon::new(ext, std::mem::take(&mut current_holes)));
            }
            current_exterior = Some(ls);
        } else {
            current_holes.push(ls);
        }
    }
    if let Some(ext) = current_exterior {
        polys.push(Polygon::new(ext, current_holes));
    }

    Ok(MultiPolygon(polys))
}

/// Convert a `geo::Polygon<f64>` to a shapefile polygon (outer CW, holes CCW).
pub(crate) fn polygon_to_shape(poly: &Polygon<f64>) -> shp::Polygon {
    fn ring_points(ls: &LineString<f64>, clockwise: bool) -> Vec<shp::Point> {
        let mut coords = ls.0.clone();
        ensure_closed(&mut coords);
        if (signed_area(&coords) > 0.0) == clockwise {
            coords.reverse();
        }
        coords.into_iter().map(|c| shp::Point { x: c.x, y: c.y }).collect()
    }

    let mut rings = vec![shp::PolygonRing::Outer(ring_points(poly.exterior(), true))];
    rings.extend(poly.interiors().iter().map(|hole| shp::PolygonRing::Inner(ring_points(hole, false))));
    shp::Polygon::with_rings(rings)
}
