//! GeoJSON reading (polygon layers) and writing (lake feature classes).

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Value};

use crate::common::write_atomic;
use crate::geom::LakePolygon;

fn ring_json(ls: &LineString<f64>) -> Value {
    Value::Array(ls.coords().map(|c| json!([c.x, c.y])).collect())
}

fn polygon_json(polygon: &Polygon<f64>) -> Value {
    let mut rings = vec![ring_json(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring_json));
    Value::Array(rings)
}

/// Lakes as a GeoJSON FeatureCollection, one Polygon feature per lake.
pub(crate) fn lakes_to_geojson_bytes(lakes: &[LakePolygon]) -> Result<Vec<u8>> {
    let features: Vec<Value> = lakes.iter().map(|lake| {
        json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": polygon_json(&lake.polygon),
            },
            "properties": {
                "source": lake.source,
                "area": lake.area,
            }
        })
    }).collect();

    let feature_collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });

    serde_json::to_vec(&feature_collection).context("[io::geojson::write] Failed to serialize GeoJSON to bytes")
}

pub(crate) fn write_lakes(path: &Path, lakes: &[LakePolygon]) -> Result<()> {
    let bytes = lakes_to_geojson_bytes(lakes)?;
    write_atomic(path, &bytes)
        .with_context(|| format!("[io::geojson::write] Failed to write {}", path.display()))
}

/// Read every Polygon / MultiPolygon geometry of a GeoJSON file.
///
/// Accepts a FeatureCollection, a single Feature or a bare geometry; other
/// geometry types are ignored.
pub(crate) fn read_polygons(path: &Path) -> Result<Vec<MultiPolygon<f64>>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("[io::geojson::read] Failed to open {}", path.display()))?;
    read_polygons_from_bytes(&bytes)
        .with_context(|| format!("[io::geojson::read] Failed to parse {}", path.display()))
}

pub(crate) fn read_polygons_from_bytes(bytes: &[u8]) -> Result<Vec<MultiPolygon<f64>>> {
    let value: Value = serde_json::from_slice(bytes).context("Failed to parse GeoJSON bytes")?;
    let geometries: Vec<&Value> = match value["type"].as_str() {
        Some("FeatureCollection") => value["features"].as_array()
            .ok_or_else(|| anyhow!("FeatureCollection without features"))?
            .iter()
            .map(|feature| &feature["geometry"])
            .collect(),
        Some("Feature") => vec![&value["geometry"]],
        Some(_) => vec![&value],
        None => bail!("not a GeoJSON object"),
    };

    let mut geoms = Vec::new();
    for geometry in geometries {
        let coords = &geometry["coordinates"];
        match geometry["type"].as_str() {
            Some("Polygon") => geoms.push(MultiPolygon(vec![parse_polygon(coords)?])),
            Some("MultiPolygon") => {
                let polygons = coords.as_array()
                    .ok_or_else(|| anyhow!("Invalid MultiPolygon: coordinates must be an array"))?
                    .iter()
                    .map(parse_polygon)
                    .collect::<Result<Vec<_>>>()?;
                geoms.push(MultiPolygon(polygons));
            }
            _ => {}
        }
    }
    Ok(geoms)
}

/// Parse `[exterior, hole, ...]` ring arrays into a polygon.
fn parse_polygon(coords: &Value) -> Result<Polygon<f64>> {
    let rings = coords.as_array()
        .ok_or_else(|| anyhow!("Invalid Polygon: coordinates must be an array"))?;
    let (exterior, interiors) = rings.split_first()
        .ok_or_else(|| anyhow!("Invalid Polygon: missing exterior ring"))?;
    Ok(Polygon::new(
        parse_ring(exterior)?,
        interiors.iter().map(parse_ring).collect::<Result<Vec<_>>>()?,
    ))
}

/// Parse a ring `[[x, y], ...]`, closing it if needed.
fn parse_ring(coords: &Value) -> Result<LineString<f64>> {
    let mut points = Vec::new();
    for pair in coords.as_array().ok_or_else(|| anyhow!("Invalid ring: must be an array"))? {
        let x = pair[0].as_f64().ok_or_else(|| anyhow!("Invalid coordinate: x must be a number"))?;
        let y = pair[1].as_f64().ok_or_else(|| anyhow!("Invalid coordinate: y must be a number"))?;
        points.push(Coord { x, y });
    }
    if !points.is_empty() && points[0] != points[points.len() - 1] {
        points.push(points[0]);
    }
    Ok(LineString(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area};

    #[test]
    fn lakes_are_written_as_polygon_features() {
        let lakes = vec![LakePolygon::new(
            polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)],
            "map_1904_iso",
        )];
        let bytes = lakes_to_geojson_bytes(&lakes).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["features"][0]["properties"]["source"], "map_1904_iso");
        assert_eq!(value["features"][0]["properties"]["area"], 16.0);

        let back = read_polygons_from_bytes(&bytes).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].unsigned_area(), 16.0);
    }

    #[test]
    fn reads_multipolygons_and_bare_geometries() {
        let multi = br#"{"type": "Feature", "properties": {}, "geometry": {"type": "MultiPolygon", "coordinates": [
            [[[0, 0], [2, 0], [2, 2], [0, 2]]],
            [[[5, 5], [6, 5], [6, 6], [5, 6], [5, 5]]]
        ]}}"#;
        let parsed = read_polygons_from_bytes(multi).unwrap();
        assert_eq!(parsed[0].0.len(), 2);
        assert_eq!(parsed[0].unsigned_area(), 5.0);

        let bare = br#"{"type": "Point", "coordinates": [1, 2]}"#;
        assert!(read_polygons_from_bytes(bare).unwrap().is_empty());
    }
}
