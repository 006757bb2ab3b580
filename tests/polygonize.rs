// End-to-end runs of the polygonizer stage on synthetic classified rasters.

mod common;

use std::fs;
use std::path::Path;

use anyhow::bail;
use approx::assert_relative_eq;
use serde_json::Value;
use shapefile::dbase::FieldValue;
use shapefile::Reader;
use topolakes::raster::{reclassify_binary, Mask};
use topolakes::{write_class_raster, Error, OutputFormat, PolygonizeConfig, Polygonizer, Toolkit};

use common::{class_raster, write_manifest};

/// Three classified rasters next to a manifest with the given labels.
fn setup(root: &Path, labels: [&str; 3]) -> PolygonizeConfig {
    let rasters = root.join("classified");
    fs::create_dir_all(&rasters).unwrap();
    let names = ["map_1904_iso", "map_1932_iso", "map_1955_iso"];
    for name in names {
        write_class_raster(&rasters.join(format!("{name}.tif")), &class_raster()).unwrap();
    }
    let manifest = rasters.join("classified_rasters.csv");
    let rows: Vec<(&str, &str)> = names.into_iter().zip(labels).collect();
    write_manifest(&manifest, &rows);
    PolygonizeConfig::new(manifest, root.join("lakes"))
}

fn geojson_areas(path: &Path) -> Vec<f64> {
    let value: Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
    let mut areas: Vec<f64> = value["features"].as_array().unwrap().iter()
        .map(|f| f["properties"]["area"].as_f64().unwrap())
        .collect();
    areas.sort_by(f64::total_cmp);
    areas
}

#[test]
fn labelled_row_yields_every_water_region() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), ["1", "", ""]);

    let summary = Polygonizer::new(config.clone()).run().unwrap();
    assert_eq!(summary.succeeded, vec!["map_1904_iso"]);
    assert_eq!(summary.skipped.len(), 2);
    assert!(summary.failed.is_empty());

    let shp = config.output.join("map_1904_lakes.shp");
    assert!(shp.is_file());
    assert!(shp.with_extension("dbf").is_file());
    assert!(!config.output.join("map_1932_lakes.shp").exists());
    assert!(!config.output.join("map_1955_lakes.shp").exists());

    let mut reader = Reader::from_path(&shp).unwrap();
    let mut areas = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.unwrap();
        assert!(matches!(shape, shapefile::Shape::Polygon(_)));
        match record.get("area") {
            Some(FieldValue::Numeric(Some(area))) => areas.push(*area),
            other => panic!("unexpected area field {other:?}"),
        }
    }
    areas.sort_by(f64::total_cmp);
    assert_eq!(areas, vec![150.0, 300.0]);
}

#[test]
fn empty_label_is_skipped_without_aborting() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), ["", "1", "abc"]);

    let summary = Polygonizer::new(config.clone()).run().unwrap();
    assert_eq!(summary.succeeded, vec!["map_1932_iso"]);
    let skipped: Vec<&str> = summary.skipped.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(skipped, vec!["map_1904_iso", "map_1955_iso"]);
    assert!(!config.output.join("map_1904_lakes.shp").exists());
}

#[test]
fn label_outside_the_domain_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), ["9", "-1", "1"]);

    let summary = Polygonizer::new(config).run().unwrap();
    assert_eq!(summary.succeeded, vec!["map_1955_iso"]);
    assert_eq!(summary.skipped.len(), 2);
    assert!(summary.skipped[0].reason.contains("not in the raster's classes"));
}

#[test]
fn missing_raster_fails_only_its_row() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), ["1", "1", "1"]);
    fs::remove_file(config.rasters.join("map_1932_iso.tif")).unwrap();

    let summary = Polygonizer::new(config).run().unwrap();
    assert_eq!(summary.succeeded, vec!["map_1904_iso", "map_1955_iso"]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].name, "map_1932_iso");
}

#[test]
fn shoreline_clips_and_drops_outside_polygons() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup(dir.path(), ["1", "", ""]);
    // Covers only the upper block (x 5..20, y 85..95).
    let shoreline = dir.path().join("shore.geojson");
    fs::write(&shoreline, r#"{"type": "FeatureCollection", "features": [{"type": "Feature", "properties": {},
        "geometry": {"type": "Polygon", "coordinates": [[[0, 80], [30, 80], [30, 100], [0, 100], [0, 80]]]}}]}"#).unwrap();
    config.shoreline = Some(shoreline);
    config.format = OutputFormat::GeoJson;

    let summary = Polygonizer::new(config.clone()).run().unwrap();
    assert_eq!(summary.succeeded, vec!["map_1904_iso"]);
    let areas = geojson_areas(&config.output.join("map_1904_lakes.geojson"));
    assert_eq!(areas.len(), 1);
    assert_relative_eq!(areas[0], 150.0, epsilon = 1e-6);
}

#[test]
fn minimum_area_is_strict() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup(dir.path(), ["1", "", ""]);
    config.min_area = 150.0;
    config.format = OutputFormat::GeoJson;

    Polygonizer::new(config.clone()).run().unwrap();
    assert_eq!(geojson_areas(&config.output.join("map_1904_lakes.geojson")), vec![300.0]);
}

#[test]
fn skip_existing_leaves_outputs_alone() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup(dir.path(), ["1", "", ""]);
    Polygonizer::new(config.clone()).run().unwrap();

    config.skip_existing = true;
    let summary = Polygonizer::new(config).run().unwrap();
    assert!(summary.succeeded.is_empty());
    assert_eq!(summary.skipped.len(), 3);
}

#[test]
fn rows_sharing_a_lake_name_do_not_overwrite_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), ["1", "", ""]);
    write_class_raster(&config.rasters.join("map_1904_x.tif"), &class_raster()).unwrap();
    write_manifest(&config.manifest, &[("map_1904_iso", "1"), ("map_1904_x", "1")]);

    let summary = Polygonizer::new(config).run().unwrap();
    assert_eq!(summary.succeeded, vec!["map_1904_iso"]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].name, "map_1904_x");
    assert!(summary.failed[0].reason.contains("map_1904_lakes"));
}

/// Rejects every mask cleanup step.
struct NoCleanup;

impl Toolkit for NoCleanup {
    fn majority_filter(&self, _mask: &Mask) -> anyhow::Result<Mask> {
        bail!("majority filter unavailable");
    }

    fn fill_holes(&self, _mask: &Mask, _connectivity: topolakes::Connectivity) -> anyhow::Result<Mask> {
        bail!("hole filling unavailable");
    }
}

#[test]
fn mask_cleanup_goes_through_the_toolkit() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup(dir.path(), ["1", "", ""]);
    config.majority_filter = true;
    let summary = Polygonizer::with_toolkit(config.clone(), NoCleanup).run().unwrap();
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].reason.contains("majority filter unavailable"));

    config.majority_filter = false;
    config.fill_holes = true;
    let summary = Polygonizer::with_toolkit(config.clone(), NoCleanup).run().unwrap();
    assert!(summary.failed[0].reason.contains("hole filling unavailable"));

    config.fill_holes = false;
    let summary = Polygonizer::with_toolkit(config, NoCleanup).run().unwrap();
    assert_eq!(summary.succeeded, vec!["map_1904_iso"]);
}

#[test]
fn malformed_manifest_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), ["1", "", ""]);
    fs::write(&config.manifest, "classified_raster,water_class\na_iso,1\na_iso,2\n").unwrap();
    assert!(matches!(Polygonizer::new(config).run(), Err(Error::Manifest(_))));
}

#[test]
fn unreadable_shoreline_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup(dir.path(), ["1", "", ""]);
    let shoreline = dir.path().join("shore.geojson");
    fs::write(&shoreline, "not json").unwrap();
    config.shoreline = Some(shoreline);
    assert!(matches!(Polygonizer::new(config).run(), Err(Error::Layer { .. })));
}

#[test]
fn binary_mask_keeps_exactly_the_water_cells() {
    let raster = class_raster();
    let mask = reclassify_binary(&raster, 1);
    assert!(mask.cells.iter().all(|&v| v <= 1));
    for (&class, &cell) in raster.classes.iter().zip(mask.cells.iter()) {
        assert_eq!(cell == 1, class == 1);
    }
    assert_eq!(mask.count(), 18);
}
