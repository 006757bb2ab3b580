// The manifest handoff between the stages: classify, label by hand, polygonize.

mod common;

use std::fs;

use topolakes::manifest::{Label, Manifest};
use topolakes::{read_class_raster, ClassifyConfig, Classifier, PolygonizeConfig, Polygonizer};

#[test]
fn manifest_rereads_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("classified_rasters.csv");
    common::write_manifest(&path, &[("map_1904_iso", " 2 "), ("map_1932_iso", ""), ("map_1955_iso", "x")]);

    let first = Manifest::read(&path).unwrap();
    let second = Manifest::read(&path).unwrap();
    assert_eq!(first, second);
    let labels: Vec<Label> = first.rows().iter().map(|r| r.label()).collect();
    assert_eq!(labels, vec![Label::Class(2), Label::Missing, Label::Invalid("x".into())]);
}

#[test]
fn classify_then_label_then_polygonize() {
    let dir = tempfile::tempdir().unwrap();
    common::write_sources(&dir.path().join("maps"));
    let mut classify = ClassifyConfig::new(dir.path().join("maps"), dir.path().join("classified"), 5.0);
    classify.cluster.sample_interval = 2;
    Classifier::new(classify.clone()).run().unwrap();

    // The operator picks the darkest class of the first map as water.
    let mut manifest = fs::read_to_string(&classify.manifest).unwrap();
    manifest = manifest.replacen("map_1904_iso,", "map_1904_iso,0", 1);
    fs::write(&classify.manifest, manifest).unwrap();

    let config = PolygonizeConfig::new(&classify.manifest, dir.path().join("lakes"));
    let summary = Polygonizer::new(config.clone()).run().unwrap();
    assert_eq!(summary.succeeded, vec!["map_1904_iso"]);
    assert_eq!(summary.skipped.len(), 2);
    assert!(config.output.join("map_1904_lakes.shp").is_file());
    assert!(config.output.join("polygonize_summary.json").is_file());

    // The polygonizer never rewrites the manifest or the rasters.
    assert_eq!(Manifest::read(&classify.manifest).unwrap().len(), 3);
    assert!(read_class_raster(&classify.output.join("map_1904_iso.tif")).is_ok());
}
