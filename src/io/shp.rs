//! Shapefile reading (polygon layers) and writing (lake feature classes).

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use geo::MultiPolygon;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Reader, Writer};

use crate::common::{polygon_to_shape, shape_to_multipolygon};
use crate::geom::LakePolygon;

/// Companion files written next to every `.shp`.
const COMPONENTS: [&str; 3] = ["shp", "shx", "dbf"];

/// Read every polygon shape of a `.shp` file; attributes are ignored.
pub(crate) fn read_polygons(path: &Path) -> Result<Vec<MultiPolygon<f64>>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("[io::shp::read] Failed to open shapefile: {}", path.display()))?;

    let mut shapes = Vec::new();
    for (idx, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, _) = result
            .with_context(|| format!("[io::shp::read] Error reading shape {idx} of {}", path.display()))?;
        shapes.push(shape_to_multipolygon(shape)
            .with_context(|| format!("[io::shp::read] Shape {idx} of {}", path.display()))?);
    }
    Ok(shapes)
}

fn field(name: &str) -> Result<FieldName> {
    FieldName::try_from(name).map_err(|e| anyhow!("[io::shp::write] Invalid field name {name}: {e:?}"))
}

/// Write lakes as a polygon Shapefile with `source` and `area` attributes.
///
/// The three component files are written into a temporary directory beside
/// `path` and renamed into place once complete.
pub(crate) fn write_lakes(path: &Path, lakes: &[LakePolygon]) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let stem = path.file_stem().ok_or_else(|| anyhow!("[io::shp::write] No file name in {}", path.display()))?;
    let staging = tempfile::Builder::new()
        .prefix(".shp-")
        .tempdir_in(parent)
        .with_context(|| format!("[io::shp::write] Failed to create staging dir in {}", parent.display()))?;
    let staged = staging.path().join(path.file_name().unwrap_or(stem));

    let table = TableWriterBuilder::new()
        .add_character_field(field("source")?, 80)
        .add_numeric_field(field("area")?, 20, 3);
    {
        let mut writer = Writer::from_path(&staged, table)
            .with_context(|| format!("[io::shp::write] Failed to create shapefile {}", staged.display()))?;
        for lake in lakes {
            let mut record = Record::default();
            record.insert("source".to_string(), FieldValue::Character(Some(lake.source.clone())));
            record.insert("area".to_string(), FieldValue::Numeric(Some(lake.area)));
            writer.write_shape_and_record(&polygon_to_shape(&lake.polygon), &record)
                .with_context(|| format!("[io::shp::write] Failed to write shape to {}", staged.display()))?;
        }
    }

    for ext in COMPONENTS {
        let from = staged.with_extension(ext);
        let to = path.with_extension(ext);
        fs::rename(&from, &to)
            .with_context(|| format!("[io::shp::write] Failed to move {} to {}", from.display(), to.display()))?;
    }
    Ok(())
}
