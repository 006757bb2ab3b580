//! CSV reading and writing operations.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerReader, io::SerWriter, prelude::{CsvReadOptions, CsvWriter}};

use crate::common::open_for_write;

/// Read a comma-separated file with a header row, every column as a string.
/// Empty fields come back as nulls.
pub(crate) fn read_string_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv::read] Failed to open CSV file: {}", path.display()))?;
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(file)
        .finish()
        .with_context(|| format!("[io::csv::read] Failed to read CSV from {:?}", path))
}

/// Write a DataFrame to `path` through a temporary file, nulls as empty fields.
pub(crate) fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut pending = open_for_write(path)
        .with_context(|| format!("[io::csv::write] Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(&mut pending)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("[io::csv::write] Failed to write CSV to {:?}", path))?;
    pending.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{NamedFrom, Series};

    #[test]
    fn strings_and_nulls_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let mut df = DataFrame::new(vec![
            Series::new("name".into(), vec!["007", "b,c"]).into(),
            Series::new("value".into(), vec![Some("1"), None]).into(),
        ]).unwrap();
        write_csv(&mut df, &path).unwrap();

        let back = read_string_csv(&path).unwrap();
        let names: Vec<_> = back.column("name").unwrap().str().unwrap().into_iter().collect();
        let values: Vec<_> = back.column("value").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(names, vec![Some("007"), Some("b,c")]);
        assert_eq!(values, vec![Some("1"), None]);
    }
}
