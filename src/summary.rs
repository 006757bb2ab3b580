use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::write_atomic;

/// An item that was not processed to completion, with the reason why.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub name: String,
    pub reason: String,
}

/// End-of-run report of a stage: what succeeded, what was skipped and what
/// failed, by item name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub stage: String,
    pub parameters: Value,
    pub succeeded: Vec<String>,
    pub skipped: Vec<ItemOutcome>,
    pub failed: Vec<ItemOutcome>,
}

impl RunSummary {
    /// Start an empty summary; `parameters` is recorded as JSON.
    pub fn new<P: Serialize>(stage: &str, parameters: &P) -> Result<Self> {
        let parameters = serde_json::to_value(parameters)
            .with_context(|| format!("[summary] Failed to record the {stage} parameters"))?;
        Ok(Self {
            stage: stage.to_string(),
            parameters,
            succeeded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        })
    }

    pub fn succeed(&mut self, name: impl Into<String>) {
        self.succeeded.push(name.into());
    }

    pub fn skip(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(ItemOutcome { name: name.into(), reason: reason.into() });
    }

    pub fn fail(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.failed.push(ItemOutcome { name: name.into(), reason: reason.into() });
    }

    #[inline] pub fn total(&self) -> usize { self.succeeded.len() + self.skipped.len() + self.failed.len() }

    /// Location of the summary file inside `output`.
    pub fn path_in(&self, output: &Path) -> PathBuf {
        output.join(format!("{}_summary.json", self.stage))
    }

    /// Write the summary as pretty JSON into `output`.
    pub fn write(&self, output: &Path) -> Result<PathBuf> {
        let path = self.path_in(output);
        let json = serde_json::to_vec_pretty(self).context("[summary] Failed to serialize run summary")?;
        write_atomic(&path, &json)
            .with_context(|| format!("[summary] Failed to write {}", path.display()))?;
        Ok(path)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} succeeded, {} skipped, {} failed",
            self.stage, self.succeeded.len(), self.skipped.len(), self.failed.len()
        )?;
        for name in &self.succeeded {
            writeln!(f, "  ok      {name}")?;
        }
        for item in &self.skipped {
            writeln!(f, "  skipped {}: {}", item.name, item.reason)?;
        }
        for item in &self.failed {
            writeln!(f, "  failed  {}: {}", item.name, item.reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_roundtrips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut summary = RunSummary::new("classify", &serde_json::json!({ "cell_size": 5.0 })).unwrap();
        summary.succeed("map_1904");
        summary.skip("map_1932", "already classified");
        summary.fail("map_1955", "decode error");

        let path = summary.write(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("classify_summary.json"));
        let back: RunSummary = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back, summary);
        assert_eq!(back.total(), 3);
    }

    #[test]
    fn display_lists_every_item() {
        let mut summary = RunSummary::new("polygonize", &()).unwrap();
        summary.succeed("a_iso");
        summary.skip("b_iso", "no water class");
        let text = summary.to_string();
        assert!(text.starts_with("polygonize: 1 succeeded, 1 skipped, 0 failed"));
        assert!(text.contains("skipped b_iso: no water class"));
    }

    #[test]
    fn unserializable_parameters_are_an_error() {
        // JSON object keys must be strings.
        let parameters = std::collections::BTreeMap::from([((1, 2), "cell")]);
        let err = RunSummary::new("classify", &parameters).unwrap_err();
        assert!(err.to_string().contains("classify parameters"));
    }
}
