use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Create the directory if it doesn’t exist; error if a non-directory exists there.
pub(crate) fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            bail!("Path exists but is not a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
    }
    Ok(())
}

/// Write-then-rename wrapper so readers never observe a half-written file.
pub(crate) struct PendingWrite {
    target: PathBuf,
    tmp: NamedTempFile,
}

/// Open a temporary file next to `target`; nothing is visible at `target`
/// until [`PendingWrite::finish`] succeeds.
pub(crate) fn open_for_write(target: &Path) -> Result<PendingWrite> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("create dir {}", parent.display()))?;
    let tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("create temp file in {}", parent.display()))?;
    Ok(PendingWrite { target: target.to_path_buf(), tmp })
}

impl PendingWrite {
    /// Flush, fsync and atomically move the temporary file into place.
    pub(crate) fn finish(mut self) -> Result<()> {
        self.tmp.flush().with_context(|| format!("flush {}", self.target.display()))?;
        self.tmp.as_file().sync_all().ok(); // best-effort fsync file
        let target = self.target;
        self.tmp.persist(&target)
            .with_context(|| format!("rename to {}", target.display()))?;
        if let Some(dir) = target.parent() {
            let _ = File::open(dir).and_then(|f| f.sync_all());
        }
        Ok(())
    }
}

impl Write for PendingWrite {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.tmp.write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.tmp.flush()
    }
}

impl Seek for PendingWrite {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        self.tmp.as_file_mut().seek(pos)
    }
}

/// Write `bytes` to `target` through a [`PendingWrite`].
pub(crate) fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let mut pending = open_for_write(target)?;
    pending.write_all(bytes)
        .with_context(|| format!("write {}", target.display()))?;
    pending.finish()
}
