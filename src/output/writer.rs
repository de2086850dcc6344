//! Feature sink trait definition.

use crate::error::{BoxError, Error, Result};
use crate::geo::Geometry;
use crate::output::Attributes;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Destination for the final feature collection of a run.
pub trait FeatureSink {
    /// Add one feature.
    fn add(&mut self, geometry: &Geometry, attributes: &Attributes) -> Result<()>;

    /// Flush everything added so far to the destination.
    fn finalize(&mut self) -> Result<()>;
}

/// Write `path` through a temporary sibling file that is renamed into place
/// only after `write` succeeds, so a failed write leaves no partial output.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::result::Result<(), BoxError>,
{
    let temp = temp_path(path);
    let wrap = |source: BoxError| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let result = File::create(&temp)
        .map_err(|e| wrap(e.into()))
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write(&mut writer).map_err(wrap)?;
            writer.flush().map_err(|e| wrap(e.into()))
        })
        .and_then(|()| std::fs::rename(&temp, path).map_err(|e| wrap(e.into())));

    if result.is_err() {
        let _ = std::fs::remove_file(&temp);
    }
    result
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "output".into(), |n| n.to_string_lossy());
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomically_replaces_target() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "old").unwrap();

        write_atomically(&path, |w| Ok(w.write_all(b"new")?)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_failed_write_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");

        let err = write_atomically(&path, |w| {
            w.write_all(b"partial")?;
            Err("encoder failed".into())
        })
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Write);
        assert!(!path.exists());
        assert!(!temp_path(&path).exists());
    }
}
