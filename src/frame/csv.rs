//! CSV reading and writing for keyed frames (UTF-8 with BOM).

use std::{fs, io::{Cursor, Write}, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use polars::{
    frame::DataFrame,
    io::{SerReader, SerWriter},
    prelude::{CsvReader, CsvWriter},
};
use tempfile::NamedTempFile;
use tracing::warn;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Serialize a frame to CSV bytes, prefixed with a UTF-8 BOM.
pub fn write_csv_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut df = df.clone();
    let mut out = BOM.to_vec();
    CsvWriter::new(&mut out)
        .finish(&mut df)
        .context("[frame::csv] Failed to write CSV to bytes")?;
    Ok(out)
}

/// A CSV written to a temporary file beside its destination, not yet in place.
#[derive(Debug)]
pub struct StagedCsv {
    file: NamedTempFile,
    path: PathBuf,
}

impl StagedCsv {
    #[inline] pub fn path(&self) -> &Path { &self.path }

    /// Move the file into place.
    pub fn persist(self) -> Result<()> {
        let Self { file, path } = self;
        file.persist(&path)
            .map_err(|e| e.error)
            .with_context(|| format!("[frame::csv] Failed to move CSV into place at {}", path.display()))?;
        Ok(())
    }
}

/// Write `df` to a temporary file in the directory of `path`.
/// Dropping the result without persisting leaves nothing behind.
pub fn stage_csv(df: &DataFrame, path: &Path) -> Result<StagedCsv> {
    let bytes = write_csv_bytes(df)?;
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(dir)
        .with_context(|| format!("[frame::csv] Failed to create directory {}", dir.display()))?;

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("[frame::csv] Failed to create temporary file in {}", dir.display()))?;
    file.write_all(&bytes)
        .with_context(|| format!("[frame::csv] Failed to write CSV for {}", path.display()))?;
    Ok(StagedCsv { file, path: path.to_path_buf() })
}

/// Write `df` to `path`. The file appears complete or not at all.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
    stage_csv(df, path)?.persist()
}

/// Move every staged file into place, in order.
///
/// If one fails, the files this call already moved are removed again and
/// the remaining ones are discarded.
pub fn persist_all(staged: Vec<StagedCsv>) -> Result<()> {
    let mut placed: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for file in staged {
        let path = file.path().to_path_buf();
        if let Err(e) = file.persist() {
            for done in &placed {
                if let Err(err) = fs::remove_file(done) {
                    warn!(path = %done.display(), error = %err, "failed to roll back CSV");
                }
            }
            return Err(e);
        }
        placed.push(path);
    }
    Ok(())
}

/// Read a frame from a CSV file, with or without a BOM.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let bytes = fs::read(path)
        .with_context(|| format!("[frame::csv] Failed to open CSV file: {}", path.display()))?;
    let body = bytes.strip_prefix(BOM).unwrap_or(&bytes[..]);
    CsvReader::new(Cursor::new(body))
        .finish()
        .with_context(|| format!("[frame::csv] Failed to read CSV from {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{flag, number, records_to_frame, text, Record};

    fn sample() -> DataFrame {
        records_to_frame(&[
            Record::new("AFG", 0).with("feature_count", 1usize).with("flag", false).with("ratio", 0.5),
            Record::new("AFG", 1).with("feature_count", 34usize).with("flag", true).with("ids", "AF01;AF02"),
        ]).unwrap()
    }

    #[test]
    fn bytes_start_with_bom_and_header() {
        let bytes = write_csv_bytes(&sample()).unwrap();
        assert!(bytes.starts_with(BOM));
        let body = String::from_utf8(bytes[BOM.len()..].to_vec()).unwrap();
        assert!(body.starts_with("iso3,level,feature_count,flag,ratio,ids\n"));
        assert!(body.contains("AFG,1,34,true,,AF01;AF02"));
    }

    #[test]
    fn file_is_read_back_with_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("afg").join("afg_checks.csv");
        write_csv(&sample(), &path).unwrap();

        let df = read_csv(&path).unwrap();
        assert_eq!(df.get_column_names(), sample().get_column_names());
        assert_eq!(number(&df, 1, "level"), Some(1.0));
        assert_eq!(number(&df, 1, "feature_count"), Some(34.0));
        assert_eq!(flag(&df, 1, "flag"), Some(true));
        assert_eq!(number(&df, 0, "ratio"), Some(0.5));
        assert_eq!(text(&df, 0, "ids"), None);
    }

    #[test]
    fn identical_frames_serialize_identically() {
        assert_eq!(write_csv_bytes(&sample()).unwrap(), write_csv_bytes(&sample()).unwrap());
    }

    #[test]
    fn failed_persist_rolls_back_earlier_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.csv");
        let blocked = dir.path().join("b.csv");
        fs::create_dir_all(blocked.join("occupied")).unwrap();

        let staged = vec![stage_csv(&sample(), &first).unwrap(), stage_csv(&sample(), &blocked).unwrap()];
        assert!(persist_all(staged).is_err());
        assert!(!first.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
