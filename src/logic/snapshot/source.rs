//! Snapshot sources
//!
//! A snapshot comes either from a raw dump (decoded update lines) or from a
//! previously exported snapshot. The variant is picked once, from the path.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{Snapshot, SnapshotConfig, SnapshotError};

/// RouteViews / RIS naming: `rib.20131101.1200.*`, `updates.20131101.1215.*`
static FILE_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})(\d{2})(\d{2})\.(\d{2})(\d{2})").expect("static regex")
});

/// Compressed / binary MRT containers need an external decoder first
const BINARY_EXTENSIONS: &[&str] = &["bz2", "gz", "mrt", "xz"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Dump lines produced by an MRT decoder
    RawDump(PathBuf),
    /// JSON produced by `Snapshot::export_json`
    Serialized(PathBuf),
}

impl SnapshotSource {
    /// Pick the source variant from the file extension
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if extension == "json" {
            Ok(SnapshotSource::Serialized(path.to_path_buf()))
        } else if BINARY_EXTENSIONS.contains(&extension.as_str()) {
            Err(SnapshotError::Unsupported(path.display().to_string()))
        } else {
            Ok(SnapshotSource::RawDump(path.to_path_buf()))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            SnapshotSource::RawDump(path) | SnapshotSource::Serialized(path) => path,
        }
    }

    /// File name, used as the snapshot id
    pub fn source_id(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path().display().to_string())
    }

    pub fn load(&self, config: &SnapshotConfig) -> Result<Snapshot, SnapshotError> {
        match self {
            SnapshotSource::RawDump(path) => {
                log::info!("Reading dump: {}", path.display());
                let source_id = self.source_id();
                let reader = BufReader::new(File::open(path)?);
                Snapshot::from_reader(
                    &source_id,
                    timestamp_from_file_name(&source_id),
                    reader,
                    config,
                )
            }
            SnapshotSource::Serialized(path) => {
                log::info!("Importing serialized snapshot: {}", path.display());
                Snapshot::import_json(path)
            }
        }
    }
}

/// Snapshot time encoded in a dump file name, if any
pub fn timestamp_from_file_name(name: &str) -> Option<DateTime<Utc>> {
    let caps = FILE_TIMESTAMP.captures(name)?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let date = NaiveDate::from_ymd_opt(num(1)? as i32, num(2)?, num(3)?)?;
    let time = NaiveTime::from_hms_opt(num(4)?, num(5)?, 0)?;
    Some(NaiveDateTime::new(date, time).and_utc())
}
