//! Snapshot Exporter
//!
//! JSON keeps the full snapshot and can be imported again as a
//! `SnapshotSource::Serialized`. CSV is one row per AS for spreadsheets.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{Snapshot, SnapshotError};

impl Snapshot {
    /// File stem used for exports, e.g. `rib.20131101.1200`
    fn export_stem(&self) -> String {
        Path::new(self.source_id())
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_id().to_string())
    }

    /// Write `<stem>.json` into `destination_dir`
    pub fn export_json(&self, destination_dir: &Path) -> Result<PathBuf, SnapshotError> {
        fs::create_dir_all(destination_dir)?;
        let path = destination_dir.join(format!("{}.json", self.export_stem()));

        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, self)?;

        log::info!("Snapshot '{}' exported to {}", self.source_id(), path.display());
        Ok(path)
    }

    /// Load a snapshot written by `export_json`
    pub fn import_json(path: &Path) -> Result<Self, SnapshotError> {
        let reader = BufReader::new(File::open(path)?);
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        snapshot.validate()?;

        log::info!(
            "Imported snapshot '{}' with {} ASes",
            snapshot.source_id(),
            snapshot.len()
        );
        Ok(snapshot)
    }

    /// Write `<stem>.csv` into `destination_dir`
    pub fn export_csv(&self, destination_dir: &Path) -> Result<PathBuf, SnapshotError> {
        fs::create_dir_all(destination_dir)?;
        let path = destination_dir.join(format!("{}.csv", self.export_stem()));

        let mut file = BufWriter::new(File::create(&path)?);
        write_csv(&mut file, self)?;
        file.flush()?;

        log::info!("Snapshot '{}' exported to {}", self.source_id(), path.display());
        Ok(path)
    }
}

fn write_csv<W: Write>(out: &mut W, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    writeln!(
        out,
        "as_id,message_count,mid_path_count,end_path_count,mean_path_size,path_sizes,prefix_count,ipv4_count,ipv6_count,announced_prefixes,neighbours"
    )?;

    for (as_id, profile) in snapshot.profiles() {
        let path_sizes = serde_json::to_string(profile.path_lengths())?.replace('"', "\"\"");
        let prefixes: Vec<&str> = profile.announced_prefixes().iter().map(String::as_str).collect();
        let neighbours: Vec<String> = profile.neighbors().iter().map(|n| n.to_string()).collect();

        writeln!(
            out,
            "{},{},{},{},{:.4},\"{}\",{},{},{},{},{}",
            as_id,
            profile.message_count(),
            profile.mid_path_count(),
            profile.end_path_count(),
            profile.mean_path_length().unwrap_or(0.0),
            path_sizes,
            profile.prefix_count(),
            profile.ipv4_count(),
            profile.ipv6_count(),
            prefixes.join(";"),
            neighbours.join(";")
        )?;
    }

    Ok(())
}
