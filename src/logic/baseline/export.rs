//! Baseline Exporter
//!
//! Dumps the learned per-AS statistics for inspection. This is a one-way
//! view: the checksummed envelope written by `storage` is the only format
//! that can be loaded back.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::types::AsSummary;
use super::BaselineModel;
use crate::logic::scorer::export::ExportFormat;

impl BaselineModel {
    /// Export one summary row per AS. Returns the number of rows written.
    pub fn export_summaries(&self, destination: &Path, format: ExportFormat) -> std::io::Result<usize> {
        let summaries = self.summaries();
        let mut file = BufWriter::new(File::create(destination)?);

        match format {
            ExportFormat::Jsonl => {
                for summary in &summaries {
                    writeln!(file, "{}", serde_json::to_string(summary)?)?;
                }
            }
            ExportFormat::JsonArray => {
                serde_json::to_writer_pretty(&mut file, &summaries)?;
            }
            ExportFormat::Csv => {
                write_csv(&mut file, &summaries)?;
            }
        }

        file.flush()?;
        log::info!(
            "Exported {} AS baselines of model '{}' to {}",
            summaries.len(),
            self.name,
            destination.display()
        );
        Ok(summaries.len())
    }
}

fn write_csv<W: Write>(out: &mut W, summaries: &[AsSummary]) -> std::io::Result<()> {
    // Header
    writeln!(
        out,
        "as_number,snapshots_seen,path_observations,mean_path_length,path_length_std_dev,learned_mean_path,learned_mean_path_std_dev,mean_prefix_count,prefix_count_std_dev,mean_message_count,neighbor_count,neighbors,mean_times_seen,mean_mid_path_count,mean_end_path_count,mean_ipv4_count,mean_ipv6_count,mean_neighbor_count,neighbor_count_std_dev,announced_prefix_count"
    )?;

    let fmt = |v: Option<f64>| v.map(|x| format!("{:.4}", x)).unwrap_or_default();

    for s in summaries {
        let neighbors: Vec<String> = s.neighbors.iter().map(|n| n.to_string()).collect();
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            s.as_number,
            s.snapshots_seen,
            s.path_observations,
            fmt(s.mean_path_length),
            fmt(s.path_length_std_dev),
            fmt(s.learned_mean_path),
            fmt(s.learned_mean_path_std_dev),
            fmt(s.mean_prefix_count),
            fmt(s.prefix_count_std_dev),
            fmt(s.mean_message_count),
            s.neighbor_count,
            neighbors.join(";"),
            fmt(s.mean_times_seen),
            fmt(s.mean_mid_path_count),
            fmt(s.mean_end_path_count),
            fmt(s.mean_ipv4_count),
            fmt(s.mean_ipv6_count),
            fmt(s.mean_neighbor_count),
            fmt(s.neighbor_count_std_dev),
            s.announced_prefixes.len()
        )?;
    }

    Ok(())
}
