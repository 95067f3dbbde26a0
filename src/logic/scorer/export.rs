//! Verdict Exporter
//!
//! Writes prediction results for offline analysis.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use super::types::AnomalyVerdict;

// ============================================================================
// EXPORT FORMATS
// ============================================================================

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// JSONL (default, one JSON per line)
    #[default]
    Jsonl,
    /// CSV for spreadsheet analysis
    Csv,
    /// Pretty JSON array
    JsonArray,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Jsonl => "jsonl",
            ExportFormat::Csv => "csv",
            ExportFormat::JsonArray => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jsonl" => Ok(ExportFormat::Jsonl),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::JsonArray),
            other => Err(format!("unknown export format '{}' (jsonl, csv, json)", other)),
        }
    }
}

// ============================================================================
// EXPORT FUNCTIONS
// ============================================================================

/// Export verdicts to file. Returns the number of verdicts written.
pub fn export_verdicts(
    verdicts: &[AnomalyVerdict],
    destination: &Path,
    format: ExportFormat,
) -> std::io::Result<usize> {
    let mut file = BufWriter::new(File::create(destination)?);

    match format {
        ExportFormat::Jsonl => {
            for verdict in verdicts {
                writeln!(file, "{}", serde_json::to_string(verdict)?)?;
            }
        }
        ExportFormat::JsonArray => {
            serde_json::to_writer_pretty(&mut file, verdicts)?;
        }
        ExportFormat::Csv => {
            export_csv(&mut file, verdicts)?;
        }
    }

    file.flush()?;
    Ok(verdicts.len())
}

/// Export to CSV format
fn export_csv<W: Write>(out: &mut W, verdicts: &[AnomalyVerdict]) -> std::io::Result<()> {
    // Header
    writeln!(
        out,
        "as_number,reason,flagged,deviation_score,neighbor,observed,expected,severity"
    )?;

    let opt = |v: Option<f64>| v.map(|x| format!("{:.4}", x)).unwrap_or_default();

    for v in verdicts {
        // Sentinel is written as "inf" so spreadsheets do not choke on 1.8e308
        let score = match v.deviation_score {
            Some(s) if s == f64::MAX => "inf".to_string(),
            other => opt(other),
        };

        writeln!(
            out,
            "{},{},{},{},{},{},{},{:.1}",
            v.as_number,
            v.reason.as_str(),
            v.flagged,
            score,
            v.neighbor.map(|n| n.to_string()).unwrap_or_default(),
            opt(v.observed),
            opt(v.expected),
            v.severity()
        )?;
    }

    Ok(())
}

/// Read verdicts back from a JSONL export
pub fn read_verdicts(source: &Path) -> std::io::Result<Vec<AnomalyVerdict>> {
    let reader = BufReader::new(File::open(source)?);
    let mut verdicts = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        verdicts.push(serde_json::from_str(&line)?);
    }

    Ok(verdicts)
}
