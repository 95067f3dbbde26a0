//! BGP Anomaly - Command line entry point

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use bgp_anomaly_core::constants::{APP_NAME, APP_VERSION};
use bgp_anomaly_core::logic::pipeline;
use bgp_anomaly_core::logic::scorer::export::export_verdicts;
use bgp_anomaly_core::logic::scorer::ExportFormat;
use bgp_anomaly_core::{BaselineModel, Config, Snapshot};

#[derive(Debug, Parser)]
#[command(name = "bgp-anomaly", version, about = "Learn per-AS BGP baselines and flag anomalous snapshots")]
struct Cli {
    /// Baseline model file (overrides BGP_MODEL_PATH)
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Stop each dump after N valid records (overrides BGP_MESSAGE_LIMIT)
    #[arg(long, global = true, value_parser = parse_limit)]
    limit: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build snapshots from dumps and export them
    Parse {
        inputs: Vec<PathBuf>,
        #[arg(long, default_value = "parsed")]
        out_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = SnapshotFormat::Json)]
        format: SnapshotFormat,
    },

    /// Fold snapshots into the baseline model
    Train {
        inputs: Vec<PathBuf>,
        /// Model name used when a new model is created
        #[arg(long, default_value = "default")]
        name: String,
        /// Discard previously learned statistics first
        #[arg(long)]
        reset: bool,
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Score a snapshot against the baseline model
    Predict {
        input: PathBuf,
        /// Write all verdicts here
        #[arg(long)]
        output: Option<PathBuf>,
        /// jsonl, csv or json
        #[arg(long, default_value = "jsonl")]
        format: ExportFormat,
        /// Flag |z| above this value (overrides BGP_Z_THRESHOLD)
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,
        /// Print unflagged verdicts too
        #[arg(long)]
        all: bool,
    },

    /// Dump the learned per-AS statistics
    Inspect {
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SnapshotFormat {
    Json,
    Csv,
}

fn parse_limit(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err("limit must be at least 1".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_threshold(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(z) if z.is_finite() && z > 0.0 => Ok(z),
        Ok(_) => Err("threshold must be a finite number above 0".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::info!("Starting {} v{}", APP_NAME, APP_VERSION);

    let mut config = Config::from_env();
    if let Some(path) = cli.model {
        config.model_path = path;
    }
    if let Some(limit) = cli.limit {
        config.snapshot.message_limit = Some(limit);
    }

    match cli.command {
        Command::Parse { inputs, out_dir, format } => parse(&config, &inputs, &out_dir, format),
        Command::Train { inputs, name, reset, workers } => {
            if let Some(workers) = workers {
                config.workers = workers;
            }
            train(&config, &inputs, &name, reset)
        }
        Command::Predict { input, output, format, threshold, all } => {
            if let Some(z) = threshold {
                config.scoring.z_threshold = z;
            }
            predict(&config, &input, output, format, all)
        }
        Command::Inspect { output, format } => inspect(&config, output, format),
    }
}

fn parse(config: &Config, inputs: &[PathBuf], out_dir: &Path, format: SnapshotFormat) -> Result<()> {
    if inputs.is_empty() {
        bail!("no input files given");
    }

    let (snapshots, failures) = pipeline::build_snapshots(inputs, &config.snapshot, config.workers);
    for snapshot in &snapshots {
        let path = match format {
            SnapshotFormat::Json => snapshot.export_json(out_dir),
            SnapshotFormat::Csv => snapshot.export_csv(out_dir),
        }
        .with_context(|| format!("exporting snapshot {}", snapshot.source_id()))?;

        println!("{} -> {} ({} ASes)", snapshot.source_id(), path.display(), snapshot.len());
    }

    if !failures.is_empty() {
        for failure in &failures {
            eprintln!("failed: {}", failure);
        }
        bail!("{} of {} inputs failed", failures.len(), inputs.len());
    }
    Ok(())
}

fn train(config: &Config, inputs: &[PathBuf], name: &str, reset: bool) -> Result<()> {
    if inputs.is_empty() {
        bail!("no input files given");
    }

    let mut model = BaselineModel::load_or_new(&config.model_path, name, config.scoring.clone())
        .with_context(|| format!("loading model {}", config.model_path.display()))?;
    if reset {
        model.reset();
    }

    let summary = pipeline::train_from_paths(&mut model, inputs, &config.snapshot, config.workers);
    for failure in &summary.failures {
        eprintln!("failed: {}", failure);
    }
    if !summary.is_complete() {
        bail!(
            "{} training workers failed, model not saved",
            summary.lost_workers
        );
    }
    if summary.trained == 0 && summary.empty == 0 {
        bail!("no input could be read");
    }

    model
        .save(&config.model_path)
        .with_context(|| format!("saving model {}", config.model_path.display()))?;

    println!("{}", model);
    println!(
        "trained {} snapshots ({} empty, {} failed)",
        summary.trained,
        summary.empty,
        summary.failures.len()
    );
    Ok(())
}

fn predict(
    config: &Config,
    input: &Path,
    output: Option<PathBuf>,
    format: ExportFormat,
    all: bool,
) -> Result<()> {
    let model = BaselineModel::load(&config.model_path, config.scoring.clone())
        .with_context(|| format!("loading model {}", config.model_path.display()))?;
    let snapshot = Snapshot::from_path(input, &config.snapshot)
        .with_context(|| format!("reading snapshot {}", input.display()))?;

    let (verdicts, report) = model.predict_report(&snapshot);

    for verdict in verdicts.iter().filter(|v| all || v.flagged) {
        println!("{}", verdict);
    }
    println!("{}", report);

    if let Some(path) = output {
        let written = export_verdicts(&verdicts, &path, format)
            .with_context(|| format!("writing verdicts to {}", path.display()))?;
        println!("{} verdicts written to {}", written, path.display());
    }
    Ok(())
}

fn inspect(config: &Config, output: Option<PathBuf>, format: ExportFormat) -> Result<()> {
    let model = BaselineModel::load(&config.model_path, config.scoring.clone())
        .with_context(|| format!("loading model {}", config.model_path.display()))?;

    println!("{}", model);
    println!("created {}", model.created_at.to_rfc3339());
    if let Some(at) = model.last_trained {
        println!("last trained {}", at.to_rfc3339());
    }

    match output {
        Some(path) => {
            let rows = model
                .export_summaries(&path, format)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("{} AS baselines written to {}", rows, path.display());
        }
        None => {
            for summary in model.summaries() {
                println!(
                    "AS{}: seen {}x, mean path {:.2}, mean prefixes {:.1}, {} neighbours",
                    summary.as_number,
                    summary.snapshots_seen,
                    summary.mean_path_length.unwrap_or(0.0),
                    summary.mean_prefix_count.unwrap_or(0.0),
                    summary.neighbor_count
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_must_be_positive() {
        let cli = Cli::try_parse_from(["bgp-anomaly", "--limit", "5", "parse", "rib.txt"]).unwrap();
        assert_eq!(cli.limit, Some(5));

        for bad in ["0", "-1", "many"] {
            assert!(Cli::try_parse_from(["bgp-anomaly", "--limit", bad, "parse", "rib.txt"]).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_threshold_must_be_finite_and_positive() {
        let cli = Cli::try_parse_from(["bgp-anomaly", "predict", "rib.txt", "--threshold", "2.5"]).unwrap();
        match cli.command {
            Command::Predict { threshold, .. } => assert_eq!(threshold, Some(2.5)),
            other => panic!("unexpected command {:?}", other),
        }

        for bad in ["0", "-3", "NaN", "inf", "high"] {
            assert!(
                Cli::try_parse_from(["bgp-anomaly", "predict", "rib.txt", "--threshold", bad]).is_err(),
                "{}",
                bad
            );
        }
    }
}
