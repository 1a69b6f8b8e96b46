//! describe - offline frame description
//!
//! Reads detections from a JSON file (`[{"box": [x1, y1, x2, y2], "label": ..., "score": ...}]`),
//! runs them through the analysis stages and prints the result and utterance.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use grocersee::{Detection, Pipeline, PipelineConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Detections JSON file.
    #[arg(long)]
    detections: PathBuf,
    /// Print the full frame report as JSON.
    #[arg(long)]
    json: bool,
    /// Seed for centroid initialisation.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = PipelineConfig::load()?;
    let mut pipeline = Pipeline::new(&cfg, args.seed)?;

    let raw = std::fs::read_to_string(&args.detections)
        .with_context(|| format!("failed to read {}", args.detections.display()))?;
    let detections: Vec<Detection> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid detections file {}", args.detections.display()))?;
    log::debug!("loaded {} detections", detections.len());

    let report = pipeline.report(detections.len(), detections);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("result: {}", report.result.tag());
        println!("utterance: {}", report.utterance);
    }
    Ok(())
}
