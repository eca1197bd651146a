//! Pricer Trainer
//!
//! Fits the price model on a CSV of product listings and writes the model and
//! its label encoders to the artifact directory.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::PathBuf;

use pricer::artifacts::ArtifactStore;
use pricer::config::PricerConfig;
use pricer::training::{self, TrainingReport};

#[derive(Parser)]
#[command(name = "pricer_train")]
#[command(about = "Train the product price model")]
#[command(version)]
struct Args {
  /// Training data CSV
  #[arg(long, env = "PRICER_DATA")]
  data: Option<PathBuf>,

  /// Directory to write the model and encoders into
  #[arg(long, env = "PRICER_ARTIFACT_DIR")]
  artifact_dir: Option<PathBuf>,

  /// Config file (defaults to .pricer.json, pricer.json or .pricer/config.json)
  #[arg(long, env = "PRICER_CONFIG")]
  config: Option<PathBuf>,

  /// Number of trees in the forest
  #[arg(long)]
  n_estimators: Option<usize>,

  /// Seed for the evaluation split and bootstrap sampling
  #[arg(long)]
  seed: Option<u64>,

  /// Maximum tree depth (unlimited when omitted)
  #[arg(long)]
  max_depth: Option<usize>,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

fn main() -> Result<()> {
  let args = Args::parse();
  pricer::logging::init(args.verbose);

  let mut config = PricerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
  if let Some(data) = args.data {
    config.data_path = data;
  }
  if let Some(dir) = args.artifact_dir {
    config.artifact_dir = dir;
  }
  if let Some(n_estimators) = args.n_estimators {
    config.forest.n_estimators = n_estimators;
  }
  if let Some(seed) = args.seed {
    config.forest.seed = seed;
  }
  if args.max_depth.is_some() {
    config.forest.max_depth = args.max_depth;
  }

  let store = ArtifactStore::new(&config.artifact_dir);
  let report = training::run(&config.data_path, &store, &config.forest)
    .with_context(|| format!("Training on {} failed", config.data_path.display()))?;

  print_report(&report, &store);
  Ok(())
}

fn print_report(report: &TrainingReport, store: &ArtifactStore) {
  println!("{}", "Price model trained".green().bold());
  println!("  Rows:        {} ({} train, {} test)", report.rows, report.train_rows, report.test_rows);
  println!("  Brands:      {}", report.brands.to_string().cyan());
  println!("  Categories:  {}", report.categories.to_string().cyan());
  println!("Test MSE: {}", format!("{:.4}", report.evaluation.mse).yellow());
  println!("Test RMSE: {}", format!("{:.4}", report.evaluation.rmse).yellow());
  println!("{} Saved {} artifacts to {}", "✓".green(), report.artifacts.len(), store.dir().display());
  for path in &report.artifacts {
    println!("  {}", path.display().to_string().dimmed());
  }
}
