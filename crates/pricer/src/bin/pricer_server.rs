//! Pricer REST Server
//!
//! Loads the trained model and encoders, then serves price predictions over
//! HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use pricer::config::PricerConfig;
use pricer::server::startup::start_server;

#[derive(Parser)]
#[command(name = "pricer_server")]
#[command(about = "Product price prediction server")]
#[command(version)]
struct Args {
  /// Server bind address
  #[arg(long, env = "PRICER_BIND")]
  bind: Option<SocketAddr>,

  /// Directory holding the model and encoders
  #[arg(long, env = "PRICER_ARTIFACT_DIR")]
  artifact_dir: Option<PathBuf>,

  /// Config file (defaults to .pricer.json, pricer.json or .pricer/config.json)
  #[arg(long, env = "PRICER_CONFIG")]
  config: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  pricer::logging::init(args.verbose);

  let config = PricerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
  let bind = match args.bind {
    Some(bind) => bind,
    None => config.bind_addr()?,
  };
  let artifact_dir = args.artifact_dir.unwrap_or(config.artifact_dir);

  info!(version = env!("CARGO_PKG_VERSION"), %bind, "Starting Pricer REST Server");
  start_server(bind, &artifact_dir).await
}
