//! Configuration for the trainer and the server
//!
//! Values come from an optional JSON file; any field the file leaves out
//! takes its default. Command-line flags are applied on top by the binaries.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::forest::ForestParams;

/// Files searched, in order, when no explicit config path is given.
pub const CONFIG_FILES: [&str; 3] = [".pricer.json", "pricer.json", ".pricer/config.json"];

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to read config {}: {source}", path.display())]
  Io { path: PathBuf, source: std::io::Error },

  #[error("Invalid config {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_json::Error },

  #[error("Invalid bind address '{value}'")]
  InvalidBind { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricerConfig {
  /// Where the model and encoders are written and read
  #[serde(default = "default_artifact_dir")]
  pub artifact_dir: PathBuf,
  /// Training CSV
  #[serde(default = "default_data_path")]
  pub data_path: PathBuf,
  /// Server listen address
  #[serde(default = "default_bind")]
  pub bind: String,
  #[serde(default)]
  pub forest: ForestParams,
}

fn default_artifact_dir() -> PathBuf {
  PathBuf::from("models")
}
fn default_data_path() -> PathBuf {
  PathBuf::from("data/train_products.csv")
}
fn default_bind() -> String {
  "127.0.0.1:8000".to_string()
}

impl Default for PricerConfig {
  fn default() -> Self {
    Self {
      artifact_dir: default_artifact_dir(),
      data_path: default_data_path(),
      bind: default_bind(),
      forest: ForestParams::default(),
    }
  }
}

impl PricerConfig {
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content =
      std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
  }

  /// Load `explicit` if given, otherwise the first config file found in the
  /// working directory, otherwise defaults.
  pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    match explicit {
      Some(path) => Self::load_from_file(path),
      None => Self::discover_in(Path::new(".")),
    }
  }

  /// Search `dir` for one of [`CONFIG_FILES`].
  pub fn discover_in(dir: &Path) -> Result<Self, ConfigError> {
    for name in CONFIG_FILES {
      let candidate = dir.join(name);
      if candidate.is_file() {
        debug!(path = %candidate.display(), "Using config file");
        return Self::load_from_file(candidate);
      }
    }

    debug!("No config file found, using defaults");
    Ok(Self::default())
  }

  pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let content =
      serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
  }

  pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
    self.bind.parse().map_err(|_| ConfigError::InvalidBind { value: self.bind.clone() })
  }
}
