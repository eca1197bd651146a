//! Shared server state

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::artifacts::{ArtifactBundle, ArtifactError, ArtifactStore};

/// Immutable context handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
  pub bundle: Arc<ArtifactBundle>,
  pub artifact_dir: PathBuf,
  pub loaded_at: DateTime<Utc>,
}

impl AppState {
  pub fn new(bundle: ArtifactBundle, artifact_dir: impl Into<PathBuf>) -> Self {
    Self { bundle: Arc::new(bundle), artifact_dir: artifact_dir.into(), loaded_at: Utc::now() }
  }

  /// Load every artifact from `dir`; fails if any of them is missing or unreadable.
  pub fn load(dir: &Path) -> Result<Self, ArtifactError> {
    let bundle = ArtifactStore::new(dir).load()?;
    Ok(Self::new(bundle, dir))
  }
}
