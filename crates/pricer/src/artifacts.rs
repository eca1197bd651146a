//! Artifact bundle persistence
//!
//! A bundle is the fitted model plus the two label encoders it was trained
//! against. Each member is stored as its own JSON file under a fixed name in
//! the artifact directory. Nothing ties the three files together on disk;
//! keeping them from the same training run is up to whoever deploys them.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::encoder::{CategoryEncoder, LabelEncoder, VocabularyError};
use crate::forest::{ModelError, RandomForestRegressor, Regressor};
use crate::product::{feature_row, Product, FEATURE_COUNT};

pub const PRICE_MODEL: &str = "price_model";
pub const BRAND_ENCODER: &str = "brand_encoder";
pub const CATEGORY_ENCODER: &str = "category_encoder";
pub const ARTIFACT_NAMES: [&str; 3] = [PRICE_MODEL, BRAND_ENCODER, CATEGORY_ENCODER];

const EXTENSION: &str = "json";
const STAGING_SUFFIX: &str = "tmp";
const BACKUP_SUFFIX: &str = "bak";

#[derive(Error, Debug)]
pub enum ArtifactError {
  #[error("Artifact '{name}' not found at {}", path.display())]
  Missing { name: String, path: PathBuf },

  #[error("I/O error on {}: {source}", path.display())]
  Io { path: PathBuf, source: std::io::Error },

  #[error("Failed to serialize artifact '{name}': {source}")]
  Serialize { name: String, source: serde_json::Error },

  #[error("Artifact '{name}' is not readable: {source}")]
  Corrupt { name: String, source: serde_json::Error },

  #[error("Artifact '{name}' has an invalid vocabulary: {source}")]
  InvalidVocabulary { name: String, source: VocabularyError },

  #[error("Artifact 'price_model' is invalid: {0}")]
  InvalidModel(#[from] ModelError),

  #[error("Artifact 'price_model' expects {found} features, expected {expected}")]
  FeatureCount { expected: usize, found: usize },
}

/// Model and encoders from one training run.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
  pub model: RandomForestRegressor,
  pub brand_encoder: LabelEncoder,
  pub category_encoder: LabelEncoder,
}

/// A single priced product, with how its labels were encoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePrediction {
  pub price: f64,
  pub brand_code: usize,
  pub category_code: usize,
  pub brand_known: bool,
  pub category_known: bool,
}

impl ArtifactBundle {
  /// Encode a product's labels (unseen labels fall into each encoder's
  /// fallback bucket) and run the model on the resulting row.
  pub fn predict(&self, product: &Product) -> Result<PricePrediction, ModelError> {
    let brand_code = self.brand_encoder.encode(&product.brand);
    let category_code = self.category_encoder.encode(&product.category);
    let row = feature_row(brand_code, category_code, product.rating, product.reviews as f64, product.quantity);

    Ok(PricePrediction {
      price: self.model.predict_row(&row)?,
      brand_code,
      category_code,
      brand_known: brand_code != self.brand_encoder.unknown_code(),
      category_known: category_code != self.category_encoder.unknown_code(),
    })
  }
}

#[derive(Deserialize)]
struct StoredEncoder {
  classes: Vec<String>,
}

/// Directory holding the three bundle files.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
  dir: PathBuf,
}

impl ArtifactStore {
  pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// Location of a named artifact.
  pub fn path_for(&self, name: &str) -> PathBuf {
    self.dir.join(format!("{name}.{EXTENSION}"))
  }

  /// Persist all three members, or none of them.
  ///
  /// Everything is serialized and written to staging files first. Each final
  /// file is then moved aside and replaced; if any replacement fails, the
  /// ones already made are undone and the previous files put back.
  pub fn save(&self, bundle: &ArtifactBundle) -> Result<Vec<PathBuf>, ArtifactError> {
    let payloads = [
      (PRICE_MODEL, to_json(PRICE_MODEL, &bundle.model)?),
      (BRAND_ENCODER, to_json(BRAND_ENCODER, &bundle.brand_encoder)?),
      (CATEGORY_ENCODER, to_json(CATEGORY_ENCODER, &bundle.category_encoder)?),
    ];

    fs::create_dir_all(&self.dir).map_err(|source| ArtifactError::Io { path: self.dir.clone(), source })?;

    let mut staged = Vec::with_capacity(payloads.len());
    for (name, payload) in &payloads {
      let staging = sibling(&self.path_for(name), STAGING_SUFFIX);
      staged.push(staging.clone());
      if let Err(source) = fs::write(&staging, payload) {
        discard(&staged);
        return Err(ArtifactError::Io { path: staging, source });
      }
    }

    let mut commit = Commit::default();
    for (staging, (name, _)) in staged.iter().zip(payloads.iter()) {
      if let Err(e) = commit.replace(staging, &self.path_for(name)) {
        warn!(artifact = name, error = %e, "Rolling back partially saved artifact bundle");
        commit.roll_back();
        discard(&staged);
        return Err(e);
      }
      debug!(artifact = name, "Wrote artifact");
    }

    let written = commit.finish();
    info!(dir = %self.dir.display(), "Saved artifact bundle");
    Ok(written)
  }

  /// Load all three members. Any missing or unreadable file fails the load.
  pub fn load(&self) -> Result<ArtifactBundle, ArtifactError> {
    let model: RandomForestRegressor = self.read(PRICE_MODEL)?;
    model.validate()?;
    if model.n_features() != FEATURE_COUNT {
      return Err(ArtifactError::FeatureCount { expected: FEATURE_COUNT, found: model.n_features() });
    }

    let brand_encoder = self.read_encoder(BRAND_ENCODER)?;
    let category_encoder = self.read_encoder(CATEGORY_ENCODER)?;

    info!(
      dir = %self.dir.display(),
      trees = model.n_trees(),
      brands = brand_encoder.len(),
      categories = category_encoder.len(),
      "Loaded artifact bundle"
    );

    Ok(ArtifactBundle { model, brand_encoder, category_encoder })
  }

  fn read_encoder(&self, name: &str) -> Result<LabelEncoder, ArtifactError> {
    let stored: StoredEncoder = self.read(name)?;
    LabelEncoder::from_classes(stored.classes)
      .map_err(|source| ArtifactError::InvalidVocabulary { name: name.to_string(), source })
  }

  /// Trees nest one JSON level per split, so the parser's depth limit is lifted.
  fn read<T: DeserializeOwned>(&self, name: &str) -> Result<T, ArtifactError> {
    let path = self.path_for(name);
    if !path.is_file() {
      return Err(ArtifactError::Missing { name: name.to_string(), path });
    }
    let content = fs::read_to_string(&path).map_err(|source| ArtifactError::Io { path: path.clone(), source })?;

    let mut deserializer = serde_json::Deserializer::from_str(&content);
    deserializer.disable_recursion_limit();
    T::deserialize(&mut deserializer)
      .and_then(|value| deserializer.end().map(|()| value))
      .map_err(|source| ArtifactError::Corrupt { name: name.to_string(), source })
  }
}

/// Final files replaced so far in a save, each with the backup of what it
/// held before (`None` when there was nothing there).
#[derive(Default)]
struct Commit {
  replaced: Vec<(PathBuf, Option<PathBuf>)>,
}

impl Commit {
  fn replace(&mut self, staging: &Path, target: &Path) -> Result<(), ArtifactError> {
    let backup = if target.is_file() {
      let backup = sibling(target, BACKUP_SUFFIX);
      fs::rename(target, &backup).map_err(|source| ArtifactError::Io { path: target.to_path_buf(), source })?;
      Some(backup)
    } else {
      None
    };

    if let Err(source) = fs::rename(staging, target) {
      if let Some(backup) = &backup {
        restore(backup, target);
      }
      return Err(ArtifactError::Io { path: target.to_path_buf(), source });
    }

    self.replaced.push((target.to_path_buf(), backup));
    Ok(())
  }

  fn roll_back(self) {
    for (target, backup) in self.replaced.into_iter().rev() {
      match backup {
        Some(backup) => restore(&backup, &target),
        None => discard(&[target]),
      }
    }
  }

  fn finish(self) -> Vec<PathBuf> {
    let backups: Vec<PathBuf> = self.replaced.iter().filter_map(|(_, backup)| backup.clone()).collect();
    discard(&backups);
    self.replaced.into_iter().map(|(target, _)| target).collect()
  }
}

/// `price_model.json` -> `price_model.json.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
  path.with_extension(format!("{EXTENSION}.{suffix}"))
}

fn to_json<T: serde::Serialize>(name: &str, value: &T) -> Result<String, ArtifactError> {
  serde_json::to_string(value).map_err(|source| ArtifactError::Serialize { name: name.to_string(), source })
}

fn restore(backup: &Path, target: &Path) {
  if let Err(e) = fs::rename(backup, target) {
    warn!(backup = %backup.display(), target = %target.display(), error = %e, "Failed to restore artifact");
  }
}

/// Remove leftover files; ones already gone are fine.
fn discard(paths: &[PathBuf]) {
  for path in paths {
    match fs::remove_file(path) {
      Err(e) if e.kind() != ErrorKind::NotFound => {
        warn!(path = %path.display(), error = %e, "Failed to remove leftover file");
      }
      _ => {}
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::forest::ForestParams;
  use tempfile::TempDir;

  fn bundle_with(n_estimators: usize, brands: &[&str]) -> ArtifactBundle {
    let x: Vec<Vec<f64>> = (0..6).map(|i| feature_row(i % 2, i % 3, 4.0, i as f64, 1.0)).collect();
    let y: Vec<f64> = (0..6).map(|i| 10.0 + i as f64).collect();
    let params = ForestParams { n_estimators, ..ForestParams::default() };

    ArtifactBundle {
      model: RandomForestRegressor::fit(&x, &y, &params).unwrap(),
      brand_encoder: LabelEncoder::fit(brands),
      category_encoder: LabelEncoder::fit(&["Garden", "Tools", "Toys"]),
    }
  }

  fn sample_bundle() -> ArtifactBundle {
    bundle_with(4, &["Acme", "Globex"])
  }

  fn product(brand: &str) -> Product {
    Product { brand: brand.into(), category: "Tools".into(), rating: 4.0, reviews: 3, quantity: 1.0 }
  }

  fn contents(store: &ArtifactStore) -> Vec<String> {
    ARTIFACT_NAMES.iter().map(|name| fs::read_to_string(store.path_for(name)).unwrap_or_default()).collect()
  }

  fn leftovers(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
      .unwrap()
      .filter_map(|entry| entry.ok())
      .map(|entry| entry.path())
      .filter(|path| {
        let name = path.to_string_lossy();
        name.ends_with(".tmp") || name.ends_with(".bak")
      })
      .collect()
  }

  #[test]
  fn test_save_then_load_preserves_bundle() {
    let temp = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp.path().join("models"));
    let bundle = sample_bundle();

    let written = store.save(&bundle).unwrap();
    assert_eq!(written.len(), 3);
    assert!(store.path_for(PRICE_MODEL).is_file());

    let loaded = store.load().unwrap();
    assert_eq!(loaded.brand_encoder, bundle.brand_encoder);
    assert_eq!(loaded.category_encoder, bundle.category_encoder);
    assert_eq!(loaded.model.n_trees(), 4);
    assert_eq!(loaded.brand_encoder.encode("Globex"), 1);
    assert_eq!(loaded.predict(&product("Acme")).unwrap(), bundle.predict(&product("Acme")).unwrap());
  }

  #[test]
  fn test_save_leaves_no_staging_or_backup_files() {
    let temp = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp.path());
    store.save(&sample_bundle()).unwrap();
    store.save(&bundle_with(3, &["Initech"])).unwrap();

    assert!(leftovers(temp.path()).is_empty());
    assert_eq!(store.load().unwrap().brand_encoder.classes(), &["Initech"]);
  }

  #[test]
  fn test_failed_replace_restores_previous_bundle() {
    let temp = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp.path());
    store.save(&sample_bundle()).unwrap();
    let before = contents(&store);

    // A directory where the last file goes makes its final rename fail.
    fs::remove_file(store.path_for(CATEGORY_ENCODER)).unwrap();
    fs::create_dir(store.path_for(CATEGORY_ENCODER)).unwrap();

    let result = store.save(&bundle_with(3, &["Initech"]));

    assert!(matches!(result, Err(ArtifactError::Io { .. })));
    let after = contents(&store);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[1], before[1]);
    assert!(store.path_for(CATEGORY_ENCODER).is_dir());
    assert!(leftovers(temp.path()).is_empty());
  }

  #[test]
  fn test_load_fails_when_any_artifact_is_missing() {
    for name in ARTIFACT_NAMES {
      let temp = TempDir::new().unwrap();
      let store = ArtifactStore::new(temp.path());
      store.save(&sample_bundle()).unwrap();
      fs::remove_file(store.path_for(name)).unwrap();

      match store.load() {
        Err(ArtifactError::Missing { name: missing, .. }) => assert_eq!(missing, name),
        other => panic!("expected missing {name}, got {other:?}"),
      }
    }
  }

  #[test]
  fn test_load_rejects_corrupt_and_unsorted_encoders() {
    let temp = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp.path());
    store.save(&sample_bundle()).unwrap();

    fs::write(store.path_for(BRAND_ENCODER), "not json").unwrap();
    assert!(matches!(store.load(), Err(ArtifactError::Corrupt { .. })));

    fs::write(store.path_for(BRAND_ENCODER), r#"{"classes":["Globex","Acme"]}"#).unwrap();
    assert!(matches!(store.load(), Err(ArtifactError::InvalidVocabulary { .. })));
  }

  #[test]
  fn test_load_rejects_model_with_wrong_width() {
    let temp = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp.path());
    let x = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
    let model = RandomForestRegressor::fit(&x, &[1.0, 2.0], &ForestParams { n_estimators: 2, ..ForestParams::default() })
      .unwrap();
    store.save(&ArtifactBundle { model, ..sample_bundle() }).unwrap();

    assert!(matches!(store.load(), Err(ArtifactError::FeatureCount { expected: 5, found: 2 })));
  }

  #[test]
  fn test_predict_flags_fallback_labels() {
    let bundle = sample_bundle();

    let known = bundle.predict(&product("Acme")).unwrap();
    assert!(known.brand_known && known.category_known);
    assert_eq!(known.category_code, 1);

    let unseen = bundle.predict(&product("Zzzyx")).unwrap();
    assert!(!unseen.brand_known);
    assert_eq!(unseen.brand_code, 2);
    assert!(unseen.price.is_finite());
    assert_eq!(bundle.brand_encoder.len(), 2);
  }
}
