//! Offline training pipeline
//!
//! Read, clean, encode, split, fit, evaluate, persist. Every step before
//! persisting is pure, so a failure anywhere leaves the artifact directory
//! untouched.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::artifacts::{ArtifactBundle, ArtifactError, ArtifactStore};
use crate::dataset::{self, CleanProduct, DatasetError};
use crate::encoder::{CategoryEncoder, LabelEncoder};
use crate::forest::{ForestParams, ModelError, RandomForestRegressor, Regressor};
use crate::product::feature_row;

/// Share of rows held out for evaluation.
pub const TEST_FRACTION: f64 = 0.2;

#[derive(Error, Debug)]
pub enum TrainingError {
  #[error(transparent)]
  Dataset(#[from] DatasetError),

  #[error("Model fitting failed: {0}")]
  Model(#[from] ModelError),

  #[error(transparent)]
  Artifact(#[from] ArtifactError),

  #[error("{rows} rows are too few to hold out an evaluation set")]
  TooFewRows { rows: usize },
}

/// Row indices of the two partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
  pub train: Vec<usize>,
  pub test: Vec<usize>,
}

/// Shuffle `0..rows` with a seeded generator and hold out
/// `ceil(rows * test_fraction)` of them.
pub fn train_test_split(rows: usize, test_fraction: f64, seed: u64) -> Result<Split, TrainingError> {
  let n_test = (rows as f64 * test_fraction).ceil() as usize;
  if n_test == 0 || n_test >= rows {
    return Err(TrainingError::TooFewRows { rows });
  }

  let mut indices: Vec<usize> = (0..rows).collect();
  let mut rng = StdRng::seed_from_u64(seed);
  indices.shuffle(&mut rng);

  let train = indices.split_off(n_test);
  Ok(Split { train, test: indices })
}

/// Cleaned rows turned into model inputs, with the encoders that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedDataset {
  pub features: Vec<Vec<f64>>,
  pub targets: Vec<f64>,
  pub brand_encoder: LabelEncoder,
  pub category_encoder: LabelEncoder,
}

impl EncodedDataset {
  /// Fit one encoder per categorical column over every row, then encode.
  pub fn from_rows(rows: &[CleanProduct]) -> Self {
    let brands: Vec<&str> = rows.iter().map(|row| row.brand.as_str()).collect();
    let categories: Vec<&str> = rows.iter().map(|row| row.category.as_str()).collect();

    let brand_encoder = LabelEncoder::fit(&brands);
    let category_encoder = LabelEncoder::fit(&categories);
    let brand_codes = brand_encoder.encode_all(&brands);
    let category_codes = category_encoder.encode_all(&categories);

    let features = rows
      .iter()
      .zip(brand_codes.iter().zip(&category_codes))
      .map(|(row, (&brand, &category))| feature_row(brand, category, row.rating, row.reviews, row.quantity))
      .collect();

    Self { features, targets: rows.iter().map(|row| row.price).collect(), brand_encoder, category_encoder }
  }

  fn select(&self, indices: &[usize]) -> (Vec<Vec<f64>>, Vec<f64>) {
    indices.iter().map(|&i| (self.features[i].clone(), self.targets[i])).unzip()
  }
}

/// Held-out error of the fitted model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
  pub samples: usize,
  pub mse: f64,
  pub rmse: f64,
}

pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
  if actual.is_empty() {
    return 0.0;
  }
  let total: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p) * (a - p)).sum();
  total / actual.len() as f64
}

pub fn evaluate<R: Regressor>(model: &R, features: &[Vec<f64>], targets: &[f64]) -> Result<Evaluation, ModelError> {
  let predictions = model.predict(features)?;
  let mse = mean_squared_error(targets, &predictions);
  Ok(Evaluation { samples: targets.len(), mse, rmse: mse.sqrt() })
}

/// Everything a training run produces before it is persisted.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
  pub bundle: ArtifactBundle,
  pub split: Split,
  pub evaluation: Evaluation,
}

/// Encode, split, fit and evaluate. Does not touch the filesystem.
pub fn fit(rows: &[CleanProduct], params: &ForestParams) -> Result<TrainingOutcome, TrainingError> {
  if rows.is_empty() {
    return Err(DatasetError::Empty.into());
  }

  let encoded = EncodedDataset::from_rows(rows);
  let split = train_test_split(rows.len(), TEST_FRACTION, params.seed)?;
  let (train_x, train_y) = encoded.select(&split.train);
  let (test_x, test_y) = encoded.select(&split.test);

  info!(
    train_rows = split.train.len(),
    test_rows = split.test.len(),
    brands = encoded.brand_encoder.len(),
    categories = encoded.category_encoder.len(),
    trees = params.n_estimators,
    "Fitting price model"
  );

  let model = RandomForestRegressor::fit(&train_x, &train_y, params)?;
  let evaluation = evaluate(&model, &test_x, &test_y)?;
  info!(mse = evaluation.mse, rmse = evaluation.rmse, samples = evaluation.samples, "Evaluated on held-out rows");

  Ok(TrainingOutcome {
    bundle: ArtifactBundle {
      model,
      brand_encoder: encoded.brand_encoder,
      category_encoder: encoded.category_encoder,
    },
    split,
    evaluation,
  })
}

/// Summary of a completed training run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
  pub rows: usize,
  pub train_rows: usize,
  pub test_rows: usize,
  pub brands: usize,
  pub categories: usize,
  pub evaluation: Evaluation,
  pub artifacts: Vec<PathBuf>,
}

/// Full pipeline: read the CSV at `data_path`, train, and save the bundle.
pub fn run(data_path: &Path, store: &ArtifactStore, params: &ForestParams) -> Result<TrainingReport, TrainingError> {
  let raw = dataset::read_csv(data_path)?;
  let cleaned = dataset::clean(&raw);
  let outcome = fit(&cleaned, params)?;
  let artifacts = store.save(&outcome.bundle)?;

  Ok(TrainingReport {
    rows: cleaned.len(),
    train_rows: outcome.split.train.len(),
    test_rows: outcome.split.test.len(),
    brands: outcome.bundle.brand_encoder.len(),
    categories: outcome.bundle.category_encoder.len(),
    evaluation: outcome.evaluation,
    artifacts,
  })
}
