//! Random forest regression
//!
//! Adapter over `aprender`'s bagged CART forest. Rows are handed over in its
//! `f32` matrix form; the fitted forest is stored together with the
//! parameters and feature count it was fitted with, so a reloaded model can
//! be checked against the rows it will be asked to score.

use aprender::primitives::{Matrix, Vector};
use aprender::tree::RandomForestRegressor as CartForest;
use aprender::AprenderError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Capability the prediction path needs from a fitted model.
pub trait Regressor {
  /// Number of features each row must carry.
  fn n_features(&self) -> usize;

  /// Predict a batch of rows, in order.
  fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError>;

  fn predict_row(&self, row: &[f64]) -> Result<f64, ModelError> {
    let predictions = self.predict(&[row.to_vec()])?;
    predictions.first().copied().ok_or(ModelError::NotFitted)
  }
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("Cannot fit with zero samples")]
  EmptyTrainingSet,

  #[error("Feature matrix has {rows} rows but target has {targets} values")]
  ShapeMismatch { rows: usize, targets: usize },

  #[error("Row {row} has {found} features, expected {expected}")]
  RaggedFeatures { row: usize, expected: usize, found: usize },

  #[error("Row {row} holds a value that is not a finite number")]
  NonFinite { row: usize },

  #[error("A forest needs at least one tree")]
  NoEstimators,

  #[error("Seed {seed} is too large for {n_estimators} trees")]
  SeedOverflow { seed: u64, n_estimators: usize },

  #[error("Forest has not been fitted")]
  NotFitted,

  #[error("Forest was fitted on {found} features but records {expected}")]
  FeatureMismatch { expected: usize, found: usize },

  #[error("Forest fitting failed: {0}")]
  Fit(#[from] AprenderError),
}

fn default_n_estimators() -> usize {
  200
}
fn default_seed() -> u64 {
  42
}

/// Hyperparameters for [`RandomForestRegressor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
  #[serde(default = "default_n_estimators")]
  pub n_estimators: usize,
  /// Seeds bootstrap sampling (and, in training, the evaluation split).
  #[serde(default = "default_seed")]
  pub seed: u64,
  /// `None` grows every tree until its leaves are pure.
  #[serde(default)]
  pub max_depth: Option<usize>,
}

impl Default for ForestParams {
  fn default() -> Self {
    Self { n_estimators: default_n_estimators(), seed: default_seed(), max_depth: None }
  }
}

/// Bagged ensemble of regression trees; predicts the mean of its trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
  params: ForestParams,
  n_features: usize,
  forest: CartForest,
}

impl RandomForestRegressor {
  pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams) -> Result<Self, ModelError> {
    if params.n_estimators == 0 {
      return Err(ModelError::NoEstimators);
    }
    // Tree `i` is seeded with `seed + i`.
    if params.seed.checked_add(params.n_estimators as u64).is_none() {
      return Err(ModelError::SeedOverflow { seed: params.seed, n_estimators: params.n_estimators });
    }

    let n_features = check_shape(x, y)?;
    let matrix = to_matrix(x, n_features)?;
    let targets: Vec<f32> = y.iter().map(|&value| value as f32).collect();
    if let Some(row) = targets.iter().position(|value| !value.is_finite()) {
      return Err(ModelError::NonFinite { row });
    }

    let mut forest = CartForest::new(params.n_estimators).with_random_state(params.seed);
    if let Some(depth) = params.max_depth {
      forest = forest.with_max_depth(depth);
    }
    forest.fit(&matrix, &Vector::from_slice(&targets))?;

    debug!(trees = params.n_estimators, samples = x.len(), features = n_features, "Fitted random forest");
    Ok(Self { params: params.clone(), n_features, forest })
  }

  pub fn params(&self) -> &ForestParams {
    &self.params
  }

  pub fn n_trees(&self) -> usize {
    self.params.n_estimators
  }

  /// Verify a forest that was deserialized rather than fitted.
  pub fn validate(&self) -> Result<(), ModelError> {
    if self.params.n_estimators == 0 {
      return Err(ModelError::NoEstimators);
    }
    let fitted = self.forest.feature_importances().ok_or(ModelError::NotFitted)?;
    if fitted.len() != self.n_features {
      return Err(ModelError::FeatureMismatch { expected: self.n_features, found: fitted.len() });
    }
    Ok(())
  }
}

impl Regressor for RandomForestRegressor {
  fn n_features(&self) -> usize {
    self.n_features
  }

  fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
    if rows.is_empty() {
      return Ok(Vec::new());
    }
    if let Some((row, found)) = rows.iter().map(Vec::len).enumerate().find(|&(_, len)| len != self.n_features) {
      return Err(ModelError::RaggedFeatures { row, expected: self.n_features, found });
    }

    let matrix = to_matrix(rows, self.n_features)?;
    Ok(self.forest.predict(&matrix).as_slice().iter().map(|&value| f64::from(value)).collect())
  }
}

/// Returns the feature count shared by every row.
fn check_shape(x: &[Vec<f64>], y: &[f64]) -> Result<usize, ModelError> {
  if x.len() != y.len() {
    return Err(ModelError::ShapeMismatch { rows: x.len(), targets: y.len() });
  }
  let first = x.first().ok_or(ModelError::EmptyTrainingSet)?;
  let expected = first.len();
  if let Some((row, found)) = x.iter().map(Vec::len).enumerate().find(|&(_, len)| len != expected) {
    return Err(ModelError::RaggedFeatures { row, expected, found });
  }
  Ok(expected)
}

/// Row-major `f32` matrix; rows must already share `n_features` columns.
fn to_matrix(rows: &[Vec<f64>], n_features: usize) -> Result<Matrix<f32>, ModelError> {
  let mut data = Vec::with_capacity(rows.len() * n_features);
  for (index, row) in rows.iter().enumerate() {
    for &value in row {
      let value = value as f32;
      if !value.is_finite() {
        return Err(ModelError::NonFinite { row: index });
      }
      data.push(value);
    }
  }
  Matrix::from_vec(rows.len(), n_features, data).map_err(|message| ModelError::Fit(message.into()))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
    let x = (0..8).map(|i| vec![i as f64, (i % 2) as f64]).collect();
    let y = (0..8).map(|i| if i < 4 { 10.0 } else { 50.0 }).collect();
    (x, y)
  }

  fn params(n_estimators: usize) -> ForestParams {
    ForestParams { n_estimators, ..ForestParams::default() }
  }

  #[test]
  fn test_forest_learns_step_function() {
    let (x, y) = step_data();
    let forest = RandomForestRegressor::fit(&x, &y, &params(30)).unwrap();

    let predictions = forest.predict(&x).unwrap();
    assert_eq!(predictions.len(), 8);
    for prediction in &predictions {
      assert!((10.0..=50.0).contains(prediction));
    }
    assert!(forest.predict_row(&[0.0, 0.0]).unwrap() < forest.predict_row(&[7.0, 1.0]).unwrap());
  }

  #[test]
  fn test_constant_target_predicts_constant() {
    let x = vec![vec![1.0], vec![2.0], vec![3.0]];
    let y = vec![7.0, 7.0, 7.0];
    let forest = RandomForestRegressor::fit(&x, &y, &params(5)).unwrap();
    assert!((forest.predict_row(&[100.0]).unwrap() - 7.0).abs() < 1e-6);
  }

  #[test]
  fn test_shape_errors() {
    let empty: Vec<Vec<f64>> = Vec::new();
    assert!(matches!(RandomForestRegressor::fit(&empty, &[], &params(5)), Err(ModelError::EmptyTrainingSet)));

    let x = vec![vec![1.0, 2.0], vec![3.0]];
    assert!(matches!(
      RandomForestRegressor::fit(&x, &[1.0, 2.0], &params(5)),
      Err(ModelError::RaggedFeatures { row: 1, expected: 2, found: 1 })
    ));
    assert!(matches!(
      RandomForestRegressor::fit(&x, &[1.0], &params(5)),
      Err(ModelError::ShapeMismatch { rows: 2, targets: 1 })
    ));
    assert!(matches!(RandomForestRegressor::fit(&[vec![1.0]], &[1.0], &params(0)), Err(ModelError::NoEstimators)));
  }

  #[test]
  fn test_non_finite_values_are_rejected() {
    let x = vec![vec![1.0], vec![2.0]];
    assert!(matches!(
      RandomForestRegressor::fit(&x, &[1.0, f64::INFINITY], &params(5)),
      Err(ModelError::NonFinite { row: 1 })
    ));

    let x = vec![vec![f64::NAN], vec![2.0]];
    assert!(matches!(RandomForestRegressor::fit(&x, &[1.0, 2.0], &params(5)), Err(ModelError::NonFinite { row: 0 })));
  }

  #[test]
  fn test_seed_overflow_is_rejected() {
    let params = ForestParams { n_estimators: 3, seed: u64::MAX - 1, max_depth: None };
    assert!(matches!(
      RandomForestRegressor::fit(&[vec![1.0]], &[1.0], &params),
      Err(ModelError::SeedOverflow { n_estimators: 3, .. })
    ));
  }

  #[test]
  fn test_forest_is_deterministic_for_a_seed() {
    let (x, y) = step_data();

    let first = RandomForestRegressor::fit(&x, &y, &params(25)).unwrap();
    let second = RandomForestRegressor::fit(&x, &y, &params(25)).unwrap();

    assert_eq!(first.n_trees(), 25);
    assert_eq!(first.predict(&x).unwrap(), second.predict(&x).unwrap());
    assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
  }

  #[test]
  fn test_max_depth_is_applied() {
    let x: Vec<Vec<f64>> = (0..16).map(|i| vec![i as f64]).collect();
    let y: Vec<f64> = (0..16).map(|i| (i * i) as f64).collect();
    let stump = ForestParams { n_estimators: 1, max_depth: Some(1), ..ForestParams::default() };
    let forest = RandomForestRegressor::fit(&x, &y, &stump).unwrap();

    let mut distinct: Vec<f64> = forest.predict(&x).unwrap();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();
    assert!(distinct.len() <= 2);
  }

  #[test]
  fn test_predict_rejects_wrong_width() {
    let (x, y) = step_data();
    let forest = RandomForestRegressor::fit(&x, &y, &params(3)).unwrap();
    assert!(matches!(forest.predict_row(&[1.0]), Err(ModelError::RaggedFeatures { expected: 2, found: 1, .. })));
    assert!(forest.predict(&[]).unwrap().is_empty());
  }

  #[test]
  fn test_forest_survives_json_round_trip() {
    let (x, y) = step_data();
    let forest = RandomForestRegressor::fit(&x, &y, &params(5)).unwrap();

    let json = serde_json::to_string(&forest).unwrap();
    let restored: RandomForestRegressor = serde_json::from_str(&json).unwrap();

    restored.validate().unwrap();
    assert_eq!(restored.n_features(), 2);
    assert_eq!(restored.predict(&x).unwrap(), forest.predict(&x).unwrap());
  }

  #[test]
  fn test_validate_rejects_unfitted_forest() {
    let forest = RandomForestRegressor { params: params(5), n_features: 2, forest: CartForest::new(5) };
    assert!(matches!(forest.validate(), Err(ModelError::NotFitted)));
  }

  #[test]
  fn test_validate_rejects_feature_mismatch() {
    let (x, y) = step_data();
    let mut forest = RandomForestRegressor::fit(&x, &y, &params(3)).unwrap();
    forest.n_features = 5;
    assert!(matches!(forest.validate(), Err(ModelError::FeatureMismatch { expected: 5, found: 2 })));
  }

  #[test]
  fn test_params_deserialize_with_defaults() {
    let params: ForestParams = serde_json::from_str(r#"{"n_estimators": 10}"#).unwrap();
    assert_eq!(params.n_estimators, 10);
    assert_eq!(params.seed, 42);
    assert_eq!(params.max_depth, None);
  }
}
