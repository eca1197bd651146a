//! Request and response bodies, with schemars annotations for schema publishing

use chrono::{DateTime, Utc};
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use crate::product::Product;

/// Response for POST /predict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PredictionResponse {
  /// Model estimate for the submitted product
  pub predicted_price: f64,
}

/// Response for GET /status
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
  pub status: String,
  pub version: String,

  /// Directory the bundle was loaded from
  pub artifact_dir: String,

  /// Trees in the loaded forest
  pub trees: usize,

  /// Brand labels the encoder knows (the fallback code equals this count)
  pub known_brands: usize,

  /// Category labels the encoder knows (the fallback code equals this count)
  pub known_categories: usize,

  pub loaded_at: DateTime<Utc>,
}

/// Response for GET /version
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionResponse {
  pub version: String,
}

/// Response for GET /schema
#[derive(Debug, Serialize)]
pub struct SchemaResponse {
  pub request: RootSchema,
  pub response: RootSchema,
}
