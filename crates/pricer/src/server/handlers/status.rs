//! Status, version and schema endpoint handlers

use axum::{extract::State, response::Json};
use schemars::schema_for;

use crate::product::Product;
use crate::server::state::AppState;
use crate::server::types::{PredictionResponse, SchemaResponse, StatusResponse, VersionResponse};

/// GET /status - Health check with facts about the loaded bundle
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
  let bundle = &state.bundle;

  Json(StatusResponse {
    status: "healthy".to_string(),
    version: env!("CARGO_PKG_VERSION").to_string(),
    artifact_dir: state.artifact_dir.to_string_lossy().to_string(),
    trees: bundle.model.n_trees(),
    known_brands: bundle.brand_encoder.len(),
    known_categories: bundle.category_encoder.len(),
    loaded_at: state.loaded_at,
  })
}

/// GET /version - Returns current service version
pub async fn version() -> Json<VersionResponse> {
  Json(VersionResponse { version: env!("CARGO_PKG_VERSION").to_string() })
}

/// GET /schema - JSON Schemas of the predict request and response
pub async fn schema() -> Json<SchemaResponse> {
  Json(SchemaResponse { request: schema_for!(Product), response: schema_for!(PredictionResponse) })
}
