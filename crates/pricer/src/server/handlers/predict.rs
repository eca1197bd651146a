//! Prediction endpoint handler

use axum::{
  extract::{Extension, Json, State},
  http::StatusCode,
};
use tracing::{debug, error};

use crate::forest::ModelError;
use crate::product::Product;
use crate::server::{middleware::RequestContext, state::AppState, types::PredictionResponse};

/// POST /predict - Price a single product
///
/// Body validation is left to the `Json` extractor, which rejects missing or
/// ill-typed fields before this runs.
pub async fn predict(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Json(product): Json<Product>,
) -> Result<Json<PredictionResponse>, StatusCode> {
  let prediction = state.bundle.predict(&product).map_err(|e| match e {
    // A number JSON accepts but the model's f32 features cannot hold.
    ModelError::NonFinite { .. } => {
      debug!(request_id = %context.request_id, error = %e, "Rejected out-of-range input");
      StatusCode::UNPROCESSABLE_ENTITY
    }
    _ => {
      error!(request_id = %context.request_id, error = %e, "Prediction failed");
      StatusCode::INTERNAL_SERVER_ERROR
    }
  })?;

  if !prediction.brand_known {
    debug!(request_id = %context.request_id, column = "brand", label = %product.brand, "Unseen label, using fallback code");
  }
  if !prediction.category_known {
    debug!(request_id = %context.request_id, column = "category", label = %product.category, "Unseen label, using fallback code");
  }
  debug!(request_id = %context.request_id, predicted_price = prediction.price, "Prediction served");

  Ok(Json(PredictionResponse { predicted_price: prediction.price }))
}
