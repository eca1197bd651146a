//! Axum router configuration for all endpoints

use axum::{
  middleware,
  routing::{get, post},
  Router,
};

use crate::server::handlers::{predict, status};
use crate::server::middleware::request_context_middleware;
use crate::server::state::AppState;

/// Create the application router over a loaded bundle
pub fn create_router(state: AppState) -> Router {
  Router::new()
    .route("/predict", post(predict::predict))
    .route("/status", get(status::status))
    .route("/version", get(status::version))
    .route("/schema", get(status::schema))
    .layer(middleware::from_fn(request_context_middleware))
    .with_state(state)
}
