//! Request context middleware
//!
//! Tags every request with an id and logs its start and completion. Handlers
//! pick the context up through `Extension<RequestContext>`.

use axum::{
  extract::Request,
  http::{Method, Uri},
  middleware::Next,
  response::Response,
};
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

/// Metadata for the request being handled
#[derive(Debug, Clone)]
pub struct RequestContext {
  /// Unique ID for this request
  pub request_id: Uuid,
  pub method: Method,
  pub uri: Uri,
}

impl RequestContext {
  pub fn new(method: Method, uri: Uri) -> Self {
    Self { request_id: Uuid::new_v4(), method, uri }
  }
}

/// Middleware to inject RequestContext into all requests
pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
  let context = RequestContext::new(request.method().clone(), request.uri().clone());

  let start_time = Instant::now();
  info!(request_id = %context.request_id, method = %context.method, path = context.uri.path(), "Request started");

  request.extensions_mut().insert(context.clone());
  let response = next.run(request).await;

  let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
  info!(
    request_id = %context.request_id,
    method = %context.method,
    path = context.uri.path(),
    status = response.status().as_u16(),
    duration_ms,
    "Request completed"
  );

  response
}
