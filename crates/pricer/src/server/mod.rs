//! HTTP prediction service
//!
//! Serves a loaded [`ArtifactBundle`](crate::artifacts::ArtifactBundle) over
//! axum. The bundle is loaded once at startup and shared read-only by every
//! request through [`state::AppState`].

pub mod handlers;
pub mod middleware;
pub mod routing;
pub mod startup;
pub mod state;
pub mod types;
