//! Pricer - Product price model training and prediction
//!
//! An offline trainer that fits a random forest on product listings, and an
//! HTTP service that prices new products with the persisted model.

pub mod artifacts;
pub mod config;
pub mod dataset;
pub mod encoder;
pub mod forest;
pub mod logging;
pub mod product;
pub mod server;
pub mod training;

pub use artifacts::{ArtifactBundle, ArtifactStore};
pub use config::PricerConfig;
pub use product::Product;
