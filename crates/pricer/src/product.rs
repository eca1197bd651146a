//! Product records and the model's feature layout
//!
//! Training and serving both build rows through [`feature_row`], so the
//! column order the model was fitted on is the order it is queried with.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Model input columns, in order.
pub const FEATURE_COLUMNS: [&str; 5] = ["brand", "category", "rating", "reviews", "quantity"];
pub const FEATURE_COUNT: usize = FEATURE_COLUMNS.len();

/// A single product to price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Product {
  /// Brand label, matched exactly against the training vocabulary
  pub brand: String,

  /// Category label, matched exactly against the training vocabulary
  pub category: String,

  /// Average customer rating (typically 0-5)
  pub rating: f64,

  /// Number of customer reviews
  pub reviews: u64,

  /// Quantity per listing
  pub quantity: f64,
}

/// Assemble a model row from encoded labels and numeric attributes.
pub fn feature_row(brand_code: usize, category_code: usize, rating: f64, reviews: f64, quantity: f64) -> Vec<f64> {
  vec![brand_code as f64, category_code as f64, rating, reviews, quantity]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_feature_row_follows_column_order() {
    let row = feature_row(3, 1, 4.5, 10.0, 2.0);
    assert_eq!(row.len(), FEATURE_COUNT);
    assert_eq!(row, vec![3.0, 1.0, 4.5, 10.0, 2.0]);
  }

  #[test]
  fn test_product_ignores_unknown_fields() {
    let product: Product = serde_json::from_str(
      r#"{"brand":"Acme","category":"Tools","rating":4.5,"reviews":10,"quantity":2,"color":"red"}"#,
    )
    .unwrap();
    assert_eq!(product.brand, "Acme");
    assert_eq!(product.reviews, 10);
    assert_eq!(product.quantity, 2.0);
  }

  #[test]
  fn test_product_requires_every_field() {
    let missing = serde_json::from_str::<Product>(r#"{"brand":"Acme","category":"Tools","rating":4.5,"reviews":10}"#);
    assert!(missing.is_err());

    let negative = serde_json::from_str::<Product>(
      r#"{"brand":"Acme","category":"Tools","rating":4.5,"reviews":-1,"quantity":2}"#,
    );
    assert!(negative.is_err());
  }
}
