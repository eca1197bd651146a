//! Training data loading and missing-value cleaning
//!
//! Rows come from a headed CSV file. Cells that are empty or hold one of the
//! usual NA spellings are treated as missing and filled by [`clean`] with a
//! fixed policy before anything is encoded.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const REQUIRED_COLUMNS: [&str; 6] = ["brand", "category", "rating", "reviews", "quantity", "price"];

/// Fill value for missing brand/category labels.
pub const UNKNOWN_LABEL: &str = "Unknown";
pub const DEFAULT_REVIEWS: f64 = 0.0;
pub const DEFAULT_QUANTITY: f64 = 1.0;

/// Cell spellings read as missing, matching common dataframe readers.
const NA_TOKENS: [&str; 19] = [
  "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>", "N/A", "NA",
  "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Error, Debug)]
pub enum DatasetError {
  #[error("Failed to open training data {path}: {source}")]
  Io { path: String, source: std::io::Error },

  #[error("Malformed CSV: {0}")]
  Csv(#[from] csv::Error),

  #[error("Training data is missing required columns: {}", columns.join(", "))]
  MissingColumns { columns: Vec<String> },

  #[error("Training data contains no rows")]
  Empty,

  #[error("Row {row}: column '{column}' has non-numeric or non-finite value '{value}'")]
  InvalidValue { row: usize, column: String, value: String },

  #[error("Row {row}: price is missing")]
  MissingTarget { row: usize },
}

/// One training row as read, before the missing-value policy is applied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawProduct {
  pub brand: Option<String>,
  pub category: Option<String>,
  pub rating: Option<f64>,
  pub reviews: Option<f64>,
  pub quantity: Option<f64>,
  pub price: f64,
}

/// A training row with every feature present.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanProduct {
  pub brand: String,
  pub category: String,
  pub rating: f64,
  pub reviews: f64,
  pub quantity: f64,
  pub price: f64,
}

/// Read training rows from a CSV file.
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Vec<RawProduct>, DatasetError> {
  let path = path.as_ref();
  let file = File::open(path).map_err(|source| DatasetError::Io { path: path.display().to_string(), source })?;
  let rows = read_from(file)?;
  info!(path = %path.display(), rows = rows.len(), "Loaded training data");
  Ok(rows)
}

/// Read training rows from any CSV source with a header line.
pub fn read_from<R: Read>(source: R) -> Result<Vec<RawProduct>, DatasetError> {
  let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(source);
  let columns = ColumnIndex::locate(reader.headers()?)?;

  let mut rows = Vec::new();
  for (offset, record) in reader.records().enumerate() {
    let record = record?;
    rows.push(columns.parse(&record, offset + 1)?);
  }

  if rows.is_empty() {
    return Err(DatasetError::Empty);
  }
  Ok(rows)
}

/// Mean of the ratings that are present, if any are.
pub fn rating_mean(rows: &[RawProduct]) -> Option<f64> {
  let present: Vec<f64> = rows.iter().filter_map(|row| row.rating).collect();
  if present.is_empty() {
    return None;
  }
  Some(present.iter().sum::<f64>() / present.len() as f64)
}

/// Apply the missing-value policy.
///
/// Labels become [`UNKNOWN_LABEL`], ratings the mean of the present ratings,
/// reviews `0` and quantity `1`. When no rating is present at all the mean
/// is undefined and `0.0` is used.
pub fn clean(rows: &[RawProduct]) -> Vec<CleanProduct> {
  let mean = rating_mean(rows).unwrap_or_else(|| {
    warn!("No ratings present in training data; filling with 0.0");
    0.0
  });

  let missing_ratings = rows.iter().filter(|row| row.rating.is_none()).count();
  debug!(rating_fill = mean, missing_ratings, "Applying missing-value policy");

  rows
    .iter()
    .map(|row| CleanProduct {
      brand: row.brand.clone().unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
      category: row.category.clone().unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
      rating: row.rating.unwrap_or(mean),
      reviews: row.reviews.unwrap_or(DEFAULT_REVIEWS),
      quantity: row.quantity.unwrap_or(DEFAULT_QUANTITY),
      price: row.price,
    })
    .collect()
}

/// Positions of the required columns within the header.
struct ColumnIndex {
  brand: usize,
  category: usize,
  rating: usize,
  reviews: usize,
  quantity: usize,
  price: usize,
}

impl ColumnIndex {
  fn locate(headers: &csv::StringRecord) -> Result<Self, DatasetError> {
    // Names match exactly; a padded header such as " price" does not count.
    let position = |name: &str| headers.iter().position(|header| header == name);

    let missing: Vec<String> =
      REQUIRED_COLUMNS.iter().filter(|&&name| position(name).is_none()).map(|&name| name.to_string()).collect();
    if !missing.is_empty() {
      return Err(DatasetError::MissingColumns { columns: missing });
    }

    let index = |name: &str| position(name).unwrap_or_default();
    Ok(Self {
      brand: index("brand"),
      category: index("category"),
      rating: index("rating"),
      reviews: index("reviews"),
      quantity: index("quantity"),
      price: index("price"),
    })
  }

  fn parse(&self, record: &csv::StringRecord, row: usize) -> Result<RawProduct, DatasetError> {
    let price = number(record, self.price, "price", row)?.ok_or(DatasetError::MissingTarget { row })?;

    Ok(RawProduct {
      brand: label(record, self.brand),
      category: label(record, self.category),
      rating: number(record, self.rating, "rating", row)?,
      reviews: number(record, self.reviews, "reviews", row)?,
      quantity: number(record, self.quantity, "quantity", row)?,
      price,
    })
  }
}

fn is_missing(cell: &str) -> bool {
  NA_TOKENS.contains(&cell)
}

fn label(record: &csv::StringRecord, index: usize) -> Option<String> {
  record.get(index).filter(|cell| !is_missing(cell)).map(str::to_string)
}

fn number(record: &csv::StringRecord, index: usize, column: &str, row: usize) -> Result<Option<f64>, DatasetError> {
  let Some(cell) = record.get(index).filter(|cell| !is_missing(cell)) else {
    return Ok(None);
  };

  match cell.trim().parse::<f64>() {
    Ok(value) if value.is_finite() => Ok(Some(value)),
    _ => Err(DatasetError::InvalidValue { row, column: column.to_string(), value: cell.to_string() }),
  }
}
