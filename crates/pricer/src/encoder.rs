//! Categorical label encoding with a shared fallback bucket
//!
//! A fitted [`LabelEncoder`] maps each known label to its position in a
//! sorted vocabulary. Labels outside the vocabulary all encode to
//! `vocabulary.len()`, one past the last known code. Encoding never grows the
//! vocabulary: the fallback code is computed on every call and never stored.

use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

/// Capability the prediction path needs from a categorical encoder.
pub trait CategoryEncoder {
  /// Code for a single label. Total: unseen labels get a fallback code.
  fn encode(&self, label: &str) -> usize;

  /// Encode a sequence of labels, preserving length and order.
  fn encode_all<S: AsRef<str>>(&self, labels: &[S]) -> Vec<usize> {
    labels.iter().map(|label| self.encode(label.as_ref())).collect()
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VocabularyError {
  #[error("Label '{label}' appears more than once")]
  Duplicate { label: String },

  #[error("Labels are not in sorted order at position {index}")]
  Unsorted { index: usize },
}

/// Bijection between a fixed set of string labels and the codes `0..k`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelEncoder {
  classes: Vec<String>,
}

impl LabelEncoder {
  /// Fit over a column of labels. Codes follow the sorted order of the
  /// distinct labels, so the result does not depend on row order.
  pub fn fit<S: AsRef<str>>(labels: &[S]) -> Self {
    let distinct: BTreeSet<&str> = labels.iter().map(|label| label.as_ref()).collect();
    Self { classes: distinct.into_iter().map(str::to_string).collect() }
  }

  /// Rebuild an encoder from a persisted vocabulary.
  ///
  /// The vocabulary must be strictly increasing; anything else would assign
  /// codes that differ from the ones the model was trained against.
  pub fn from_classes(classes: Vec<String>) -> Result<Self, VocabularyError> {
    for (index, pair) in classes.windows(2).enumerate() {
      match pair[0].cmp(&pair[1]) {
        std::cmp::Ordering::Less => {}
        std::cmp::Ordering::Equal => {
          return Err(VocabularyError::Duplicate { label: pair[1].clone() });
        }
        std::cmp::Ordering::Greater => return Err(VocabularyError::Unsorted { index: index + 1 }),
      }
    }
    Ok(Self { classes })
  }

  /// Known labels, in code order.
  pub fn classes(&self) -> &[String] {
    &self.classes
  }

  pub fn len(&self) -> usize {
    self.classes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.classes.is_empty()
  }

  /// The code every unseen label collapses to.
  pub fn unknown_code(&self) -> usize {
    self.classes.len()
  }

  /// Strict lookup: `None` for labels outside the vocabulary.
  pub fn code_of(&self, label: &str) -> Option<usize> {
    self.classes.binary_search_by(|class| class.as_str().cmp(label)).ok()
  }

  pub fn contains(&self, label: &str) -> bool {
    self.code_of(label).is_some()
  }
}

impl CategoryEncoder for LabelEncoder {
  fn encode(&self, label: &str) -> usize {
    self.code_of(label).unwrap_or_else(|| self.unknown_code())
  }
}
