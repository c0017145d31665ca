//! Structured error types for the impact engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  /// Malformed diff summary. Not retryable; upstream data must be fixed.
  #[error("extraction: {field}: {reason}")]
  Extraction { field: String, reason: String },

  /// Neither the model nor the heuristic could produce a score.
  #[error("scoring unavailable: {0}")]
  ScoringUnavailable(String),

  /// A risk score outside [0, 1] reached the classifier.
  #[error("invalid score: {0} is outside [0, 1]")]
  InvalidScore(f64),

  /// An incoming verdict whose level disagrees with its score.
  #[error("invalid verdict: {0}")]
  InvalidVerdict(String),

  #[error("model: {0}")]
  Model(String),

  #[error("config: {0}")]
  Config(String),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),

  #[error("io: {0}")]
  Io(#[from] std::io::Error),
}

impl EngineError {
  pub fn extraction(field: &str, reason: &str) -> Self {
    Self::Extraction {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn scoring_unavailable(msg: impl Into<String>) -> Self {
    Self::ScoringUnavailable(msg.into())
  }

  pub fn model(msg: impl Into<String>) -> Self {
    Self::Model(msg.into())
  }

  pub fn config(msg: impl Into<String>) -> Self {
    Self::Config(msg.into())
  }

  /// Stable machine-readable kind, used in the CLI error envelope.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Extraction { .. } => "extraction_error",
      Self::ScoringUnavailable(_) => "scoring_unavailable",
      Self::InvalidScore(_) => "invalid_score",
      Self::InvalidVerdict(_) => "invalid_verdict",
      Self::Model(_) => "model_error",
      Self::Config(_) => "config_error",
      Self::Json(_) => "json_error",
      Self::Io(_) => "io_error",
    }
  }

  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::ScoringUnavailable(_))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extraction_message_names_field() {
    let err = EngineError::extraction("files[0].path", "must not be empty");
    assert_eq!(err.to_string(), "extraction: files[0].path: must not be empty");
    assert_eq!(err.kind(), "extraction_error");
  }

  #[test]
  fn only_scoring_unavailable_is_retryable() {
    assert!(EngineError::scoring_unavailable("no weights").is_retryable());
    assert!(!EngineError::InvalidScore(1.5).is_retryable());
    assert!(!EngineError::extraction("files", "empty").is_retryable());
  }
}
