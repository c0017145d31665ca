//! Risk scoring strategies.
//!
//! One scorer is chosen at startup by [`from_config`] and injected into the
//! engine. Both variants are deterministic and read-only after construction,
//! so a single instance can serve concurrent callers.

use std::fmt::Debug;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::EngineError;
use crate::heuristic::HeuristicScorer;
use crate::model::{self, GradientBoostedModel};
use crate::types::{ChangeFeatures, FailureSeverity, ScoreOutcome};

pub trait RiskScorer: Send + Sync + Debug {
  /// Short label recorded in analysis reports.
  fn name(&self) -> &'static str;

  fn score(&self, features: &ChangeFeatures) -> Result<ScoreOutcome, EngineError>;
}

/// Severity bands used when no severity classifier is available.
pub fn severity_for_score(risk_score: f64) -> FailureSeverity {
  if risk_score < 0.35 {
    FailureSeverity::None
  } else if risk_score < 0.60 {
    FailureSeverity::Minor
  } else if risk_score < 0.80 {
    FailureSeverity::Major
  } else {
    FailureSeverity::Critical
  }
}

/// Tree-ensemble scorer with the heuristic as a per-call fallback.
#[derive(Debug, Clone)]
pub struct ModelBackedScorer {
  model: GradientBoostedModel,
  fallback: HeuristicScorer,
}

impl ModelBackedScorer {
  pub fn new(model: GradientBoostedModel, fallback: HeuristicScorer) -> Self {
    Self { model, fallback }
  }
}

impl RiskScorer for ModelBackedScorer {
  fn name(&self) -> &'static str {
    "model"
  }

  fn score(&self, features: &ChangeFeatures) -> Result<ScoreOutcome, EngineError> {
    let row = model::encode(features);
    let risk_score = self.model.predict_proba(&row);
    if !risk_score.is_finite() {
      warn!(module = %features.module_name, "model produced a non-finite score, using heuristic");
      return self.fallback.score(features);
    }
    let risk_score = risk_score.clamp(0.0, 1.0);
    let failure_severity = self
      .model
      .predict_severity(&row)
      .unwrap_or_else(|| severity_for_score(risk_score));
    Ok(ScoreOutcome {
      risk_score,
      failure_occurred: failure_severity != FailureSeverity::None,
      failure_severity,
    })
  }
}

/// Pick the scorer for this process. A configured model that fails to load
/// degrades to the heuristic with a warning.
pub fn from_config(config: &Config) -> Box<dyn RiskScorer> {
  let heuristic = HeuristicScorer::new(config.heuristic.clone());
  let Some(path) = &config.model_path else {
    info!("no model configured, using heuristic scorer");
    return Box::new(heuristic);
  };
  match GradientBoostedModel::load(path) {
    Ok(model) => {
      info!(
        path = %path.display(),
        trees = model.tree_count(),
        severity_head = model.has_severity_head(),
        "loaded risk model"
      );
      Box::new(ModelBackedScorer::new(model, heuristic))
    }
    Err(e) => {
      warn!(path = %path.display(), error = %e, "risk model unavailable, using heuristic scorer");
      Box::new(heuristic)
    }
  }
}
