//! Weighted linear heuristic: the scorer used when no model is configured,
//! and the per-call fallback of the model-backed scorer.

use crate::config::HeuristicWeights;
use crate::error::EngineError;
use crate::scorer::{severity_for_score, RiskScorer};
use crate::types::{ChangeFeatures, FailureSeverity, ScoreOutcome};

#[derive(Debug, Clone)]
pub struct HeuristicScorer {
  weights: HeuristicWeights,
}

impl Default for HeuristicScorer {
  fn default() -> Self {
    Self::new(HeuristicWeights::default())
  }
}

impl HeuristicScorer {
  pub fn new(weights: HeuristicWeights) -> Self {
    Self { weights }
  }

  /// Risk score in [0, 1]. Fails only when the weight table has no entry for
  /// the change's component type or coverage level.
  pub fn risk_score(&self, f: &ChangeFeatures) -> Result<f64, EngineError> {
    let w = &self.weights;
    let component = *w.component.get(f.component_type.as_str()).ok_or_else(|| {
      EngineError::scoring_unavailable(format!(
        "no heuristic weight for component '{}'",
        f.component_type.as_str()
      ))
    })?;
    let coverage = *w.coverage.get(f.test_coverage_level.as_str()).ok_or_else(|| {
      EngineError::scoring_unavailable(format!(
        "no heuristic weight for coverage '{}'",
        f.test_coverage_level.as_str()
      ))
    })?;
    let change_type = w.change_type.get(f.change_type.as_str()).copied().unwrap_or(0.0);
    let category = w.category.get(f.function_category.as_str()).copied().unwrap_or(0.0);

    let lines = (f64::from(f.lines_changed) / f64::from(w.lines_cap)).min(1.0) * w.lines_weight;
    let files = (f64::from(f.files_changed) / f64::from(w.files_cap)).min(1.0) * w.files_weight;
    let shared = if f.shared_component { w.shared_penalty } else { 0.0 };
    let critical = if f.critical_module { w.critical_penalty } else { 0.0 };

    let score = w.base + component + change_type + category + lines + files + shared + critical + coverage;
    Ok(score.clamp(0.0, 1.0))
  }
}

impl RiskScorer for HeuristicScorer {
  fn name(&self) -> &'static str {
    "heuristic"
  }

  fn score(&self, features: &ChangeFeatures) -> Result<ScoreOutcome, EngineError> {
    let risk_score = self.risk_score(features)?;
    let failure_severity = severity_for_score(risk_score);
    Ok(ScoreOutcome {
      risk_score,
      failure_occurred: failure_severity != FailureSeverity::None,
      failure_severity,
    })
  }
}
