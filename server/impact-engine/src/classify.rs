//! Risk classification: score bands, recommended action, affected scope.

use std::collections::BTreeSet;

use crate::error::EngineError;
use crate::types::{ChangeFeatures, RiskLevel, RiskPrediction, ScoreOutcome};

/// Inclusive lower bounds of LOW, MEDIUM and HIGH.
pub const LOW_THRESHOLD: f64 = 0.25;
pub const MEDIUM_THRESHOLD: f64 = 0.50;
pub const HIGH_THRESHOLD: f64 = 0.75;

/// Scope tag marking a change to a repository-critical module.
pub const CRITICAL_MODULE_TAG: &str = "critical-module";

/// Band a score in [0, 1]. Shared by risk levels and priority levels.
pub fn level_for_score(score: f64) -> RiskLevel {
  if score < LOW_THRESHOLD {
    RiskLevel::None
  } else if score < MEDIUM_THRESHOLD {
    RiskLevel::Low
  } else if score < HIGH_THRESHOLD {
    RiskLevel::Medium
  } else {
    RiskLevel::High
  }
}

pub fn recommended_action(level: RiskLevel) -> &'static str {
  match level {
    RiskLevel::None | RiskLevel::Low => "smoke tests",
    RiskLevel::Medium => "targeted/impacted tests",
    RiskLevel::High => "full regression suite",
  }
}

/// Scope tags derived from the features alone.
pub fn affected_scope(f: &ChangeFeatures) -> BTreeSet<String> {
  let mut scope = BTreeSet::new();
  scope.insert(format!("component:{}", f.component_type.as_str()));
  scope.insert(format!("module:{}", f.module_name));
  scope.insert(format!("category:{}", f.function_category.as_str()));
  if f.shared_component {
    scope.insert("shared-component".to_string());
  }
  if f.critical_module {
    scope.insert(CRITICAL_MODULE_TAG.to_string());
  }
  scope
}

/// Build the verdict. A score outside [0, 1] is a scorer bug and fails with
/// `InvalidScore`.
pub fn classify(outcome: &ScoreOutcome, features: &ChangeFeatures) -> Result<RiskPrediction, EngineError> {
  let score = outcome.risk_score;
  if !(0.0..=1.0).contains(&score) {
    return Err(EngineError::InvalidScore(score));
  }
  let risk_level = level_for_score(score);
  Ok(RiskPrediction {
    risk_score: score,
    risk_level,
    failure_occurred: outcome.failure_occurred,
    failure_severity: outcome.failure_severity,
    recommended_action: recommended_action(risk_level).to_string(),
    affected_scope: affected_scope(features),
  })
}

/// Check a verdict received from outside the pipeline: the score must be in
/// [0, 1] and the level must be the band of that score.
pub fn validate_verdict(verdict: &RiskPrediction) -> Result<(), EngineError> {
  let score = verdict.risk_score;
  if !(0.0..=1.0).contains(&score) {
    return Err(EngineError::InvalidScore(score));
  }
  let expected = level_for_score(score);
  if verdict.risk_level != expected {
    return Err(EngineError::InvalidVerdict(format!(
      "risk_level {} does not match risk_score {} (expected {})",
      verdict.risk_level.as_str(),
      score,
      expected.as_str()
    )));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::tests::sample_features;
  use crate::types::FailureSeverity;

  fn outcome(risk_score: f64) -> ScoreOutcome {
    ScoreOutcome {
      risk_score,
      failure_occurred: false,
      failure_severity: FailureSeverity::None,
    }
  }

  #[test]
  fn band_edges() {
    let cases = [
      (0.0, RiskLevel::None),
      (0.24, RiskLevel::None),
      (0.25, RiskLevel::Low),
      (0.49, RiskLevel::Low),
      (0.5, RiskLevel::Medium),
      (0.74, RiskLevel::Medium),
      (0.75, RiskLevel::High),
      (1.0, RiskLevel::High),
    ];
    for (score, level) in cases {
      assert_eq!(level_for_score(score), level, "score {}", score);
    }
  }

  #[test]
  fn levels_are_monotonic() {
    let mut prev = RiskLevel::None;
    for i in 0..=1000 {
      let level = level_for_score(i as f64 / 1000.0);
      assert!(level >= prev);
      prev = level;
    }
  }

  #[test]
  fn actions_follow_levels() {
    let f = sample_features();
    let action = |s: f64| classify(&outcome(s), &f).unwrap().recommended_action;
    assert_eq!(action(0.1), "smoke tests");
    assert_eq!(action(0.3), "smoke tests");
    assert_eq!(action(0.6), "targeted/impacted tests");
    assert_eq!(action(0.9), "full regression suite");
  }

  #[test]
  fn scope_is_derived_from_features() {
    let mut f = sample_features();
    f.shared_component = true;
    let scope: Vec<String> = affected_scope(&f).into_iter().collect();
    assert_eq!(
      scope,
      vec![
        "category:analytics",
        "component:ui",
        "module:dashboard",
        "shared-component",
      ]
    );
  }

  #[test]
  fn rejects_out_of_range_scores() {
    let f = sample_features();
    for bad in [-0.01, 1.01, f64::NAN, f64::INFINITY] {
      let err = classify(&outcome(bad), &f).unwrap_err();
      assert_eq!(err.kind(), "invalid_score");
    }
  }

  #[test]
  fn classify_is_idempotent() {
    let f = sample_features();
    let o = outcome(0.42);
    assert_eq!(classify(&o, &f).unwrap(), classify(&o, &f).unwrap());
  }

  #[test]
  fn verdict_serializes_with_stable_field_names() {
    let p = classify(&outcome(0.8), &sample_features()).unwrap();
    let v = serde_json::to_value(&p).unwrap();
    assert_eq!(v["risk_level"], "HIGH");
    assert_eq!(v["failure_severity"], "none");
    assert_eq!(v["recommended_action"], "full regression suite");
    assert!(v["affected_scope"].is_array());
    assert!(v.get("failure_occurred").is_some());
  }

  #[test]
  fn classified_verdicts_validate() {
    let f = sample_features();
    for score in [0.0, 0.25, 0.5, 0.75, 1.0] {
      let p = classify(&outcome(score), &f).unwrap();
      assert!(validate_verdict(&p).is_ok(), "score {}", score);
    }
  }

  #[test]
  fn verdict_with_out_of_range_score_is_rejected() {
    let mut p = classify(&outcome(0.1), &sample_features()).unwrap();
    p.risk_score = 3.5;
    assert!(matches!(validate_verdict(&p), Err(EngineError::InvalidScore(s)) if s == 3.5));
  }

  #[test]
  fn verdict_with_mismatched_level_is_rejected() {
    let mut p = classify(&outcome(0.9), &sample_features()).unwrap();
    p.risk_level = RiskLevel::None;
    let err = validate_verdict(&p).unwrap_err();
    assert_eq!(err.kind(), "invalid_verdict");
    assert!(err.to_string().contains("expected HIGH"), "{}", err);
  }
}
