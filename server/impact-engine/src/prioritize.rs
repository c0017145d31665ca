//! Test prioritization: rank generated test candidates against a risk verdict.
//!
//! priority = risk * w.risk
//!          + category_importance * w.category
//!          + method_importance * w.method
//!          + status_importance * w.status
//!          + critical_module * w.critical
//!
//! clamped to [0, 1] and rounded to 4 decimals. Ordering is by descending
//! score; equal scores keep input order. The verdict is validated first, so a
//! contradictory verdict fails instead of being ranked against.

use tracing::debug;

use crate::classify::{level_for_score, validate_verdict, CRITICAL_MODULE_TAG};
use crate::config::PriorityWeights;
use crate::error::EngineError;
use crate::types::*;

/// Importance of the expected status: error paths (4xx/5xx) first.
fn status_importance(status: u16) -> f64 {
  if status >= 400 {
    1.0
  } else if status >= 300 {
    0.3
  } else {
    0.0
  }
}

fn category_importance(category: &str, w: &PriorityWeights) -> f64 {
  w.categories
    .get(&category.trim().to_ascii_lowercase())
    .copied()
    .unwrap_or(w.default_category)
}

fn method_importance(method: &str, w: &PriorityWeights) -> f64 {
  w.methods
    .get(&method.trim().to_ascii_uppercase())
    .copied()
    .unwrap_or(w.default_method)
}

/// Priority score for one candidate under a given verdict.
pub fn priority_score(candidate: &TestCandidate, context: &RiskPrediction, w: &PriorityWeights) -> f64 {
  let critical = if context.affected_scope.contains(CRITICAL_MODULE_TAG) {
    1.0
  } else {
    0.0
  };
  let raw = context.risk_score * w.risk
    + category_importance(&candidate.category, w) * w.category
    + method_importance(&candidate.method, w) * w.method
    + status_importance(candidate.expected_status) * w.status
    + critical * w.critical;
  (raw.clamp(0.0, 1.0) * 10_000.0).round() / 10_000.0
}

/// Score and order candidates. Inputs are not modified. Candidates without a
/// name are called `test_<rank>`.
pub fn prioritize(
  candidates: &[TestCandidate],
  context: &RiskPrediction,
  weights: &PriorityWeights,
  importance_threshold: f64,
) -> Result<Vec<PrioritizedTest>, EngineError> {
  validate_verdict(context)?;
  let mut scored: Vec<PrioritizedTest> = candidates
    .iter()
    .map(|c| {
      let priority_score = priority_score(c, context, weights);
      PrioritizedTest {
        candidate: c.clone(),
        priority_score,
        priority_level: level_for_score(priority_score),
        rank: 0,
        is_important: priority_score >= importance_threshold,
      }
    })
    .collect();

  // sort_by is stable, so ties keep input order.
  scored.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
  for (i, t) in scored.iter_mut().enumerate() {
    t.rank = i + 1;
    if t.candidate.name.trim().is_empty() {
      t.candidate.name = format!("test_{}", t.rank);
    }
  }
  debug!(count = scored.len(), risk_score = context.risk_score, "prioritized test candidates");
  Ok(scored)
}

/// Ranked plan with a selected subset: every important test, or the top half
/// (at least one) when none clear the threshold.
pub fn plan(
  candidates: &[TestCandidate],
  context: &RiskPrediction,
  weights: &PriorityWeights,
  importance_threshold: f64,
) -> Result<TestPlan, EngineError> {
  let all_tests = prioritize(candidates, context, weights, importance_threshold)?;
  let important: Vec<PrioritizedTest> = all_tests.iter().filter(|t| t.is_important).cloned().collect();

  let (selected_tests, selection) = if important.is_empty() {
    let half = (all_tests.len() / 2).max(1).min(all_tests.len());
    (all_tests[..half].to_vec(), Selection::All)
  } else {
    (important, Selection::Important)
  };

  Ok(TestPlan {
    total_count: all_tests.len(),
    selected_count: selected_tests.len(),
    selected_tests,
    all_tests,
    selection,
    risk_context: RiskContext {
      risk_score: context.risk_score,
      risk_level: context.risk_level,
      critical_module: context.affected_scope.contains(CRITICAL_MODULE_TAG),
      importance_threshold,
    },
  })
}
