//! Core engine: owns the process-wide scorer and config, runs the pipeline.
//!
//! Build one `Engine` at startup and share it (e.g. behind an `Arc`). It holds
//! no mutable state, so every call is a pure function of its inputs.

use tracing::debug;

use crate::classify;
use crate::config::Config;
use crate::error::EngineError;
use crate::extract;
use crate::fingerprint;
use crate::prioritize;
use crate::scorer::{self, RiskScorer};
use crate::types::*;

#[derive(Debug)]
pub struct Engine {
  config: Config,
  scorer: Box<dyn RiskScorer>,
}

impl Engine {
  /// Select the scorer from `config` (loading the model if one is configured).
  pub fn new(config: Config) -> Self {
    let scorer = scorer::from_config(&config);
    Self { config, scorer }
  }

  pub fn with_defaults() -> Self {
    Self::new(Config::default())
  }

  /// Use an explicitly constructed scorer instead of selecting one from config.
  pub fn with_scorer(config: Config, scorer: Box<dyn RiskScorer>) -> Self {
    Self { config, scorer }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn scorer_name(&self) -> &'static str {
    self.scorer.name()
  }

  pub fn extract(&self, summary: &DiffSummary) -> Result<ChangeFeatures, EngineError> {
    extract::extract(summary)
  }

  /// Score and classify one feature vector.
  pub fn assess(&self, features: &ChangeFeatures) -> Result<RiskPrediction, EngineError> {
    let outcome = self.scorer.score(features)?;
    let prediction = classify::classify(&outcome, features)?;
    debug!(
      scorer = self.scorer.name(),
      risk_score = prediction.risk_score,
      risk_level = prediction.risk_level.as_str(),
      "assessed change"
    );
    Ok(prediction)
  }

  /// Full pipeline: extract, score, classify, fingerprint.
  pub fn analyze(&self, summary: &DiffSummary) -> Result<AnalysisReport, EngineError> {
    let features = self.extract(summary)?;
    let prediction = self.assess(&features)?;
    Ok(AnalysisReport {
      fingerprint: fingerprint::compute(&features),
      scorer: self.scorer.name().to_string(),
      features,
      prediction,
    })
  }

  /// Rank candidates against a verdict. Fails when the verdict is inconsistent.
  pub fn prioritize(
    &self,
    candidates: &[TestCandidate],
    context: &RiskPrediction,
  ) -> Result<Vec<PrioritizedTest>, EngineError> {
    prioritize::prioritize(
      candidates,
      context,
      &self.config.priority,
      self.config.importance_threshold,
    )
  }

  pub fn plan(&self, candidates: &[TestCandidate], context: &RiskPrediction) -> Result<TestPlan, EngineError> {
    prioritize::plan(
      candidates,
      context,
      &self.config.priority,
      self.config.importance_threshold,
    )
  }
}
