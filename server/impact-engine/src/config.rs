//! Engine configuration with sane defaults, optionally loaded from TOML.
//!
//! Every section is `#[serde(default)]`, so a config file only needs the keys
//! it overrides. Replacing a weight map replaces it wholesale.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::EngineError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// XGBoost JSON dump. When unset the heuristic scorer is used.
  pub model_path: Option<PathBuf>,
  /// Minimum priority score for a test to count as important.
  pub importance_threshold: f64,
  pub heuristic: HeuristicWeights,
  pub priority: PriorityWeights,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      model_path: None,
      importance_threshold: 0.65,
      heuristic: HeuristicWeights::default(),
      priority: PriorityWeights::default(),
    }
  }
}

impl Config {
  pub fn from_toml_str(raw: &str) -> Result<Self, EngineError> {
    let config: Config = toml::from_str(raw).map_err(|e| EngineError::config(e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  pub fn from_file(path: &Path) -> Result<Self, EngineError> {
    let raw = std::fs::read_to_string(path)
      .map_err(|e| EngineError::config(format!("{}: {}", path.display(), e)))?;
    Self::from_toml_str(&raw)
  }

  pub fn validate(&self) -> Result<(), EngineError> {
    if !(0.0..=1.0).contains(&self.importance_threshold) {
      return Err(EngineError::config("importance_threshold must be within [0, 1]"));
    }
    self.heuristic.validate()?;
    self.priority.validate()
  }
}

/// Weight table for the heuristic scorer.
///
/// score = base + component + change_type + category
///       + min(lines / lines_cap, 1) * lines_weight
///       + min(files / files_cap, 1) * files_weight
///       + shared_penalty? + critical_penalty? + coverage, clamped to [0, 1]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeuristicWeights {
  pub base: f64,
  /// Required entry for every component type.
  pub component: BTreeMap<String, f64>,
  /// Missing entries contribute 0.
  pub change_type: BTreeMap<String, f64>,
  /// Missing entries contribute 0.
  pub category: BTreeMap<String, f64>,
  /// Required entry for every coverage level; may be negative.
  pub coverage: BTreeMap<String, f64>,
  pub lines_weight: f64,
  pub lines_cap: u32,
  pub files_weight: f64,
  pub files_cap: u32,
  pub shared_penalty: f64,
  pub critical_penalty: f64,
}

impl Default for HeuristicWeights {
  fn default() -> Self {
    Self {
      base: 0.10,
      component: weights(&[
        ("api", 0.30),
        ("config", 0.25),
        ("service", 0.20),
        ("other", 0.15),
        ("ui", 0.10),
        ("test", 0.05),
      ]),
      change_type: weights(&[
        ("deleted", 0.05),
        ("modified", 0.03),
        ("added", 0.02),
        ("renamed", 0.0),
      ]),
      category: weights(&[("auth", 0.10), ("payment", 0.10), ("data", 0.05), ("admin", 0.05)]),
      coverage: weights(&[("none", 0.20), ("low", 0.10), ("medium", 0.0), ("high", -0.10)]),
      lines_weight: 0.25,
      lines_cap: 500,
      files_weight: 0.10,
      files_cap: 20,
      shared_penalty: 0.15,
      critical_penalty: 0.10,
    }
  }
}

impl HeuristicWeights {
  fn validate(&self) -> Result<(), EngineError> {
    // Negative growth weights would break monotonicity in lines/files.
    if self.lines_weight < 0.0 || self.files_weight < 0.0 {
      return Err(EngineError::config("heuristic lines/files weights must be >= 0"));
    }
    if self.lines_cap == 0 || self.files_cap == 0 {
      return Err(EngineError::config("heuristic lines_cap/files_cap must be > 0"));
    }
    let scalars = [self.base, self.shared_penalty, self.critical_penalty];
    let tables = [&self.component, &self.change_type, &self.category, &self.coverage];
    let all_finite = scalars.iter().all(|w| w.is_finite())
      && tables.iter().all(|t| t.values().all(|w| w.is_finite()));
    if !all_finite {
      return Err(EngineError::config("heuristic weights must be finite"));
    }
    Ok(())
  }
}

/// Weights for the test prioritizer. The five top-level weights sum to 1.0 by
/// default so a priority score needs no rescaling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
  pub risk: f64,
  pub category: f64,
  pub method: f64,
  pub status: f64,
  pub critical: f64,
  /// Per-category importance in [0, 1]; keys are lowercase.
  pub categories: BTreeMap<String, f64>,
  pub default_category: f64,
  /// Per-method importance in [0, 1]; keys are uppercase.
  pub methods: BTreeMap<String, f64>,
  pub default_method: f64,
}

impl Default for PriorityWeights {
  fn default() -> Self {
    Self {
      risk: 0.40,
      category: 0.30,
      method: 0.10,
      status: 0.15,
      critical: 0.05,
      categories: weights(&[
        ("authentication", 1.0),
        ("security", 0.95),
        ("payment", 0.85),
        ("error_handling", 0.65),
        ("crud", 0.50),
        ("edge_case", 0.40),
        ("happy_path", 0.30),
        ("functional", 0.25),
      ]),
      default_category: 0.25,
      methods: weights(&[
        ("POST", 1.0),
        ("PUT", 0.8),
        ("DELETE", 0.8),
        ("PATCH", 0.6),
        ("GET", 0.4),
      ]),
      default_method: 0.4,
    }
  }
}

impl PriorityWeights {
  fn validate(&self) -> Result<(), EngineError> {
    let top = [self.risk, self.category, self.method, self.status, self.critical];
    if top.iter().any(|w| !w.is_finite() || *w < 0.0) {
      return Err(EngineError::config("priority weights must be finite and >= 0"));
    }
    let in_unit = |w: &f64| (0.0..=1.0).contains(w);
    if !self.categories.values().all(in_unit)
      || !self.methods.values().all(in_unit)
      || !in_unit(&self.default_category)
      || !in_unit(&self.default_method)
    {
      return Err(EngineError::config("priority category/method weights must be within [0, 1]"));
    }
    Ok(())
  }
}

fn weights(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
  pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    Config::default().validate().unwrap();
  }

  #[test]
  fn default_priority_weights_sum_to_one() {
    let p = PriorityWeights::default();
    let sum = p.risk + p.category + p.method + p.status + p.critical;
    assert!((sum - 1.0).abs() < 1e-9);
  }

  #[test]
  fn partial_toml_keeps_other_defaults() {
    let config = Config::from_toml_str(
      r#"
      importance_threshold = 0.5

      [heuristic]
      shared_penalty = 0.2
      "#,
    )
    .unwrap();
    assert_eq!(config.importance_threshold, 0.5);
    assert_eq!(config.heuristic.shared_penalty, 0.2);
    assert_eq!(config.heuristic.lines_cap, 500);
    assert_eq!(config.heuristic.component["api"], 0.30);
    assert_eq!(config.priority.risk, 0.40);
  }

  #[test]
  fn rejects_out_of_range_threshold() {
    let err = Config::from_toml_str("importance_threshold = 1.5").unwrap_err();
    assert!(err.to_string().contains("importance_threshold"));
  }

  #[test]
  fn rejects_negative_growth_weight() {
    let err = Config::from_toml_str("[heuristic]\nlines_weight = -0.1").unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
  }

  #[test]
  fn from_file_reads_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("impact.toml");
    std::fs::write(&path, "model_path = \"model.json\"\n").unwrap();
    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.model_path, Some(PathBuf::from("model.json")));
  }

  #[test]
  fn missing_file_is_config_error() {
    let err = Config::from_file(Path::new("/nonexistent/impact.toml")).unwrap_err();
    assert_eq!(err.kind(), "config_error");
  }
}
