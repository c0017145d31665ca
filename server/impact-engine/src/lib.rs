//! Impact Engine: change risk scoring and test prioritization.
//!
//! Pipeline: diff summary -> [`extract`] -> [`scorer`] -> [`classify`] ->
//! verdict -> [`prioritize`]. Every stage is a pure function; [`Engine`]
//! bundles the scorer chosen at startup with the configuration.
//!
//! No DB, no network, no clock.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod heuristic;
pub mod model;
pub mod prioritize;
pub mod scorer;
pub mod types;

pub use config::Config;
pub use engine::Engine;
pub use error::EngineError;
pub use scorer::RiskScorer;
pub use types::{
  AnalysisReport, ChangeFeatures, DiffSummary, PrioritizeInput, PrioritizedTest, RiskLevel,
  RiskPrediction, TestCandidate, TestPlan,
};
