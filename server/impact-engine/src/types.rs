//! Core types for the impact engine (JSON contracts + internal models).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Inbound types (JSON contract with the webhook handler)
// ---------------------------------------------------------------------------

/// One diff summary for a commit or push. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiffSummary {
  /// A missing list reads as empty and is rejected during extraction.
  #[serde(default)]
  pub files: Vec<FileChange>,
  #[serde(default)]
  pub module_hints: ModuleHints,
  /// Test coverage per module name.
  #[serde(default)]
  pub coverage_map: BTreeMap<String, CoverageLevel>,
}

/// Per-file change record. Every field is validated during extraction so a
/// missing or negative value reports the offending field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileChange {
  #[serde(default)]
  pub path: String,
  #[serde(default)]
  pub additions: Option<i64>,
  #[serde(default)]
  pub deletions: Option<i64>,
  #[serde(default, alias = "status")]
  pub change_type: String,
}

/// Repository metadata that steers module inference.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleHints {
  /// Path prefix -> module name. Longest matching prefix wins.
  #[serde(default)]
  pub modules: BTreeMap<String, String>,
  /// Module names considered critical for this repository.
  #[serde(default)]
  pub critical_modules: Vec<String>,
  /// Extra path prefixes that count as shared components.
  #[serde(default)]
  pub shared_paths: Vec<String>,
}

// ---------------------------------------------------------------------------
// Categorical features
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
  Added,
  Modified,
  Deleted,
  Renamed,
}

impl ChangeType {
  pub const ALL: [ChangeType; 4] = [Self::Added, Self::Modified, Self::Deleted, Self::Renamed];

  pub fn from_str_loose(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "added" | "add" | "a" | "new" => Some(Self::Added),
      "modified" | "modify" | "m" | "changed" => Some(Self::Modified),
      "deleted" | "delete" | "removed" | "d" => Some(Self::Deleted),
      "renamed" | "rename" | "r" => Some(Self::Renamed),
      _ => None,
    }
  }

  /// Tie-break order when picking the dominant change type.
  pub fn risk_rank(self) -> u8 {
    match self {
      Self::Deleted => 3,
      Self::Modified => 2,
      Self::Added => 1,
      Self::Renamed => 0,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Added => "added",
      Self::Modified => "modified",
      Self::Deleted => "deleted",
      Self::Renamed => "renamed",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
  Api,
  Service,
  Ui,
  Config,
  Test,
  Other,
}

impl ComponentType {
  pub const ALL: [ComponentType; 6] = [
    Self::Api,
    Self::Service,
    Self::Ui,
    Self::Config,
    Self::Test,
    Self::Other,
  ];

  /// Higher means riskier; used to pick one component for a multi-file change.
  pub fn risk_rank(self) -> u8 {
    match self {
      Self::Api => 5,
      Self::Config => 4,
      Self::Service => 3,
      Self::Ui => 2,
      Self::Other => 1,
      Self::Test => 0,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Api => "api",
      Self::Service => "service",
      Self::Ui => "ui",
      Self::Config => "config",
      Self::Test => "test",
      Self::Other => "other",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionCategory {
  Auth,
  Payment,
  Data,
  Search,
  Profile,
  Analytics,
  Admin,
  Util,
  Misc,
}

impl FunctionCategory {
  pub const ALL: [FunctionCategory; 9] = [
    Self::Auth,
    Self::Payment,
    Self::Data,
    Self::Search,
    Self::Profile,
    Self::Analytics,
    Self::Admin,
    Self::Util,
    Self::Misc,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Auth => "auth",
      Self::Payment => "payment",
      Self::Data => "data",
      Self::Search => "search",
      Self::Profile => "profile",
      Self::Analytics => "analytics",
      Self::Admin => "admin",
      Self::Util => "util",
      Self::Misc => "misc",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageLevel {
  None,
  Low,
  Medium,
  High,
}

impl CoverageLevel {
  pub const ALL: [CoverageLevel; 4] = [Self::None, Self::Low, Self::Medium, Self::High];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::None => "none",
      Self::Low => "low",
      Self::Medium => "medium",
      Self::High => "high",
    }
  }
}

// ---------------------------------------------------------------------------
// Change features
// ---------------------------------------------------------------------------

/// Fixed attribute vector extracted from one diff. Never mutated after extraction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeFeatures {
  pub lines_changed: u32,
  pub files_changed: u32,
  pub change_type: ChangeType,
  pub component_type: ComponentType,
  pub module_name: String,
  pub function_category: FunctionCategory,
  pub test_coverage_level: CoverageLevel,
  pub shared_component: bool,
  #[serde(default)]
  pub critical_module: bool,
  /// Deepest directory nesting among changed files, capped at 10.
  #[serde(default)]
  pub dependency_depth: u32,
}

// ---------------------------------------------------------------------------
// Scoring + classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureSeverity {
  None,
  Minor,
  Major,
  Critical,
}

impl FailureSeverity {
  pub const ALL: [FailureSeverity; 4] = [Self::None, Self::Minor, Self::Major, Self::Critical];

  pub fn from_str_loose(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "none" => Some(Self::None),
      "minor" | "low" => Some(Self::Minor),
      "major" | "medium" => Some(Self::Major),
      "critical" | "high" => Some(Self::Critical),
      _ => None,
    }
  }
}

/// Raw scorer output, before banding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOutcome {
  pub risk_score: f64,
  pub failure_occurred: bool,
  pub failure_severity: FailureSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
  None,
  Low,
  Medium,
  High,
}

impl RiskLevel {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::None => "NONE",
      Self::Low => "LOW",
      Self::Medium => "MEDIUM",
      Self::High => "HIGH",
    }
  }
}

/// The persisted verdict. Dashboards and CI integrations consume this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
  pub risk_score: f64,
  pub risk_level: RiskLevel,
  pub failure_occurred: bool,
  pub failure_severity: FailureSeverity,
  pub recommended_action: String,
  #[serde(default)]
  pub affected_scope: BTreeSet<String>,
}

/// Output of the full analyze pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
  pub fingerprint: String,
  pub scorer: String,
  pub features: ChangeFeatures,
  pub prediction: RiskPrediction,
}

// ---------------------------------------------------------------------------
// Prioritization
// ---------------------------------------------------------------------------

/// One generated test candidate. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCandidate {
  /// Empty names are filled in as `test_<rank>` after ranking.
  #[serde(default)]
  pub name: String,
  #[serde(default = "default_method")]
  pub method: String,
  #[serde(default = "default_endpoint")]
  pub endpoint: String,
  #[serde(default = "default_status")]
  pub expected_status: u16,
  #[serde(default = "default_category")]
  pub category: String,
  #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
  pub payload: serde_json::Value,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub description: String,
}

fn default_method() -> String {
  "GET".to_string()
}

fn default_endpoint() -> String {
  "/".to_string()
}

fn default_status() -> u16 {
  200
}

fn default_category() -> String {
  "functional".to_string()
}

/// Prioritizer input: candidates plus the verdict of the owning change.
#[derive(Debug, Clone, Deserialize)]
pub struct PrioritizeInput {
  pub candidates: Vec<TestCandidate>,
  #[serde(alias = "context", alias = "prediction")]
  pub verdict: RiskPrediction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrioritizedTest {
  #[serde(flatten)]
  pub candidate: TestCandidate,
  pub priority_score: f64,
  pub priority_level: RiskLevel,
  /// 1-based position in the ordered plan.
  pub rank: usize,
  pub is_important: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
  /// At least one test cleared the importance threshold.
  Important,
  /// Nothing cleared it; the top half was selected instead.
  All,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskContext {
  pub risk_score: f64,
  pub risk_level: RiskLevel,
  pub critical_module: bool,
  pub importance_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestPlan {
  pub selected_tests: Vec<PrioritizedTest>,
  pub all_tests: Vec<PrioritizedTest>,
  pub selection: Selection,
  pub total_count: usize,
  pub selected_count: usize,
  pub risk_context: RiskContext,
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// Structured error output written instead of a result document.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub kind: String,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      error: true,
      kind: kind.into(),
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}
