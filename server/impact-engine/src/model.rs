//! Gradient-boosted tree ensemble loaded from an XGBoost JSON dump.
//!
//! Two layouts are accepted. The plain output of
//! `Booster.get_dump(dump_format="json")` is a bare array of trees; it is read
//! as a binary failure classifier with XGBoost's default `base_score` of 0.5
//! (a margin of 0). The wrapper layout below adds an explicit base and an
//! optional multi-class severity classifier. Its `base_score` values are
//! margins (log-odds), not probabilities:
//!
//! ```json
//! {
//!   "base_score": 0.0,
//!   "trees": [ {"nodeid": 0, "split": "lines_changed", "split_condition": 250.0,
//!               "yes": 1, "no": 2, "missing": 1,
//!               "children": [ {"nodeid": 1, "leaf": -0.4}, {"nodeid": 2, "leaf": 0.6} ]} ],
//!   "severity": { "classes": ["none", "minor", "major", "critical"], "trees": [ ... ] }
//! }
//! ```
//!
//! Splits name columns from [`feature_names`] or use XGBoost's positional
//! `f<N>` form. A row goes to `yes` when `value < split_condition`. Severity
//! trees are interleaved by class, as XGBoost dumps them (tree `i` belongs to
//! class `i % classes.len()`).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::EngineError;
use crate::types::*;

const NUMERIC_FEATURES: [&str; 5] = [
  "lines_changed",
  "files_changed",
  "shared_component",
  "critical_module",
  "dependency_depth",
];

/// Column names in encoding order: numerics first, then one-hot categoricals.
pub fn feature_names() -> Vec<String> {
  let mut names: Vec<String> = NUMERIC_FEATURES.iter().map(|s| s.to_string()).collect();
  names.extend(ChangeType::ALL.iter().map(|v| format!("change_type_{}", v.as_str())));
  names.extend(ComponentType::ALL.iter().map(|v| format!("component_type_{}", v.as_str())));
  names.extend(FunctionCategory::ALL.iter().map(|v| format!("function_category_{}", v.as_str())));
  names.extend(CoverageLevel::ALL.iter().map(|v| format!("test_coverage_level_{}", v.as_str())));
  names
}

/// Encode features into the fixed column order of [`feature_names`].
pub fn encode(f: &ChangeFeatures) -> Vec<f64> {
  let flag = |b: bool| if b { 1.0 } else { 0.0 };
  let mut row = vec![
    f64::from(f.lines_changed),
    f64::from(f.files_changed),
    flag(f.shared_component),
    flag(f.critical_module),
    f64::from(f.dependency_depth),
  ];
  row.extend(ChangeType::ALL.iter().map(|v| flag(*v == f.change_type)));
  row.extend(ComponentType::ALL.iter().map(|v| flag(*v == f.component_type)));
  row.extend(FunctionCategory::ALL.iter().map(|v| flag(*v == f.function_category)));
  row.extend(CoverageLevel::ALL.iter().map(|v| flag(*v == f.test_coverage_level)));
  row
}

// ---------------------------------------------------------------------------
// Dump format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ModelFile {
  #[serde(default)]
  base_score: f64,
  trees: Vec<DumpNode>,
  #[serde(default)]
  severity: Option<SeverityFile>,
}

#[derive(Debug, Deserialize)]
struct SeverityFile {
  classes: Vec<String>,
  #[serde(default)]
  base_score: f64,
  trees: Vec<DumpNode>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DumpNode {
  Leaf {
    nodeid: u32,
    leaf: f64,
  },
  Split {
    nodeid: u32,
    split: String,
    split_condition: f64,
    yes: u32,
    no: u32,
    #[serde(default)]
    #[allow(dead_code)] // encoded rows never have missing values
    missing: Option<u32>,
    children: Vec<DumpNode>,
  },
}

impl DumpNode {
  fn nodeid(&self) -> u32 {
    match self {
      Self::Leaf { nodeid, .. } | Self::Split { nodeid, .. } => *nodeid,
    }
  }
}

// ---------------------------------------------------------------------------
// Compiled trees
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Node {
  Leaf(f64),
  Split {
    feature: usize,
    threshold: f64,
    yes: usize,
    no: usize,
  },
}

/// Flat arena; children always sit at higher indices than their parent.
#[derive(Debug, Clone)]
struct Tree {
  nodes: Vec<Node>,
}

impl Tree {
  fn compile(root: &DumpNode, columns: &HashMap<String, usize>) -> Result<Self, EngineError> {
    let mut nodes = Vec::new();
    compile_node(root, columns, &mut nodes)?;
    Ok(Self { nodes })
  }

  fn eval(&self, row: &[f64]) -> f64 {
    let mut idx = 0;
    loop {
      match &self.nodes[idx] {
        Node::Leaf(v) => return *v,
        Node::Split {
          feature,
          threshold,
          yes,
          no,
        } => {
          idx = if row[*feature] < *threshold { *yes } else { *no };
        }
      }
    }
  }
}

fn compile_node(
  node: &DumpNode,
  columns: &HashMap<String, usize>,
  nodes: &mut Vec<Node>,
) -> Result<usize, EngineError> {
  let idx = nodes.len();
  match node {
    DumpNode::Leaf { leaf, .. } => {
      if !leaf.is_finite() {
        return Err(EngineError::model(format!("node {}: leaf value is not finite", node.nodeid())));
      }
      nodes.push(Node::Leaf(*leaf));
    }
    DumpNode::Split {
      nodeid,
      split,
      split_condition,
      yes,
      no,
      children,
      ..
    } => {
      let feature = resolve_column(split, columns)
        .ok_or_else(|| EngineError::model(format!("node {}: unknown feature '{}'", nodeid, split)))?;
      let child = |id: u32| {
        children
          .iter()
          .find(|c| c.nodeid() == id)
          .ok_or_else(|| EngineError::model(format!("node {}: missing child {}", nodeid, id)))
      };
      let (yes_node, no_node) = (child(*yes)?, child(*no)?);

      // Reserve the slot, then patch in child indices once they are known.
      nodes.push(Node::Leaf(0.0));
      let yes_idx = compile_node(yes_node, columns, nodes)?;
      let no_idx = compile_node(no_node, columns, nodes)?;
      nodes[idx] = Node::Split {
        feature,
        threshold: *split_condition,
        yes: yes_idx,
        no: no_idx,
      };
    }
  }
  Ok(idx)
}

/// Column by name, or by XGBoost's positional `f<N>` name.
fn resolve_column(split: &str, columns: &HashMap<String, usize>) -> Option<usize> {
  if let Some(idx) = columns.get(split) {
    return Some(*idx);
  }
  split
    .strip_prefix('f')
    .and_then(|n| n.parse::<usize>().ok())
    .filter(|n| *n < columns.len())
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct SeverityHead {
  classes: Vec<FailureSeverity>,
  base_score: f64,
  trees: Vec<Tree>,
}

/// Pretrained failure classifier with an optional severity head.
/// Read-only after loading.
#[derive(Debug, Clone)]
pub struct GradientBoostedModel {
  base_score: f64,
  trees: Vec<Tree>,
  severity: Option<SeverityHead>,
}

impl GradientBoostedModel {
  pub fn load(path: &Path) -> Result<Self, EngineError> {
    let raw = std::fs::read_to_string(path)
      .map_err(|e| EngineError::model(format!("{}: {}", path.display(), e)))?;
    Self::from_json_str(&raw)
  }

  pub fn from_json_str(raw: &str) -> Result<Self, EngineError> {
    let invalid = |e: serde_json::Error| EngineError::model(format!("invalid dump: {}", e));
    let value: serde_json::Value = serde_json::from_str(raw).map_err(invalid)?;
    let file: ModelFile = if value.is_array() {
      ModelFile {
        base_score: 0.0,
        trees: serde_json::from_value(value).map_err(invalid)?,
        severity: None,
      }
    } else {
      serde_json::from_value(value).map_err(invalid)?
    };
    if file.trees.is_empty() {
      return Err(EngineError::model("model has no trees"));
    }

    let columns: HashMap<String, usize> = feature_names()
      .into_iter()
      .enumerate()
      .map(|(i, name)| (name, i))
      .collect();

    let trees = file
      .trees
      .iter()
      .map(|t| Tree::compile(t, &columns))
      .collect::<Result<Vec<_>, _>>()?;

    let severity = match file.severity {
      Some(sev) => {
        if sev.classes.is_empty() {
          return Err(EngineError::model("severity.classes must not be empty"));
        }
        if sev.trees.len() % sev.classes.len() != 0 {
          return Err(EngineError::model(format!(
            "severity tree count {} is not a multiple of {} classes",
            sev.trees.len(),
            sev.classes.len()
          )));
        }
        let classes = sev
          .classes
          .iter()
          .map(|c| {
            FailureSeverity::from_str_loose(c)
              .ok_or_else(|| EngineError::model(format!("unknown severity class '{}'", c)))
          })
          .collect::<Result<Vec<_>, _>>()?;
        let trees = sev
          .trees
          .iter()
          .map(|t| Tree::compile(t, &columns))
          .collect::<Result<Vec<_>, _>>()?;
        Some(SeverityHead {
          classes,
          base_score: sev.base_score,
          trees,
        })
      }
      None => None,
    };

    Ok(Self {
      base_score: file.base_score,
      trees,
      severity,
    })
  }

  pub fn tree_count(&self) -> usize {
    self.trees.len()
  }

  pub fn has_severity_head(&self) -> bool {
    self.severity.is_some()
  }

  /// Failure probability for one encoded row.
  pub fn predict_proba(&self, row: &[f64]) -> f64 {
    let margin = self.base_score + self.trees.iter().map(|t| t.eval(row)).sum::<f64>();
    sigmoid(margin)
  }

  /// Argmax severity class, or `None` without a severity head.
  /// Ties resolve to the earlier class.
  pub fn predict_severity(&self, row: &[f64]) -> Option<FailureSeverity> {
    let head = self.severity.as_ref()?;
    let n = head.classes.len();
    let mut margins = vec![head.base_score; n];
    for (i, tree) in head.trees.iter().enumerate() {
      margins[i % n] += tree.eval(row);
    }
    // Softmax is monotone, so argmax over margins is argmax over probabilities.
    let mut best = 0;
    for (i, m) in margins.iter().enumerate() {
      if *m > margins[best] {
        best = i;
      }
    }
    Some(head.classes[best])
  }
}

fn sigmoid(x: f64) -> f64 {
  1.0 / (1.0 + (-x).exp())
}
