//! Feature extraction: diff summary -> ChangeFeatures.
//!
//! Only structural problems fail (no files, empty path, missing or negative
//! line counts, bad change type). Unknown paths and modules fall back to
//! defaults.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::EngineError;
use crate::types::*;

/// Directory names too generic to name a module.
const GENERIC_SEGMENTS: &[&str] = &[
  "src", "lib", "app", "backend", "frontend", "api", "core", "server", "pkg", "internal",
];

/// Path segments that mark shared code.
const SHARED_SEGMENTS: &[&str] = &[
  "shared", "common", "util", "utils", "lib", "libs", "core", "base",
];

const MAX_DEPENDENCY_DEPTH: u32 = 10;

/// Extract the feature vector for one diff summary.
pub fn extract(summary: &DiffSummary) -> Result<ChangeFeatures, EngineError> {
  if summary.files.is_empty() {
    return Err(EngineError::extraction("files", "must contain at least one file"));
  }

  let mut change_types = Vec::with_capacity(summary.files.len());
  let mut churn = Vec::with_capacity(summary.files.len());
  for (i, file) in summary.files.iter().enumerate() {
    if file.path.trim().is_empty() {
      return Err(EngineError::extraction(&format!("files[{}].path", i), "must not be empty"));
    }
    let additions = line_count(file.additions, &format!("files[{}].additions", i))?;
    let deletions = line_count(file.deletions, &format!("files[{}].deletions", i))?;
    churn.push(additions.saturating_add(deletions));
    if file.change_type.trim().is_empty() {
      return Err(EngineError::extraction(
        &format!("files[{}].change_type", i),
        "is required",
      ));
    }
    let ct = ChangeType::from_str_loose(&file.change_type).ok_or_else(|| {
      EngineError::extraction(
        &format!("files[{}].change_type", i),
        "expected added|modified|deleted|renamed",
      )
    })?;
    change_types.push(ct);
  }

  let paths: Vec<String> = summary.files.iter().map(|f| clean_path(&f.path)).collect();

  let lines_changed = churn.iter().fold(0u32, |acc, n| acc.saturating_add(*n));
  let files_changed = u32::try_from(summary.files.len()).unwrap_or(u32::MAX);

  let change_type = dominant_change_type(&change_types);
  let component_type = paths
    .iter()
    .map(|p| component_for_path(p))
    .max_by_key(|c| c.risk_rank())
    .unwrap_or(ComponentType::Other);

  let module_name = infer_module(summary, &paths, &churn);
  let function_category = infer_function_category(&module_name, &paths);
  let shared_component = paths
    .iter()
    .any(|p| is_shared_path(p, &summary.module_hints.shared_paths));
  let critical_module = summary
    .module_hints
    .critical_modules
    .iter()
    .any(|m| m.eq_ignore_ascii_case(&module_name));
  let test_coverage_level = lookup_coverage(&summary.coverage_map, &module_name);
  let dependency_depth = paths
    .iter()
    .map(|p| p.matches('/').count() as u32)
    .max()
    .unwrap_or(0)
    .min(MAX_DEPENDENCY_DEPTH);

  let features = ChangeFeatures {
    lines_changed,
    files_changed,
    change_type,
    component_type,
    module_name,
    function_category,
    test_coverage_level,
    shared_component,
    critical_module,
    dependency_depth,
  };
  debug!(
    module = %features.module_name,
    component = features.component_type.as_str(),
    change_type = features.change_type.as_str(),
    lines = features.lines_changed,
    files = features.files_changed,
    "extracted change features"
  );
  Ok(features)
}

fn line_count(value: Option<i64>, field: &str) -> Result<u32, EngineError> {
  match value {
    None => Err(EngineError::extraction(field, "is required")),
    Some(n) if n < 0 => Err(EngineError::extraction(field, "must not be negative")),
    Some(n) => Ok(u32::try_from(n).unwrap_or(u32::MAX)),
  }
}

/// Most frequent change type; ties go to the riskier type
/// (deleted > modified > added > renamed).
fn dominant_change_type(types: &[ChangeType]) -> ChangeType {
  let mut counts: BTreeMap<ChangeType, usize> = BTreeMap::new();
  for ct in types {
    *counts.entry(*ct).or_insert(0) += 1;
  }
  counts
    .into_iter()
    .max_by_key(|(ct, n)| (*n, ct.risk_rank()))
    .map(|(ct, _)| ct)
    .unwrap_or(ChangeType::Modified)
}

/// Component type from path patterns. First matching rule wins.
pub fn component_for_path(path: &str) -> ComponentType {
  // Leading slash lets "/tests/" match a repo-root "tests/..." path.
  let p = format!("/{}", path.to_ascii_lowercase());
  let file_name = p.rsplit('/').next().unwrap_or("");

  if p.contains("/test/")
    || p.contains("/tests/")
    || p.contains("/__tests__/")
    || p.contains("/spec/")
    || p.contains("_test.")
    || p.contains(".test.")
    || p.contains(".spec.")
    || file_name.starts_with("test_")
  {
    return ComponentType::Test;
  }
  if p.contains("/api/")
    || p.contains("/routes/")
    || p.contains("/endpoints/")
    || p.contains("/controllers/")
    || file_name.contains("controller")
  {
    return ComponentType::Api;
  }
  if p.contains("/static/")
    || p.contains("/templates/")
    || p.contains("/components/")
    || p.contains("/pages/")
    || p.contains("/views/")
    || has_extension(file_name, &["html", "css", "scss", "less", "jsx", "tsx", "vue", "svelte"])
  {
    return ComponentType::Ui;
  }
  if p.contains("/config/")
    || p.contains("settings")
    || file_name.starts_with(".env")
    || file_name == "dockerfile"
    || has_extension(file_name, &["json", "yaml", "yml", "toml", "ini", "cfg", "conf"])
  {
    return ComponentType::Config;
  }
  if p.contains("/services/")
    || p.contains("/service/")
    || has_extension(
      file_name,
      &["py", "rs", "go", "js", "ts", "java", "kt", "rb", "cs", "php", "scala"],
    )
  {
    return ComponentType::Service;
  }
  ComponentType::Other
}

fn has_extension(file_name: &str, exts: &[&str]) -> bool {
  match file_name.rsplit_once('.') {
    Some((stem, ext)) if !stem.is_empty() => exts.contains(&ext),
    _ => false,
  }
}

/// Module name: configured prefix hint, else nearest meaningful directory of
/// the highest-churn file, else its file stem.
fn infer_module(summary: &DiffSummary, paths: &[String], churn: &[u32]) -> String {
  for p in paths {
    let lower = p.to_ascii_lowercase();
    let hit = summary
      .module_hints
      .modules
      .iter()
      .filter(|(prefix, _)| has_path_prefix(&lower, prefix))
      .max_by_key(|(prefix, _)| prefix.len());
    if let Some((_, module)) = hit {
      return module.clone();
    }
  }

  // Highest churn; first file wins ties.
  let mut hot = 0usize;
  let mut hot_churn = 0u32;
  for (i, n) in churn.iter().enumerate() {
    if *n > hot_churn {
      hot = i;
      hot_churn = *n;
    }
  }
  let segments: Vec<&str> = paths[hot].split('/').collect();
  let (file_name, dirs) = match segments.split_last() {
    Some((name, dirs)) => (*name, dirs),
    None => ("", &[][..]),
  };

  let dir = dirs.iter().rev().find(|seg| {
    let s = seg.to_ascii_lowercase();
    !s.starts_with('.') && !s.starts_with("__") && !GENERIC_SEGMENTS.contains(&s.as_str())
  });
  if let Some(dir) = dir {
    return dir.to_string();
  }

  let stem = file_name.split('.').next().unwrap_or("");
  if stem.is_empty() {
    "root".to_string()
  } else {
    stem.to_string()
  }
}

const CATEGORY_KEYWORDS: &[(FunctionCategory, &[&str])] = &[
  (
    FunctionCategory::Auth,
    &["auth", "login", "oauth", "credential", "token", "session", "permission", "jwt", "password"],
  ),
  (
    FunctionCategory::Payment,
    &["payment", "billing", "subscription", "transaction", "wallet", "payout", "refund", "invoice", "stripe", "checkout"],
  ),
  (
    FunctionCategory::Search,
    &["search", "query", "filter", "ranking", "autocomplete", "facet"],
  ),
  (
    FunctionCategory::Profile,
    &["profile", "avatar", "user", "notification", "privacy", "account"],
  ),
  (
    FunctionCategory::Analytics,
    &["analytics", "metric", "insight", "trend", "dashboard", "report"],
  ),
  (
    FunctionCategory::Admin,
    &["admin", "role", "audit", "maintenance", "feature_flag", "monitor"],
  ),
  (
    FunctionCategory::Data,
    &["data", "model", "schema", "migration", "database", "repository", "store"],
  ),
  (
    FunctionCategory::Util,
    &["util", "helper", "common", "shared"],
  ),
];

/// Category by keyword, checking the module name before the paths.
fn infer_function_category(module_name: &str, paths: &[String]) -> FunctionCategory {
  let module = module_name.to_ascii_lowercase();
  if let Some(cat) = match_category(&module) {
    return cat;
  }
  let joined = paths.join(" ").to_ascii_lowercase();
  match_category(&joined).unwrap_or(FunctionCategory::Misc)
}

fn match_category(haystack: &str) -> Option<FunctionCategory> {
  CATEGORY_KEYWORDS
    .iter()
    .find(|(_, words)| words.iter().any(|w| haystack.contains(w)))
    .map(|(cat, _)| *cat)
}

fn is_shared_path(path: &str, shared_paths: &[String]) -> bool {
  let lower = path.to_ascii_lowercase();
  let mut dirs: Vec<&str> = lower.split('/').collect();
  dirs.pop();
  if dirs.iter().any(|seg| SHARED_SEGMENTS.contains(seg)) {
    return true;
  }
  shared_paths.iter().any(|prefix| has_path_prefix(&lower, prefix))
}

/// True when `prefix` names `path` or one of its parent directories. Matches
/// whole segments, so `backend/auth` does not claim `backend/authz`.
fn has_path_prefix(lower_path: &str, prefix: &str) -> bool {
  let prefix = clean_path(prefix).to_ascii_lowercase();
  let prefix = prefix.trim_end_matches('/');
  if prefix.is_empty() {
    return false;
  }
  match lower_path.strip_prefix(prefix) {
    Some(rest) => rest.is_empty() || rest.starts_with('/'),
    None => false,
  }
}

/// Exact module key first, then case-insensitive. Missing means `none`.
fn lookup_coverage(map: &BTreeMap<String, CoverageLevel>, module_name: &str) -> CoverageLevel {
  map
    .get(module_name)
    .or_else(|| {
      map
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(module_name))
        .map(|(_, v)| v)
    })
    .copied()
    .unwrap_or(CoverageLevel::None)
}

/// Normalize a path for matching, keeping case:
/// - backslash -> forward slash
/// - collapse repeated slashes
/// - strip leading ./ and /
fn clean_path(p: &str) -> String {
  let s = p.trim().replace('\\', "/");
  let mut out = String::with_capacity(s.len());
  let mut prev_slash = false;
  for ch in s.chars() {
    if ch == '/' {
      if !prev_slash {
        out.push('/');
      }
      prev_slash = true;
    } else {
      prev_slash = false;
      out.push(ch);
    }
  }
  let trimmed = out.strip_prefix("./").unwrap_or(&out);
  trimmed.trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn file(path: &str, additions: u32, deletions: u32, change_type: &str) -> FileChange {
    FileChange {
      path: path.into(),
      additions: Some(additions.into()),
      deletions: Some(deletions.into()),
      change_type: change_type.into(),
    }
  }

  fn summary(files: Vec<FileChange>) -> DiffSummary {
    DiffSummary {
      files,
      ..Default::default()
    }
  }

  #[test]
  fn clean_path_basics() {
    assert_eq!(clean_path("src\\auth\\jwt.go"), "src/auth/jwt.go");
    assert_eq!(clean_path("./src//utils/index.ts"), "src/utils/index.ts");
    assert_eq!(clean_path("/App/Main.py"), "App/Main.py");
  }

  #[test]
  fn component_patterns_first_match_wins() {
    assert_eq!(component_for_path("backend/api/routes.py"), ComponentType::Api);
    assert_eq!(component_for_path("web/static/app.js"), ComponentType::Ui);
    assert_eq!(component_for_path("templates/index.html"), ComponentType::Ui);
    assert_eq!(component_for_path("config/app.yaml"), ComponentType::Config);
    assert_eq!(component_for_path(".env.production"), ComponentType::Config);
    assert_eq!(component_for_path("billing/service.py"), ComponentType::Service);
    assert_eq!(component_for_path("LICENSE"), ComponentType::Other);
    // Test patterns are checked before api patterns.
    assert_eq!(component_for_path("tests/api/test_login.py"), ComponentType::Test);
    assert_eq!(component_for_path("src/api/user.test.ts"), ComponentType::Test);
  }

  #[test]
  fn dominant_change_type_prefers_majority() {
    let types = [ChangeType::Added, ChangeType::Added, ChangeType::Deleted];
    assert_eq!(dominant_change_type(&types), ChangeType::Added);
  }

  #[test]
  fn dominant_change_type_ties_break_by_risk() {
    let types = [ChangeType::Renamed, ChangeType::Added, ChangeType::Modified];
    assert_eq!(dominant_change_type(&types), ChangeType::Modified);
    let types = [ChangeType::Modified, ChangeType::Deleted];
    assert_eq!(dominant_change_type(&types), ChangeType::Deleted);
    let types = [ChangeType::Renamed, ChangeType::Added];
    assert_eq!(dominant_change_type(&types), ChangeType::Added);
  }

  #[test]
  fn extract_rejects_empty_files() {
    let err = extract(&summary(vec![])).unwrap_err();
    assert!(err.to_string().contains("files"));
  }

  #[test]
  fn extract_rejects_empty_path() {
    let err = extract(&summary(vec![file("a.py", 1, 0, "added"), file("  ", 1, 0, "added")]))
      .unwrap_err();
    assert!(err.to_string().contains("files[1].path"));
  }

  #[test]
  fn extract_rejects_missing_or_unknown_change_type() {
    let err = extract(&summary(vec![file("a.py", 1, 0, "")])).unwrap_err();
    assert!(err.to_string().contains("files[0].change_type"));
    let err = extract(&summary(vec![file("a.py", 1, 0, "copied")])).unwrap_err();
    assert!(err.to_string().contains("expected added"));
  }

  #[test]
  fn extract_accepts_loose_change_types() {
    let f = extract(&summary(vec![file("a.py", 1, 0, "removed"), file("b.py", 1, 0, "D")])).unwrap();
    assert_eq!(f.change_type, ChangeType::Deleted);
  }

  #[test]
  fn extract_sums_lines_and_counts_files() {
    let f = extract(&summary(vec![
      file("src/payments/charge.py", 40, 10, "modified"),
      file("src/payments/refund.py", 5, 5, "modified"),
    ]))
    .unwrap();
    assert_eq!(f.lines_changed, 60);
    assert_eq!(f.files_changed, 2);
    assert_eq!(f.module_name, "payments");
    assert_eq!(f.function_category, FunctionCategory::Payment);
    assert_eq!(f.component_type, ComponentType::Service);
    assert_eq!(f.dependency_depth, 2);
  }

  #[test]
  fn lines_changed_saturates() {
    let f = extract(&summary(vec![
      file("a.py", u32::MAX, 1, "modified"),
      file("b.py", 5, 0, "modified"),
    ]))
    .unwrap();
    assert_eq!(f.lines_changed, u32::MAX);
  }

  #[test]
  fn component_is_riskiest_among_files() {
    let f = extract(&summary(vec![
      file("web/static/app.css", 5, 0, "modified"),
      file("backend/api/orders.py", 5, 0, "modified"),
      file("tests/test_orders.py", 5, 0, "modified"),
    ]))
    .unwrap();
    assert_eq!(f.component_type, ComponentType::Api);
  }

  #[test]
  fn module_hint_longest_prefix_wins() {
    let mut s = summary(vec![file("backend/auth/oauth/google.py", 10, 2, "modified")]);
    s.module_hints.modules.insert("backend/".into(), "Backend".into());
    s.module_hints.modules.insert("backend/auth/".into(), "AuthService".into());
    let f = extract(&s).unwrap();
    assert_eq!(f.module_name, "AuthService");
    assert_eq!(f.function_category, FunctionCategory::Auth);
  }

  #[test]
  fn module_from_highest_churn_file_skips_generic_dirs() {
    let f = extract(&summary(vec![
      file("src/search/index.rs", 3, 0, "modified"),
      file("src/reports/monthly.rs", 90, 10, "modified"),
    ]))
    .unwrap();
    assert_eq!(f.module_name, "reports");
    assert_eq!(f.function_category, FunctionCategory::Analytics);
  }

  #[test]
  fn module_falls_back_to_file_stem() {
    let f = extract(&summary(vec![file("src/main.py", 3, 0, "modified")])).unwrap();
    assert_eq!(f.module_name, "main");
  }

  #[test]
  fn unknown_paths_use_defaults() {
    let f = extract(&summary(vec![file("zzz/qqq", 1, 0, "added")])).unwrap();
    assert_eq!(f.component_type, ComponentType::Other);
    assert_eq!(f.function_category, FunctionCategory::Misc);
    assert_eq!(f.test_coverage_level, CoverageLevel::None);
    assert!(!f.shared_component);
    assert!(!f.critical_module);
  }

  #[test]
  fn coverage_lookup_is_case_insensitive_and_defaults_to_none() {
    let mut s = summary(vec![file("src/payments/charge.py", 1, 0, "modified")]);
    s.coverage_map.insert("Payments".into(), CoverageLevel::High);
    assert_eq!(extract(&s).unwrap().test_coverage_level, CoverageLevel::High);

    s.coverage_map.clear();
    s.coverage_map.insert("other".into(), CoverageLevel::High);
    assert_eq!(extract(&s).unwrap().test_coverage_level, CoverageLevel::None);
  }

  #[test]
  fn shared_and_critical_flags() {
    let mut s = summary(vec![
      file("src/common/format.py", 1, 0, "modified"),
      file("src/billing/invoice.py", 50, 0, "modified"),
    ]);
    s.module_hints.critical_modules.push("BILLING".into());
    let f = extract(&s).unwrap();
    assert!(f.shared_component);
    assert!(f.critical_module);
    assert_eq!(f.module_name, "billing");
  }

  #[test]
  fn shared_paths_hint_marks_shared() {
    let mut s = summary(vec![file("packages/kit/button.tsx", 1, 0, "modified")]);
    assert!(!extract(&s).unwrap().shared_component);
    s.module_hints.shared_paths.push("packages/kit".into());
    assert!(extract(&s).unwrap().shared_component);
  }

  #[test]
  fn dependency_depth_is_capped() {
    let deep = "a/b/c/d/e/f/g/h/i/j/k/l/m.py";
    let f = extract(&summary(vec![file(deep, 1, 0, "modified")])).unwrap();
    assert_eq!(f.dependency_depth, MAX_DEPENDENCY_DEPTH);
  }

  #[test]
  fn missing_line_counts_are_rejected() {
    let mut f = file("backend/api/pay.py", 3, 1, "modified");
    f.additions = None;
    let err = extract(&summary(vec![f])).unwrap_err();
    assert!(matches!(err, EngineError::Extraction { ref field, .. } if field == "files[0].additions"));

    let mut f = file("backend/api/pay.py", 3, 1, "modified");
    f.deletions = None;
    let err = extract(&summary(vec![file("a.py", 1, 0, "added"), f])).unwrap_err();
    assert!(matches!(err, EngineError::Extraction { ref field, .. } if field == "files[1].deletions"));
  }

  #[test]
  fn negative_line_counts_are_rejected() {
    let json = r#"{"files": [{"path": "backend/api/pay.py", "additions": -3, "deletions": 0, "change_type": "modified"}]}"#;
    let s: DiffSummary = serde_json::from_str(json).unwrap();
    let err = extract(&s).unwrap_err();
    assert_eq!(err.kind(), "extraction_error");
    assert!(err.to_string().contains("files[0].additions"), "{}", err);
  }

  #[test]
  fn missing_files_key_reports_files_field() {
    let s: DiffSummary = serde_json::from_str("{}").unwrap();
    let err = extract(&s).unwrap_err();
    assert!(matches!(err, EngineError::Extraction { ref field, .. } if field == "files"));
  }

  #[test]
  fn prefixes_match_whole_segments() {
    let mut s = summary(vec![file("backend/authz/policy.py", 10, 2, "modified")]);
    s.module_hints.modules.insert("backend/auth".into(), "AuthService".into());
    s.module_hints.shared_paths.push("backend/auth".into());
    let f = extract(&s).unwrap();
    assert_eq!(f.module_name, "authz");
    assert!(!f.shared_component);

    let mut s = summary(vec![file("backend/auth/policy.py", 10, 2, "modified")]);
    s.module_hints.modules.insert("backend/auth".into(), "AuthService".into());
    s.module_hints.shared_paths.push("backend/auth/".into());
    let f = extract(&s).unwrap();
    assert_eq!(f.module_name, "AuthService");
    assert!(f.shared_component);
  }
}
