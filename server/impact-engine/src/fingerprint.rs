//! Stable fingerprint of change features, for caching verdicts by input.

use crate::types::ChangeFeatures;

/// Hash every feature in a fixed order with blake3.
///
/// Identical features always share a fingerprint, so callers can reuse a
/// stored verdict for as long as the scorer is unchanged.
pub fn compute(f: &ChangeFeatures) -> String {
  let mut hasher = blake3::Hasher::new();
  hasher.update(&f.lines_changed.to_le_bytes());
  hasher.update(&f.files_changed.to_le_bytes());
  hasher.update(f.change_type.as_str().as_bytes());
  hasher.update(b"|");
  hasher.update(f.component_type.as_str().as_bytes());
  hasher.update(b"|");
  // Length prefix keeps arbitrary module names from bleeding into the next field.
  hasher.update(&(f.module_name.len() as u64).to_le_bytes());
  hasher.update(f.module_name.as_bytes());
  hasher.update(f.function_category.as_str().as_bytes());
  hasher.update(b"|");
  hasher.update(f.test_coverage_level.as_str().as_bytes());
  hasher.update(b"|");
  hasher.update(&[f.shared_component as u8, f.critical_module as u8]);
  hasher.update(&f.dependency_depth.to_le_bytes());

  let hex = hasher.finalize().to_hex();
  format!("fp-{}", &hex[..32])
}
