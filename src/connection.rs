// SPDX-License-Identifier: Apache-2.0

//! Connection-detail extraction and additive secret aggregation (spec.md
//! §4.3.5, §4.4, I4).
//!
//! Extraction reads a child's observed fields into named byte values;
//! aggregation merges those into a secret's existing data additively — a
//! key absent from this tick's extraction is left untouched, never
//! removed (I4).

use std::collections::BTreeMap;

use crate::crd::ConnectionDetail;
use crate::fieldpath;

/// Extract connection details from an observed child per its template's
/// `connectionDetails` list (spec.md §4.3.5). A detail whose source field
/// is absent is silently skipped — connection details are best-effort,
/// unlike `fromCompositeFieldPath` render patches.
#[must_use]
pub fn extract(child: &serde_json::Value, details: &[ConnectionDetail]) -> BTreeMap<String, String> {
    let mut extracted = BTreeMap::new();
    for detail in details {
        if let Some(value) = fieldpath::get(child, &detail.from_field_path) {
            if let Some(s) = value.as_str() {
                extracted.insert(detail.name.clone(), s.to_string());
            } else if !value.is_null() {
                extracted.insert(detail.name.clone(), value.to_string());
            }
        }
    }
    extracted
}

/// Merge `extracted` into `existing` additively (I4): keys in `extracted`
/// overwrite the corresponding key in `existing`; keys present in
/// `existing` but absent from `extracted` are retained unchanged.
pub fn merge_additive(existing: &mut BTreeMap<String, String>, extracted: &BTreeMap<String, String>) {
    for (key, value) in extracted {
        existing.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
