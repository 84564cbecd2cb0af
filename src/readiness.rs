// SPDX-License-Identifier: Apache-2.0

//! Readiness evaluation for a composed child (spec.md §4.3.5).
//!
//! The default, absent any explicit checks on the template, is "the
//! child's own `Ready` condition is true". A template may instead declare
//! one or more explicit checks; all must pass for the child to count as
//! ready.

use regex::Regex;

use crate::constants::{CONDITION_READY, STATUS_TRUE};
use crate::crd::{Condition, ReadinessCheck};
use crate::fieldpath;

/// Evaluate whether `child` (its full `{spec, status, ...}` JSON body) is
/// ready, per `checks`. An empty `checks` list falls back to the default
/// `Ready` condition check.
#[must_use]
pub fn is_ready(child: &serde_json::Value, checks: &[ReadinessCheck]) -> bool {
    if checks.is_empty() {
        return default_ready_condition(child);
    }
    checks.iter().all(|check| evaluate(child, check))
}

fn default_ready_condition(child: &serde_json::Value) -> bool {
    let Some(conditions) = child.get("status").and_then(|s| s.get("conditions")) else {
        return false;
    };
    let Ok(conditions) = serde_json::from_value::<Vec<Condition>>(conditions.clone()) else {
        return false;
    };
    conditions.iter().any(|c| c.r#type == CONDITION_READY && c.status == STATUS_TRUE)
}

fn evaluate(child: &serde_json::Value, check: &ReadinessCheck) -> bool {
    match check {
        ReadinessCheck::FieldExists { field_path } => fieldpath::exists(child, field_path),
        ReadinessCheck::FieldEquals { field_path, match_value } => {
            fieldpath::get(child, field_path).and_then(|v| v.as_str()).is_some_and(|v| v == match_value)
        }
        ReadinessCheck::FieldMatchesRegex { field_path, match_regex } => {
            let Ok(regex) = Regex::new(match_regex) else { return false };
            fieldpath::get(child, field_path).and_then(|v| v.as_str()).is_some_and(|v| regex.is_match(v))
        }
    }
}

#[cfg(test)]
#[path = "readiness_tests.rs"]
mod tests;
