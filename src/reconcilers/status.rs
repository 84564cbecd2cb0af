// SPDX-License-Identifier: Apache-2.0

//! `Condition` helpers shared by all three reconcilers (spec.md §7:
//! `Synced`, `Ready`, `Complete`).
//!
//! # Example
//!
//! ```rust,no_run
//! use xrm_engine::reconcilers::status::create_condition;
//!
//! let condition = create_condition(
//!     "Ready",
//!     "True",
//!     "AllChildrenReady",
//!     "All composed resources report ready"
//! );
//! ```

use crate::crd::Condition;
use chrono::Utc;

/// Build a `Condition` stamped with the current timestamp.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// True if `new_condition` differs from `existing` in type, status, or
/// message. `reason` and `lastTransitionTime` are not compared — they
/// change alongside the condition itself and would make every reconcile
/// look like a status change.
#[must_use]
pub fn condition_changed(existing: &Option<Condition>, new_condition: &Condition) -> bool {
    if let Some(current) = existing {
        current.r#type != new_condition.r#type
            || current.status != new_condition.status
            || current.message != new_condition.message
    } else {
        // No existing condition, so it has changed
        true
    }
}

/// Existing `lastTransitionTime` for `condition_type` if present, else now.
/// Preserves the transition time when only the message changes.
#[must_use]
pub fn get_last_transition_time(existing_conditions: &[Condition], condition_type: &str) -> String {
    existing_conditions
        .iter()
        .find(|c| c.r#type == condition_type)
        .and_then(|c| c.last_transition_time.as_ref())
        .map_or_else(|| Utc::now().to_rfc3339(), std::string::ToString::to_string)
}

/// Find a condition by type.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
