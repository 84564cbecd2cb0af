// SPDX-License-Identifier: Apache-2.0

//! The three control loops (spec.md §4): Composite, Claim, and Operation.
//!
//! Each reconciler follows the same shape: watch → fetch → derive desired
//! state → converge → write status, with finalizer-gated cleanup on
//! deletion (`finalizers`), shared [`crate::crd::Condition`] plumbing
//! (`status`), and backoff for the API/RPC calls beneath it (`retry`).

pub mod claim;
pub mod composite;
pub mod finalizers;
pub mod operation;
pub mod retry;
pub mod status;


pub use claim::{delete_claim, reconcile_claim};
pub use composite::{delete_composite, reconcile_composite};
pub use operation::reconcile_operation;

/// True if the resource's spec has changed since the controller last
/// recorded `status.observedGeneration` — the standard Kubernetes
/// generation-tracking pattern.
#[must_use]
pub fn should_reconcile(current_generation: Option<i64>, observed_generation: Option<i64>) -> bool {
    match (current_generation, observed_generation) {
        (Some(current), Some(observed)) => current != observed,
        (Some(_), None) => true,
        _ => false,
    }
}

/// True if `new_value` differs from `current_value`. Guards every status
/// write so a reconcile that changed nothing doesn't re-trigger itself via
/// its own "object updated" watch event.
#[must_use]
pub fn status_changed<T: PartialEq>(current_value: &Option<T>, new_value: &Option<T>) -> bool {
    current_value != new_value
}
