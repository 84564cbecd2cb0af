// SPDX-License-Identifier: Apache-2.0

//! Owner-reference helpers and the ownership predicate (spec.md §3 "Ownership
//! and lifecycle", §4.3.4, I2).

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::DynamicObject;
use kube::ResourceExt;

/// Build the controller owner reference an XR stamps onto a composed child,
/// or an Operation stamps onto a resource it patches into being.
///
/// `block_owner_deletion` should be `true` under a `Foreground`
/// composite-delete policy (spec.md §3: "sets `blockOwnerDeletion=true` so
/// the store holds the XR until all children disappear").
#[must_use]
pub fn controller_owner_reference(
    api_version: &str,
    kind: &str,
    name: &str,
    uid: &str,
    block_owner_deletion: bool,
) -> OwnerReference {
    OwnerReference {
        api_version: api_version.to_string(),
        kind: kind.to_string(),
        name: name.to_string(),
        uid: uid.to_string(),
        controller: Some(true),
        block_owner_deletion: Some(block_owner_deletion),
    }
}

/// The controller owner reference on `object`, if any (at most one owner
/// reference may have `controller=true` per the Kubernetes object model).
#[must_use]
pub fn controller_owner_uid(object: &DynamicObject) -> Option<&str> {
    object
        .owner_references()
        .iter()
        .find(|owner| owner.controller == Some(true))
        .map(|owner| owner.uid.as_str())
}

/// The ownership predicate gating apply (spec.md §4.3.4: "refuse to take
/// over an object not controlled by this XR's UID", I2). An object with no
/// controller owner yet is adoptable; one controlled by a different UID is
/// not.
#[must_use]
pub fn is_controlled_by(object: &DynamicObject, controller_uid: &str) -> bool {
    match controller_owner_uid(object) {
        None => true,
        Some(existing) => existing == controller_uid,
    }
}

#[cfg(test)]
#[path = "owner_tests.rs"]
mod tests;
