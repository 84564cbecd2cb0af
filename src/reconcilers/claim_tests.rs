// SPDX-License-Identifier: Apache-2.0

use super::*;
use kube::api::ApiResource;
use kube::core::GroupVersionKind;
use serde_json::{json, Value};

fn dynamic_composite(conditions: Value) -> DynamicObject {
    DynamicObject::new("demo-xyz12", &ApiResource::from_gvk(&GroupVersionKind::gvk("example.org", "v1", "XDatabase")))
        .data(json!({ "spec": {}, "status": { "conditions": conditions } }))
}

#[test]
fn is_ready_true_when_ready_condition_is_true() {
    let composite = Composite::new(dynamic_composite(json!([
        { "type": "Ready", "status": "True", "reason": "Available", "message": null, "lastTransitionTime": null }
    ])));

    assert!(is_ready(&composite));
}

#[test]
fn is_ready_false_when_ready_condition_is_false() {
    let composite = Composite::new(dynamic_composite(json!([
        { "type": "Ready", "status": "False", "reason": "Waiting", "message": null, "lastTransitionTime": null }
    ])));

    assert!(!is_ready(&composite));
}

#[test]
fn is_ready_false_when_no_conditions_reported_yet() {
    let composite = Composite::new(dynamic_composite(json!([])));

    assert!(!is_ready(&composite));
}

#[test]
fn patch_conflict_aware_error_maps_http_409_to_conflict() {
    let err = kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".into(),
        message: "conflict".into(),
        reason: "Conflict".into(),
        code: 409,
    });

    assert!(matches!(patch_conflict_aware_error(err), EngineError::Conflict));
}

#[test]
fn patch_conflict_aware_error_maps_other_errors_to_apply_failure() {
    let err = kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".into(),
        message: "nope".into(),
        reason: "Invalid".into(),
        code: 422,
    });

    assert!(matches!(patch_conflict_aware_error(err), EngineError::Apply(_)));
}

#[test]
fn claim_without_resource_ref_is_unbound() {
    let claim = Claim::new(
        DynamicObject::new(
            "demo",
            &ApiResource::from_gvk(&GroupVersionKind::gvk("example.org", "v1", "DatabaseClaim")),
        )
        .data(json!({ "spec": {} })),
    );

    assert!(claim.resource_ref().is_none());
}

#[test]
fn claim_with_resource_ref_resolves_the_bound_composite_name() {
    let claim = Claim::new(
        DynamicObject::new(
            "demo",
            &ApiResource::from_gvk(&GroupVersionKind::gvk("example.org", "v1", "DatabaseClaim")),
        )
        .data(json!({ "spec": { "resourceRef": { "name": "demo-xyz12" } } })),
    );

    assert_eq!(claim.resource_ref().as_deref(), Some("demo-xyz12"));
}
