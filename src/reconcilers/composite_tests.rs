// SPDX-License-Identifier: Apache-2.0

use super::*;
use kube::api::DynamicObject;
use serde_json::json;

fn dynamic_xr(spec: Value) -> DynamicObject {
    DynamicObject::new("demo", &ApiResource::from_gvk(&GroupVersionKind::gvk("example.org", "v1", "XDatabase")))
        .data(json!({ "spec": spec, "status": {} }))
}

fn composition_spec(resources: Vec<ComposedTemplate>) -> CompositionSpec {
    CompositionSpec {
        resources: Some(resources),
        pipeline: None,
        patch_sets: vec![],
        composite_type_ref: crate::crd::CompositeTypeRef {
            api_version: "example.org/v1".into(),
            kind: "XDatabase".into(),
        },
    }
}

fn template(name: &str, base: Value) -> ComposedTemplate {
    ComposedTemplate { name: name.to_string(), base, patches: vec![], connection_details: vec![], readiness_checks: vec![] }
}

#[test]
fn configure_chain_assigns_a_child_suffix_once() {
    let mut composite = Composite::new(dynamic_xr(json!({})));
    let spec = composition_spec(vec![]);

    configure_chain(&mut composite, &spec);
    let first = composite.child_suffix().unwrap();
    configure_chain(&mut composite, &spec);

    assert_eq!(composite.child_suffix().unwrap(), first);
}

#[test]
fn configure_chain_propagates_unset_base_spec_fields_once() {
    let mut composite = Composite::new(dynamic_xr(json!({ "size": "large" })));
    let spec = composition_spec(vec![template(
        "db",
        json!({ "apiVersion": "v1", "kind": "ConfigMap", "spec": { "size": "small", "region": "us-east-1" } }),
    )]);

    configure_chain(&mut composite, &spec);

    let current = composite.inner().data.get("spec").unwrap();
    assert_eq!(current.get("size").unwrap(), "large");
    assert_eq!(current.get("region").unwrap(), "us-east-1");
}

#[test]
fn configure_chain_is_a_noop_for_pipeline_mode() {
    let mut composite = Composite::new(dynamic_xr(json!({})));
    let spec = CompositionSpec {
        resources: None,
        pipeline: Some(vec![]),
        patch_sets: vec![],
        composite_type_ref: crate::crd::CompositeTypeRef {
            api_version: "example.org/v1".into(),
            kind: "XDatabase".into(),
        },
    };

    configure_chain(&mut composite, &spec);

    assert!(composite.child_suffix().is_some());
    assert_eq!(composite.inner().data.get("spec").unwrap(), &json!({ "resourceNameSuffix": composite.child_suffix().unwrap() }));
}

#[test]
fn inline_all_expands_a_known_patch_set() {
    let patch_sets = vec![crate::crd::PatchSet {
        name: "common".into(),
        patches: vec![crate::crd::Patch::FromCompositeFieldPath {
            from_field_path: "spec.size".into(),
            to_field_path: "spec.forProvider.size".into(),
            policy: None,
        }],
    }];
    let spec = CompositionSpec {
        resources: Some(vec![]),
        pipeline: None,
        patch_sets,
        composite_type_ref: crate::crd::CompositeTypeRef { api_version: "example.org/v1".into(), kind: "XDatabase".into() },
    };
    let templates = vec![ComposedTemplate {
        name: "db".into(),
        base: json!({}),
        patches: vec![crate::crd::Patch::PatchSet { patch_set_name: "common".into() }],
        connection_details: vec![],
        readiness_checks: vec![],
    }];

    let inlined = inline_all(&templates, &spec).unwrap();

    assert_eq!(inlined[0].patches.len(), 1);
    assert!(matches!(inlined[0].patches[0], crate::crd::Patch::FromCompositeFieldPath { .. }));
}

#[test]
fn inline_all_rejects_an_unknown_patch_set() {
    let spec = composition_spec(vec![]);
    let templates = vec![ComposedTemplate {
        name: "db".into(),
        base: json!({}),
        patches: vec![crate::crd::Patch::PatchSet { patch_set_name: "missing".into() }],
        connection_details: vec![],
        readiness_checks: vec![],
    }];

    assert!(inline_all(&templates, &spec).is_err());
}

#[test]
fn compute_conditions_reports_synced_and_ready_when_everything_applied() {
    let conditions = compute_conditions(&[], true, true, &[]);

    let synced = conditions.iter().find(|c| c.r#type == CONDITION_SYNCED).unwrap();
    let ready = conditions.iter().find(|c| c.r#type == CONDITION_READY).unwrap();
    assert_eq!(synced.status, STATUS_TRUE);
    assert_eq!(ready.status, STATUS_TRUE);
}

#[test]
fn compute_conditions_reports_render_failures_in_the_synced_message() {
    let failures = vec![render::RenderError { template: "db".into(), reason: "bad patch".into() }];

    let conditions = compute_conditions(&[], false, false, &failures);

    let synced = conditions.iter().find(|c| c.r#type == CONDITION_SYNCED).unwrap();
    assert_eq!(synced.status, STATUS_FALSE);
    assert_eq!(synced.reason.as_deref(), Some("RenderFailed"));
    assert!(synced.message.as_deref().unwrap().contains("bad patch"));
}

#[test]
fn compute_conditions_preserves_unrelated_existing_conditions() {
    let existing = vec![Condition {
        r#type: "SomeOtherCondition".into(),
        status: STATUS_TRUE.into(),
        reason: None,
        message: None,
        last_transition_time: None,
    }];

    let conditions = compute_conditions(&existing, true, true, &[]);

    assert!(conditions.iter().any(|c| c.r#type == "SomeOtherCondition"));
    assert_eq!(conditions.len(), 3);
}

#[test]
fn compute_conditions_replaces_rather_than_duplicates_known_types() {
    let existing = compute_conditions(&[], false, false, &[]);

    let conditions = compute_conditions(&existing, true, true, &[]);

    assert_eq!(conditions.iter().filter(|c| c.r#type == CONDITION_SYNCED).count(), 1);
    assert_eq!(conditions.iter().filter(|c| c.r#type == CONDITION_READY).count(), 1);
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
