use super::*;
use crate::crd::{Patch, PatchPolicy};
use kube::ResourceExt;
use serde_json::json;

fn template_with_base(base: Value, patches: Vec<Patch>) -> ComposedTemplate {
    ComposedTemplate { name: "db".into(), base, patches, connection_details: vec![], readiness_checks: vec![] }
}

#[test]
fn render_stamps_owner_labels_and_annotation() {
    let template = template_with_base(json!({"apiVersion": "v1", "kind": "ConfigMap", "spec": {}}), vec![]);
    let composite_spec = json!({});
    let child = render(
        &template,
        "my-xr-x7k2q-db",
        &composite_spec,
        "my-xr",
        "example.org/v1",
        "XPostgreSQLInstance",
        "uid-1",
        false,
    )
    .unwrap();

    assert_eq!(child.metadata.name.as_deref(), Some("my-xr-x7k2q-db"));
    assert_eq!(child.labels().get(LABEL_COMPOSITE).map(String::as_str), Some("my-xr"));
    assert_eq!(
        child.annotations().get(ANNOTATION_COMPOSITION_RESOURCE_NAME).map(String::as_str),
        Some("db")
    );
    let owner = &child.owner_references()[0];
    assert_eq!(owner.uid, "uid-1");
    assert_eq!(owner.controller, Some(true));
}

#[test]
fn render_applies_from_composite_patches() {
    let template = template_with_base(
        json!({"apiVersion": "v1", "kind": "ConfigMap", "spec": {}}),
        vec![Patch::FromCompositeFieldPath {
            from_field_path: "size".into(),
            to_field_path: "spec.size".into(),
            policy: None,
        }],
    );
    let composite_spec = json!({"size": "large"});
    let child = render(
        &template,
        "my-xr-x7k2q-db",
        &composite_spec,
        "my-xr",
        "example.org/v1",
        "XPostgreSQLInstance",
        "uid-1",
        false,
    )
    .unwrap();
    assert_eq!(child.data["spec"]["size"], json!("large"));
}

#[test]
fn render_fails_on_missing_required_patch_source() {
    let template = template_with_base(
        json!({"apiVersion": "v1", "kind": "ConfigMap", "spec": {}}),
        vec![Patch::FromCompositeFieldPath {
            from_field_path: "missing".into(),
            to_field_path: "spec.x".into(),
            policy: Some(PatchPolicy { from_field_path_is_required: true }),
        }],
    );
    let err = render(
        &template,
        "my-xr-x7k2q-db",
        &json!({}),
        "my-xr",
        "example.org/v1",
        "XPostgreSQLInstance",
        "uid-1",
        false,
    )
    .unwrap_err();
    assert_eq!(err.template, "db");
}

#[test]
fn render_does_not_duplicate_envelope_fields_into_data() {
    let template = template_with_base(json!({"apiVersion": "v1", "kind": "ConfigMap", "spec": {}}), vec![]);
    let child =
        render(&template, "c", &json!({}), "my-xr", "example.org/v1", "XPostgreSQLInstance", "uid-1", false)
            .unwrap();
    assert!(child.data.get("apiVersion").is_none());
    assert!(child.data.get("kind").is_none());
}
