use super::*;
use kube::api::TypeMeta;
use serde_json::json;

fn xr_with_spec(spec: Value) -> Composite {
    let inner = DynamicObject {
        types: Some(TypeMeta {
            api_version: "example.org/v1".into(),
            kind: "XPostgreSQLInstance".into(),
        }),
        metadata: ObjectMeta {
            name: Some("my-db".into()),
            uid: Some("abc-123".into()),
            generation: Some(2),
            ..Default::default()
        },
        data: json!({ "spec": spec }),
    };
    Composite::new(inner)
}

#[test]
fn reads_composition_ref() {
    let xr = xr_with_spec(json!({"compositionRef": {"name": "postgres-large"}}));
    assert_eq!(xr.composition_ref().unwrap().name, "postgres-large");
}

#[test]
fn reads_composition_revision_ref() {
    let xr = xr_with_spec(json!({"compositionRevisionRef": {"name": "postgres-large-abc12"}}));
    assert_eq!(xr.composition_revision_ref().unwrap().name, "postgres-large-abc12");
}

#[test]
fn missing_composition_ref_is_none() {
    let xr = xr_with_spec(json!({}));
    assert!(xr.composition_ref().is_none());
}

#[test]
fn default_update_policy_is_automatic() {
    let xr = xr_with_spec(json!({}));
    assert_eq!(xr.composition_update_policy(), CompositionUpdatePolicy::Automatic);
}

#[test]
fn explicit_manual_update_policy() {
    let xr = xr_with_spec(json!({"compositionUpdatePolicy": "Manual"}));
    assert_eq!(xr.composition_update_policy(), CompositionUpdatePolicy::Manual);
}

#[test]
fn reads_claim_ref() {
    let xr = xr_with_spec(json!({"claimRef": {"namespace": "team-a", "name": "my-claim"}}));
    let (namespace, name) = xr.claim_ref().unwrap();
    assert_eq!(namespace, "team-a");
    assert_eq!(name, "my-claim");
}

#[test]
fn resource_refs_round_trip() {
    let mut xr = xr_with_spec(json!({}));
    let refs = vec![ResourceRef {
        api_version: "v1".into(),
        kind: "ConfigMap".into(),
        name: "my-db-x7k2q-config".into(),
    }];
    xr.set_resource_refs(&refs);
    assert_eq!(xr.resource_refs(), refs);
}

#[test]
fn uid_and_generation_come_from_metadata() {
    let xr = xr_with_spec(json!({}));
    assert_eq!(xr.uid().as_deref(), Some("abc-123"));
    assert_eq!(xr.generation(), Some(2));
}

#[test]
fn conditions_round_trip() {
    let mut xr = xr_with_spec(json!({}));
    let conditions = vec![Condition {
        r#type: "Ready".into(),
        status: "True".into(),
        reason: None,
        message: None,
        last_transition_time: None,
    }];
    xr.set_conditions(&conditions);
    assert_eq!(xr.conditions(), conditions);
}
