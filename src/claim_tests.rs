use super::*;
use kube::api::TypeMeta;
use serde_json::json;

fn claim_with_spec(spec: Value) -> Claim {
    let inner = DynamicObject {
        types: Some(TypeMeta {
            api_version: "example.org/v1".into(),
            kind: "PostgreSQLInstance".into(),
        }),
        metadata: ObjectMeta {
            name: Some("my-claim".into()),
            namespace: Some("team-a".into()),
            ..Default::default()
        },
        data: json!({ "spec": spec }),
    };
    Claim::new(inner)
}

#[test]
fn missing_resource_ref_means_unbound() {
    let claim = claim_with_spec(json!({}));
    assert!(claim.resource_ref().is_none());
}

#[test]
fn resource_ref_round_trips() {
    let mut claim = claim_with_spec(json!({}));
    claim.set_resource_ref("my-claim-x7k2q");
    assert_eq!(claim.resource_ref().as_deref(), Some("my-claim-x7k2q"));
}

#[test]
fn default_delete_policy_is_background() {
    let claim = claim_with_spec(json!({}));
    assert_eq!(claim.composite_delete_policy(), CompositeDeletePolicy::Background);
}

#[test]
fn explicit_foreground_delete_policy() {
    let claim = claim_with_spec(json!({"compositeDeletePolicy": "Foreground"}));
    assert_eq!(claim.composite_delete_policy(), CompositeDeletePolicy::Foreground);
}

#[test]
fn namespace_and_name_come_from_metadata() {
    let claim = claim_with_spec(json!({}));
    assert_eq!(claim.namespace().as_deref(), Some("team-a"));
    assert_eq!(claim.name(), "my-claim");
}

#[test]
fn composition_ref_name_reads_through() {
    let claim = claim_with_spec(json!({"compositionRef": {"name": "postgres-large"}}));
    assert_eq!(claim.composition_ref_name().as_deref(), Some("postgres-large"));
}
