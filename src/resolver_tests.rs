use super::*;
use crate::crd::{CompositeTypeRef, CompositionSpec, CompositionSpecRoot};
use kube::api::{DynamicObject, ObjectMeta, TypeMeta};
use serde_json::json;
use std::collections::BTreeMap;

fn composite_type_ref() -> CompositeTypeRef {
    CompositeTypeRef { api_version: "example.org/v1".into(), kind: "XPostgreSQLInstance".into() }
}

fn legacy_spec() -> CompositionSpec {
    CompositionSpec {
        resources: Some(vec![]),
        pipeline: None,
        patch_sets: vec![],
        composite_type_ref: composite_type_ref(),
    }
}

fn composition(name: &str, labels: BTreeMap<String, String>) -> Composition {
    Composition {
        metadata: ObjectMeta { name: Some(name.into()), labels: Some(labels), ..Default::default() },
        spec: CompositionSpecRoot(legacy_spec()),
        status: None,
    }
}

fn xr_with_spec(spec: serde_json::Value) -> Composite {
    let inner = DynamicObject {
        types: Some(TypeMeta { api_version: "example.org/v1".into(), kind: "XPostgreSQLInstance".into() }),
        metadata: ObjectMeta { name: Some("my-db".into()), ..Default::default() },
        data: json!({ "spec": spec }),
    };
    Composite::new(inner)
}

#[test]
fn resolves_by_direct_reference() {
    let xr = xr_with_spec(json!({"compositionRef": {"name": "postgres-large"}}));
    let compositions = vec![composition("postgres-large", BTreeMap::new())];
    let resolved = resolve(&xr, &compositions, &[]).unwrap();
    assert!(matches!(resolved, Resolved::Live(c) if c.name_any() == "postgres-large"));
}

#[test]
fn direct_reference_not_found_is_transient() {
    let xr = xr_with_spec(json!({"compositionRef": {"name": "missing"}}));
    let err = resolve(&xr, &[], &[]).unwrap_err();
    assert_eq!(err, ResolveError::NotFound { name: "missing".into() });
}

#[test]
fn selector_tie_breaks_lexicographically() {
    let mut gold = BTreeMap::new();
    gold.insert("tier".to_string(), "gold".to_string());
    let xr = xr_with_spec(json!({"compositionSelector": {"matchLabels": {"tier": "gold"}}}));
    let compositions = vec![composition("g-b", gold.clone()), composition("g-a", gold)];
    let resolved = resolve(&xr, &compositions, &[]).unwrap();
    assert!(matches!(resolved, Resolved::Live(c) if c.name_any() == "g-a"));
}

#[test]
fn selector_with_zero_matches_errors() {
    let xr = xr_with_spec(json!({"compositionSelector": {"matchLabels": {"tier": "gold"}}}));
    let compositions = vec![composition("silver-only", BTreeMap::new())];
    let err = resolve(&xr, &compositions, &[]).unwrap_err();
    assert_eq!(err, ResolveError::NoMatch);
}

#[test]
fn no_selection_rule_matches_is_no_match() {
    let xr = xr_with_spec(json!({}));
    let err = resolve(&xr, &[], &[]).unwrap_err();
    assert_eq!(err, ResolveError::NoMatch);
}

#[test]
fn invalid_composition_is_refused() {
    let xr = xr_with_spec(json!({"compositionRef": {"name": "broken"}}));
    let mut broken = composition("broken", BTreeMap::new());
    broken.spec.0.resources = None;
    broken.spec.0.pipeline = None;
    let err = resolve(&xr, &[broken], &[]).unwrap_err();
    assert!(matches!(err, ResolveError::Invalid { .. }));
}
