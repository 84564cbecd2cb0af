use super::*;
use serde_json::json;

#[test]
fn get_simple_key() {
    let root = json!({"spec": {"name": "foo"}});
    assert_eq!(get(&root, "spec.name"), Some(&json!("foo")));
}

#[test]
fn get_missing_key_returns_none() {
    let root = json!({"spec": {}});
    assert_eq!(get(&root, "spec.missing"), None);
}

#[test]
fn get_array_index() {
    let root = json!({"spec": {"tags": [{"value": "a"}, {"value": "b"}]}});
    assert_eq!(get(&root, "spec.tags[1].value"), Some(&json!("b")));
}

#[test]
fn get_array_index_out_of_bounds_returns_none() {
    let root = json!({"spec": {"tags": [{"value": "a"}]}});
    assert_eq!(get(&root, "spec.tags[5].value"), None);
}

#[test]
fn set_creates_intermediate_objects() {
    let mut root = json!({});
    set(&mut root, "spec.forProvider.region", json!("us-east-1"));
    assert_eq!(root, json!({"spec": {"forProvider": {"region": "us-east-1"}}}));
}

#[test]
fn set_overwrites_existing_value() {
    let mut root = json!({"spec": {"name": "old"}});
    set(&mut root, "spec.name", json!("new"));
    assert_eq!(root["spec"]["name"], json!("new"));
}

#[test]
fn set_extends_array_with_nulls() {
    let mut root = json!({});
    set(&mut root, "spec.tags[2].value", json!("c"));
    assert_eq!(root["spec"]["tags"], json!([null, null, {"value": "c"}]));
}

#[test]
fn exists_is_false_for_null_value() {
    let root = json!({"spec": {"name": null}});
    assert!(!exists(&root, "spec.name"));
}

#[test]
fn exists_is_true_for_present_value() {
    let root = json!({"spec": {"name": "foo"}});
    assert!(exists(&root, "spec.name"));
}
