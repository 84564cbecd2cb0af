use super::*;
use kube::api::ObjectMeta;
use serde_json::json;

fn child_with_owner(owner: Option<OwnerReference>) -> DynamicObject {
    DynamicObject {
        types: None,
        metadata: ObjectMeta {
            name: Some("child".into()),
            owner_references: owner.map(|o| vec![o]),
            ..Default::default()
        },
        data: json!({}),
    }
}

#[test]
fn controller_owner_reference_sets_expected_fields() {
    let owner = controller_owner_reference("example.org/v1", "XPostgreSQLInstance", "my-db", "uid-1", true);
    assert_eq!(owner.controller, Some(true));
    assert_eq!(owner.block_owner_deletion, Some(true));
    assert_eq!(owner.uid, "uid-1");
}

#[test]
fn unowned_object_is_adoptable() {
    let child = child_with_owner(None);
    assert!(is_controlled_by(&child, "uid-1"));
}

#[test]
fn object_owned_by_same_uid_is_controlled() {
    let owner = controller_owner_reference("example.org/v1", "XPostgreSQLInstance", "my-db", "uid-1", false);
    let child = child_with_owner(Some(owner));
    assert!(is_controlled_by(&child, "uid-1"));
}

#[test]
fn object_owned_by_different_uid_is_not_controlled() {
    let owner = controller_owner_reference("example.org/v1", "XPostgreSQLInstance", "other-db", "uid-2", false);
    let child = child_with_owner(Some(owner));
    assert!(!is_controlled_by(&child, "uid-1"));
}

#[test]
fn non_controller_owner_reference_does_not_count() {
    let mut owner = controller_owner_reference("example.org/v1", "XPostgreSQLInstance", "my-db", "uid-1", false);
    owner.controller = Some(false);
    let child = child_with_owner(Some(owner));
    assert!(controller_owner_uid(&child).is_none());
}
