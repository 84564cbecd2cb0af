use super::*;
use serde_json::json;

#[test]
fn extract_reads_string_fields() {
    let child = json!({"status": {"atProvider": {"endpoint": "db.example.com", "port": 5432}}});
    let details = vec![
        ConnectionDetail { name: "endpoint".into(), from_field_path: "status.atProvider.endpoint".into() },
        ConnectionDetail { name: "port".into(), from_field_path: "status.atProvider.port".into() },
    ];
    let extracted = extract(&child, &details);
    assert_eq!(extracted.get("endpoint").map(String::as_str), Some("db.example.com"));
    assert_eq!(extracted.get("port").map(String::as_str), Some("5432"));
}

#[test]
fn extract_skips_missing_field() {
    let child = json!({"status": {}});
    let details = vec![ConnectionDetail {
        name: "endpoint".into(),
        from_field_path: "status.atProvider.endpoint".into(),
    }];
    assert!(extract(&child, &details).is_empty());
}

#[test]
fn merge_additive_does_not_drop_prior_keys() {
    let mut existing = BTreeMap::new();
    existing.insert("username".to_string(), "admin".to_string());
    existing.insert("password".to_string(), "s3cr3t".to_string());

    let mut extracted = BTreeMap::new();
    extracted.insert("endpoint".to_string(), "db.example.com".to_string());

    merge_additive(&mut existing, &extracted);

    assert_eq!(existing.get("username").map(String::as_str), Some("admin"));
    assert_eq!(existing.get("password").map(String::as_str), Some("s3cr3t"));
    assert_eq!(existing.get("endpoint").map(String::as_str), Some("db.example.com"));
}

#[test]
fn merge_additive_overwrites_keys_present_in_this_tick() {
    let mut existing = BTreeMap::new();
    existing.insert("endpoint".to_string(), "old.example.com".to_string());

    let mut extracted = BTreeMap::new();
    extracted.insert("endpoint".to_string(), "new.example.com".to_string());

    merge_additive(&mut existing, &extracted);
    assert_eq!(existing.get("endpoint").map(String::as_str), Some("new.example.com"));
}
