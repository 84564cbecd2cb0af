use super::*;
use serde_json::json;

#[test]
fn default_check_is_true_when_ready_condition_true() {
    let child = json!({"status": {"conditions": [{"type": "Ready", "status": "True"}]}});
    assert!(is_ready(&child, &[]));
}

#[test]
fn default_check_is_false_without_ready_condition() {
    let child = json!({"status": {"conditions": [{"type": "Synced", "status": "True"}]}});
    assert!(!is_ready(&child, &[]));
}

#[test]
fn field_exists_check() {
    let child = json!({"status": {"atProvider": {"endpoint": "db.example.com"}}});
    let checks = vec![ReadinessCheck::FieldExists { field_path: "status.atProvider.endpoint".into() }];
    assert!(is_ready(&child, &checks));
}

#[test]
fn field_equals_check() {
    let child = json!({"status": {"phase": "Running"}});
    let checks = vec![ReadinessCheck::FieldEquals {
        field_path: "status.phase".into(),
        match_value: "Running".into(),
    }];
    assert!(is_ready(&child, &checks));

    let checks = vec![ReadinessCheck::FieldEquals {
        field_path: "status.phase".into(),
        match_value: "Stopped".into(),
    }];
    assert!(!is_ready(&child, &checks));
}

#[test]
fn field_matches_regex_check() {
    let child = json!({"status": {"endpoint": "db-7.example.com:5432"}});
    let checks = vec![ReadinessCheck::FieldMatchesRegex {
        field_path: "status.endpoint".into(),
        match_regex: r"^db-\d+\.example\.com:\d+$".into(),
    }];
    assert!(is_ready(&child, &checks));
}

#[test]
fn all_checks_must_pass() {
    let child = json!({"status": {"phase": "Running"}});
    let checks = vec![
        ReadinessCheck::FieldEquals { field_path: "status.phase".into(), match_value: "Running".into() },
        ReadinessCheck::FieldExists { field_path: "status.missing".into() },
    ];
    assert!(!is_ready(&child, &checks));
}
