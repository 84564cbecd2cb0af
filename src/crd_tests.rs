use super::*;

fn template(name: &str) -> ComposedTemplate {
    ComposedTemplate {
        name: name.into(),
        base: serde_json::json!({"apiVersion": "v1", "kind": "ConfigMap"}),
        patches: vec![],
        connection_details: vec![],
        readiness_checks: vec![],
    }
}

fn pipeline_step(name: &str) -> PipelineStep {
    PipelineStep {
        step: name.into(),
        function_ref: FunctionReference { name: "compose-rds".into() },
        input: None,
        credentials: vec![],
    }
}

fn composite_type_ref() -> CompositeTypeRef {
    CompositeTypeRef {
        api_version: "example.org/v1".into(),
        kind: "XPostgreSQLInstance".into(),
    }
}

#[test]
fn legacy_spec_validates() {
    let spec = CompositionSpec {
        resources: Some(vec![template("a"), template("b")]),
        pipeline: None,
        patch_sets: vec![],
        composite_type_ref: composite_type_ref(),
    };
    assert!(spec.is_legacy());
    assert!(!spec.is_pipeline());
    assert!(spec.validate().is_ok());
}

#[test]
fn pipeline_spec_validates() {
    let spec = CompositionSpec {
        resources: None,
        pipeline: Some(vec![pipeline_step("render")]),
        patch_sets: vec![],
        composite_type_ref: composite_type_ref(),
    };
    assert!(spec.is_pipeline());
    assert!(spec.validate().is_ok());
}

#[test]
fn mixed_mode_is_rejected() {
    let spec = CompositionSpec {
        resources: Some(vec![template("a")]),
        pipeline: Some(vec![pipeline_step("render")]),
        patch_sets: vec![],
        composite_type_ref: composite_type_ref(),
    };
    assert!(spec.validate().is_err());
}

#[test]
fn neither_mode_is_rejected() {
    let spec = CompositionSpec {
        resources: None,
        pipeline: None,
        patch_sets: vec![],
        composite_type_ref: composite_type_ref(),
    };
    assert!(spec.validate().is_err());
}

#[test]
fn duplicate_template_names_are_rejected() {
    let spec = CompositionSpec {
        resources: Some(vec![template("a"), template("a")]),
        pipeline: None,
        patch_sets: vec![],
        composite_type_ref: composite_type_ref(),
    };
    let err = spec.validate().unwrap_err();
    assert!(err.contains("duplicate template name"));
}

#[test]
fn duplicate_pipeline_step_names_are_rejected() {
    let spec = CompositionSpec {
        resources: None,
        pipeline: Some(vec![pipeline_step("render"), pipeline_step("render")]),
        patch_sets: vec![],
        composite_type_ref: composite_type_ref(),
    };
    let err = spec.validate().unwrap_err();
    assert!(err.contains("duplicate pipeline step name"));
}

#[test]
fn default_retry_limit_is_five() {
    assert_eq!(default_retry_limit(), 5);
}

#[test]
fn function_credential_secret_reports_step_local_name() {
    let cred = FunctionCredential::Secret { name: "db-creds".into(), namespace: "default".into() };
    assert_eq!(cred.step_local_name(), "db-creds");
}

#[test]
fn empty_label_selector_matches_everything() {
    let selector = LabelSelector::default();
    assert!(selector.matches(&BTreeMap::new()));
}

#[test]
fn label_selector_requires_every_key_to_match() {
    let mut want = BTreeMap::new();
    want.insert("tier".to_string(), "gold".to_string());
    let selector = LabelSelector { match_labels: Some(want) };

    let mut labels = BTreeMap::new();
    labels.insert("tier".to_string(), "gold".to_string());
    labels.insert("region".to_string(), "us-east-1".to_string());
    assert!(selector.matches(&labels));

    labels.insert("tier".to_string(), "silver".to_string());
    assert!(!selector.matches(&labels));
}
