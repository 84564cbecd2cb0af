// SPDX-License-Identifier: Apache-2.0

use super::*;

#[test]
fn transport_failures_do_not_count_against_retry_limit() {
    let err = PipelineError::Transport { step: "fetch".into(), reason: "dial timeout".into() };
    assert!(!err.counts_as_failure());
}

#[test]
fn fatal_and_credential_failures_count_against_retry_limit() {
    let fatal = PipelineError::Fatal { function: "compose".into(), message: "nope".into() };
    let credential = PipelineError::Credential { step: "fetch".into(), reason: "secret missing".into() };
    assert!(fatal.counts_as_failure());
    assert!(credential.counts_as_failure());
}

#[test]
fn fatal_pipeline_error_becomes_function_fatal_engine_error() {
    let err: EngineError =
        PipelineError::Fatal { function: "compose".into(), message: "boom".into() }.into();
    assert_eq!(err.condition_reason(), "FunctionFatal");
    assert!(matches!(err.requeue_after(), Some(d) if d.as_secs() == 15));
}

#[test]
fn credential_pipeline_error_becomes_credential_resolution_engine_error() {
    let err: EngineError =
        PipelineError::Credential { step: "fetch".into(), reason: "not found".into() }.into();
    assert_eq!(err.condition_reason(), "CredentialResolutionFailed");
}

#[test]
fn transport_pipeline_error_becomes_transient_other_engine_error() {
    let err: EngineError = PipelineError::Transport { step: "fetch".into(), reason: "unreachable".into() }.into();
    assert_eq!(err.condition_reason(), "InternalError");
    assert!(matches!(err.requeue_after(), Some(d) if d.as_secs() == 30));
}

#[test]
fn operation_with_no_status_has_no_conditions() {
    let operation = Operation {
        metadata: kube::api::ObjectMeta { name: Some("demo".into()), ..Default::default() },
        spec: crate::crd::OperationSpecRoot(crate::crd::OperationSpec { pipeline: vec![], retry_limit: 3 }),
        status: None,
    };
    assert!(operation.status_conditions().is_empty());
}
