use super::*;

#[test]
fn not_found_primary_is_terminal_with_no_requeue() {
    let err = EngineError::NotFoundPrimary;
    assert!(err.is_terminal());
    assert_eq!(err.requeue_after(), None);
}

#[test]
fn conflict_is_terminal_for_this_tick() {
    let err = EngineError::Conflict;
    assert!(err.is_terminal());
    assert_eq!(err.requeue_after(), None);
}

#[test]
fn related_not_found_is_transient_with_short_retry() {
    let err = EngineError::NotFoundRelated("Composition/foo".into());
    assert!(!err.is_terminal());
    assert_eq!(err.requeue_after(), Some(Duration::from_secs(30)));
    assert_eq!(err.condition_reason(), "GetComposition");
}

#[test]
fn function_fatal_has_short_retry_and_reason() {
    let err = EngineError::FunctionFatal {
        function: "compose-rds".into(),
        message: "boom".into(),
    };
    assert_eq!(err.requeue_after(), Some(Duration::from_secs(15)));
    assert_eq!(err.condition_reason(), "FunctionFatal");
}
