use super::*;

fn result(severity: Severity) -> FunctionResult {
    FunctionResult { severity: severity as i32, message: String::new() }
}

#[test]
fn no_fatal_result_when_all_normal() {
    let results = vec![result(Severity::Normal), result(Severity::Warning)];
    assert!(!has_fatal_result(&results));
}

#[test]
fn detects_fatal_result() {
    let results = vec![result(Severity::Normal), result(Severity::Fatal)];
    assert!(has_fatal_result(&results));
}

#[test]
fn empty_results_are_not_fatal() {
    assert!(!has_fatal_result(&[]));
}
