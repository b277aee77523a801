//! Integration tests for analysis outcome construction.

use sign_lens_core::{AnalysisOutcome, FailureKind};

#[test]
fn analysis_outcome_tests_http_failure_carries_status_and_body() {
    let outcome = AnalysisOutcome::backend_http(500, "internal error");
    let failure = outcome.failure().expect("outcome should be a failure");

    assert_eq!(failure.kind, FailureKind::BackendHttp);
    assert!(failure.message.contains("500"));
    assert!(failure.message.contains("internal error"));
    assert_eq!(failure.alert_title(), "Error");
}

#[test]
fn analysis_outcome_tests_application_error_keeps_backend_text() {
    let outcome = AnalysisOutcome::backend_application("no sign detected");
    let failure = outcome.failure().expect("outcome should be a failure");

    assert_eq!(failure.message, "no sign detected");
    assert_eq!(failure.alert_title(), "Backend Error");
}

#[test]
fn analysis_outcome_tests_only_pending_is_unsettled() {
    assert!(!AnalysisOutcome::Pending.is_settled());
    assert!(AnalysisOutcome::Success("Stop sign".to_string()).is_settled());
    assert!(AnalysisOutcome::transport("connection refused").is_settled());
    assert_eq!(
        AnalysisOutcome::Success("Stop sign".to_string()).description(),
        Some("Stop sign")
    );
}
