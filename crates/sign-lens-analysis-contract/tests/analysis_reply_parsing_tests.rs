//! Integration tests for analysis reply parsing and outcome mapping.

use sign_lens_analysis_contract::{
    AnalysisContractError, AnalysisReply, parse_analysis_reply, parse_health_reply,
};
use sign_lens_core::{AnalysisOutcome, FailureKind};

#[test]
fn analysis_reply_parsing_tests_description_becomes_success() {
    let reply = parse_analysis_reply(r#"{"description": "Stop sign, octagonal, red"}"#)
        .expect("reply should parse");

    assert_eq!(
        reply.into_outcome(),
        AnalysisOutcome::Success("Stop sign, octagonal, red".to_string())
    );
}

#[test]
fn analysis_reply_parsing_tests_error_becomes_application_failure() {
    let outcome = parse_analysis_reply(r#"{"error": "no sign detected"}"#)
        .expect("reply should parse")
        .into_outcome();

    let failure = outcome.failure().expect("outcome should be a failure");
    assert_eq!(failure.kind, FailureKind::BackendApplication);
    assert_eq!(failure.message, "no sign detected");
}

#[test]
fn analysis_reply_parsing_tests_rejects_invalid_json() {
    let error = parse_analysis_reply("<html>bad gateway</html>").unwrap_err();
    assert!(matches!(error, AnalysisContractError::Decode(_)));
}

#[test]
fn analysis_reply_parsing_tests_keeps_non_string_error_text() {
    let reply = parse_analysis_reply(r#"{"error": {"code": 7}}"#).expect("reply should parse");
    assert_eq!(reply, AnalysisReply::Error(r#"{"code":7}"#.to_string()));
}

#[test]
fn analysis_reply_parsing_tests_reads_health_message() {
    let reply = parse_health_reply(r#"{"message": "FastAPI server is running!"}"#)
        .expect("health reply should parse");
    assert_eq!(reply.message, "FastAPI server is running!");
    assert!(parse_health_reply(r#"{"status": "up"}"#).is_err());
}
