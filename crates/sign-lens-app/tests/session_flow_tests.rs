//! Integration tests for the capture -> analyze -> retake session flow.

mod common;

use common::{FixedTransport, harness};
use sign_lens_app::AppError;
use sign_lens_capture::RawPhoto;
use sign_lens_core::{AnalysisOutcome, FailureKind};
use sign_lens_ui::{Action, Screen};

#[tokio::test]
async fn session_flow_tests_description_reply_reaches_result_panel() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let h = harness(
        dir.path(),
        FixedTransport::replying(200, r#"{"description": "Stop sign, octagonal, red"}"#),
    );

    h.app.request_permission().await;
    h.app.take_picture().await.expect("capture should succeed");
    let outcome = h.app.analyze().await.expect("analysis should run");

    assert_eq!(
        outcome,
        AnalysisOutcome::Success("Stop sign, octagonal, red".to_string())
    );
    let view = h.app.view();
    assert_eq!(view.screen, Screen::PhotoReview);
    assert_eq!(
        view.result.map(|result| result.text),
        Some("Stop sign, octagonal, red".to_string())
    );
    assert!(view.alert.is_none());
}

#[tokio::test]
async fn session_flow_tests_capture_clears_previous_outcome() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let h = harness(dir.path(), FixedTransport::replying(200, r#"{"description": "Yield"}"#));

    h.app.request_permission().await;
    h.app.take_picture().await.expect("capture should succeed");
    h.app.analyze().await.expect("analysis should run");
    h.app.retake();
    let image = h.app.take_picture().await.expect("capture should succeed");

    let state = h.app.snapshot();
    assert_eq!(state.photo(), Some(&image));
    assert!(state.outcome().is_none());
}

#[tokio::test]
async fn session_flow_tests_empty_capture_raises_alert_without_photo() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let h = harness(dir.path(), FixedTransport::replying(200, "{}"));
    h.camera.push_result(Ok(RawPhoto {
        uri: "/tmp/blank.jpg".to_string(),
        width: 0,
        height: 0,
    }));

    h.app.request_permission().await;
    let error = h.app.take_picture().await.unwrap_err();

    assert!(matches!(error, AppError::Capture(_)));
    let state = h.app.snapshot();
    assert!(state.photo().is_none());
    assert_eq!(state.screen(), Screen::CameraPreview);
    let alert = state.alert().expect("empty capture should alert");
    assert!(alert.message.contains("empty or invalid"));
}

#[tokio::test]
async fn session_flow_tests_application_error_is_not_transport_error() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let h = harness(
        dir.path(),
        FixedTransport::replying(200, r#"{"error": "no sign detected"}"#),
    );

    h.app.request_permission().await;
    h.app.take_picture().await.expect("capture should succeed");
    let outcome = h.app.analyze().await.expect("analysis should run");

    let failure = outcome.failure().expect("outcome should be a failure");
    assert_eq!(failure.kind, FailureKind::BackendApplication);
    assert_eq!(failure.message, "no sign detected");
    let alert = h.app.view().alert.expect("failure should alert");
    assert_eq!(alert.title, "Backend Error");
}

#[tokio::test]
async fn session_flow_tests_http_error_mentions_status_and_body() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let h = harness(dir.path(), FixedTransport::replying(500, "internal error"));

    h.app.request_permission().await;
    h.app.take_picture().await.expect("capture should succeed");
    let outcome = h.app.analyze().await.expect("analysis should run");

    let failure = outcome.failure().expect("outcome should be a failure");
    assert!(failure.message.contains("500"));
    assert!(failure.message.contains("internal error"));
}

#[tokio::test]
async fn session_flow_tests_disconnect_fails_and_reenables_analyze() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let h = harness(dir.path(), FixedTransport::disconnected("connection refused"));

    h.app.request_permission().await;
    h.app.take_picture().await.expect("capture should succeed");
    let outcome = h.app.analyze().await.expect("analysis should run");

    let failure = outcome.failure().expect("outcome should be a failure");
    assert_eq!(failure.kind, FailureKind::Transport);
    assert!(failure.message.contains("connection refused"));
    assert!(h.app.view().is_enabled(Action::Analyze));
}

#[tokio::test]
async fn session_flow_tests_retake_returns_to_preview() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let h = harness(dir.path(), FixedTransport::replying(500, "internal error"));

    h.app.request_permission().await;
    h.app.take_picture().await.expect("capture should succeed");
    h.app.analyze().await.expect("analysis should run");
    h.app.retake();

    let state = h.app.snapshot();
    assert!(state.photo().is_none());
    assert!(state.outcome().is_none());
    assert!(state.alert().is_none());
    assert_eq!(state.screen(), Screen::CameraPreview);
}

#[tokio::test]
async fn session_flow_tests_analyze_requires_photo() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let h = harness(dir.path(), FixedTransport::replying(200, r#"{"description": "x"}"#));
    h.app.request_permission().await;

    let error = h.app.analyze().await.unwrap_err();
    assert!(matches!(error, AppError::ActionUnavailable("analyze")));
    assert_eq!(h.transport.posts(), 0);
}

#[tokio::test]
async fn session_flow_tests_second_capture_requires_retake() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let h = harness(dir.path(), FixedTransport::replying(200, r#"{"description": "x"}"#));
    h.app.request_permission().await;
    h.app.take_picture().await.expect("capture should succeed");

    let error = h.app.take_picture().await.unwrap_err();
    assert!(matches!(error, AppError::ActionUnavailable("take picture")));
    assert_eq!(h.camera.captures(), 1);
}
