#![warn(missing_docs)]
//! # sign-lens-ui
//!
//! ## Purpose
//! Defines the single-screen session state and its projection into a view.
//!
//! ## Responsibilities
//! - Hold permission, photo, analysis outcome, and alert as one value.
//! - Apply transitions (capture, analyze start/resolve, retake) by returning a
//!   new value, so the owner can swap it atomically.
//! - Drop analysis results whose ticket no longer matches the session.
//! - Project state into controls, status text, result panel, and alert.
//!
//! ## Data flow
//! App events -> [`SessionState`] transition -> [`project_view`] ->
//! [`render_text`] in the terminal front-end.
//!
//! ## Ownership and lifetimes
//! `SessionState` owns every field; transitions borrow the current value and
//! return a fresh one.
//!
//! ## Error model
//! Transitions never fail. Illegal actions are refused by returning `None`
//! ([`SessionState::begin_analysis`]) or leaving the state unchanged.

use serde::{Deserialize, Serialize};
use sign_lens_core::{AnalysisOutcome, AnalysisTicket, CapturedImage, PermissionState};

/// Which screen layout is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Screen {
    /// Permission has not been queried yet; nothing is rendered.
    CheckingPermission,
    /// Camera access is missing; only the request button is shown.
    PermissionRequest,
    /// Live camera preview with the shutter button.
    CameraPreview,
    /// Captured photo with retake/analyze controls.
    PhotoReview,
}

/// Blocking message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert title.
    pub title: String,
    /// Alert body.
    pub message: String,
}

impl Alert {
    /// Creates an alert.
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Immutable state of one screen session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    permission: PermissionState,
    photo: Option<CapturedImage>,
    outcome: Option<AnalysisOutcome>,
    pending: Option<AnalysisTicket>,
    issued: u64,
    alert: Option<Alert>,
}

impl SessionState {
    /// Creates the initial state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera permission.
    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    /// Current photo, if any.
    pub fn photo(&self) -> Option<&CapturedImage> {
        self.photo.as_ref()
    }

    /// Current analysis outcome, if any.
    pub fn outcome(&self) -> Option<&AnalysisOutcome> {
        self.outcome.as_ref()
    }

    /// Ticket of the in-flight analysis, if any.
    pub fn pending(&self) -> Option<AnalysisTicket> {
        self.pending
    }

    /// Alert waiting to be dismissed.
    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    /// Active screen.
    pub fn screen(&self) -> Screen {
        match self.permission {
            PermissionState::Unknown => Screen::CheckingPermission,
            PermissionState::Denied => Screen::PermissionRequest,
            PermissionState::Granted if self.photo.is_some() => Screen::PhotoReview,
            PermissionState::Granted => Screen::CameraPreview,
        }
    }

    /// Returns `true` while an analysis is in flight.
    pub fn is_analyzing(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns `true` when the shutter button is shown.
    pub fn can_capture(&self) -> bool {
        self.screen() == Screen::CameraPreview
    }

    /// Returns `true` when the analyze button is enabled.
    pub fn can_analyze(&self) -> bool {
        self.screen() == Screen::PhotoReview && self.pending.is_none()
    }

    /// Returns `true` when `ticket` belongs to the in-flight analysis.
    pub fn is_current(&self, ticket: AnalysisTicket) -> bool {
        self.pending == Some(ticket)
    }

    /// Applies an OS permission decision.
    pub fn with_permission(&self, decision: PermissionState) -> Self {
        Self {
            permission: self.permission.transition(decision),
            ..self.clone()
        }
    }

    /// Stores a fresh photo and clears any previous analysis.
    pub fn with_capture(&self, image: CapturedImage) -> Self {
        Self {
            photo: Some(image),
            outcome: None,
            pending: None,
            alert: None,
            ..self.clone()
        }
    }

    /// Surfaces a capture failure without touching the photo slot.
    pub fn with_capture_error(&self, message: impl Into<String>) -> Self {
        Self {
            alert: Some(Alert::new("Error", message)),
            ..self.clone()
        }
    }

    /// Starts an analysis of the current photo.
    ///
    /// Returns the new state and the ticket identifying this request, or
    /// `None` when there is no photo or an analysis is already in flight.
    pub fn begin_analysis(&self) -> Option<(Self, AnalysisTicket)> {
        if !self.can_analyze() {
            return None;
        }

        let ticket = AnalysisTicket::new(self.issued + 1);
        let next = Self {
            outcome: Some(AnalysisOutcome::Pending),
            pending: Some(ticket),
            issued: ticket.generation(),
            alert: None,
            ..self.clone()
        };
        Some((next, ticket))
    }

    /// Settles the analysis identified by `ticket`.
    ///
    /// Results for any other ticket, and `Pending` outcomes, leave the state
    /// unchanged. Failures also raise an alert.
    pub fn resolve_analysis(&self, ticket: AnalysisTicket, outcome: AnalysisOutcome) -> Self {
        if !self.is_current(ticket) || !outcome.is_settled() {
            return self.clone();
        }

        let alert = outcome
            .failure()
            .map(|failure| Alert::new(failure.alert_title(), failure.message.clone()));
        Self {
            outcome: Some(outcome),
            pending: None,
            alert,
            ..self.clone()
        }
    }

    /// Discards the photo and any analysis, returning to the preview.
    pub fn retake(&self) -> Self {
        Self {
            photo: None,
            outcome: None,
            pending: None,
            alert: None,
            ..self.clone()
        }
    }

    /// Closes the current alert.
    pub fn dismiss_alert(&self) -> Self {
        Self {
            alert: None,
            ..self.clone()
        }
    }
}

/// User actions available on the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Ask the OS for camera access.
    RequestPermission,
    /// Trigger the shutter.
    TakePicture,
    /// Discard the photo.
    Retake,
    /// Send the photo for analysis.
    Analyze,
}

impl Action {
    /// Button label.
    pub fn label(self) -> &'static str {
        match self {
            Self::RequestPermission => "Request Camera Permission",
            Self::TakePicture => "Take Picture",
            Self::Retake => "Retake",
            Self::Analyze => "Analyze Sign",
        }
    }
}

/// One rendered button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    /// Action triggered by the button.
    pub action: Action,
    /// Whether the button accepts presses.
    pub enabled: bool,
}

/// Panel showing a successful analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPanel {
    /// Panel heading.
    pub title: &'static str,
    /// Description returned by the backend.
    pub text: String,
}

/// Render-ready projection of [`SessionState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    /// Active screen.
    pub screen: Screen,
    /// Reference of the photo being previewed.
    pub photo: Option<String>,
    /// Buttons in display order.
    pub controls: Vec<Control>,
    /// Activity indicator text.
    pub activity: Option<&'static str>,
    /// Successful analysis panel.
    pub result: Option<ResultPanel>,
    /// Alert to display over the screen.
    pub alert: Option<Alert>,
}

impl ViewModel {
    /// Returns `true` when `action` is shown and enabled.
    pub fn is_enabled(&self, action: Action) -> bool {
        self.controls
            .iter()
            .any(|control| control.action == action && control.enabled)
    }
}

/// Projects session state into a view model.
pub fn project_view(state: &SessionState) -> ViewModel {
    let screen = state.screen();
    let controls = match screen {
        Screen::CheckingPermission => Vec::new(),
        Screen::PermissionRequest => vec![Control {
            action: Action::RequestPermission,
            enabled: true,
        }],
        Screen::CameraPreview => vec![Control {
            action: Action::TakePicture,
            enabled: true,
        }],
        Screen::PhotoReview => vec![
            Control {
                action: Action::Retake,
                enabled: true,
            },
            Control {
                action: Action::Analyze,
                enabled: state.can_analyze(),
            },
        ],
    };

    let result = state
        .outcome()
        .and_then(AnalysisOutcome::description)
        .map(|text| ResultPanel {
            title: "Traffic Sign Analysis:",
            text: text.to_string(),
        });

    ViewModel {
        screen,
        photo: state.photo().map(|photo| photo.uri().to_string()),
        controls,
        activity: state.is_analyzing().then_some("Analyzing image..."),
        result,
        alert: state.alert().cloned(),
    }
}

/// Renders a view model as plain text for terminal front-ends.
pub fn render_text(view: &ViewModel) -> String {
    let mut lines = Vec::new();

    match view.screen {
        Screen::CheckingPermission => lines.push("Checking camera permission...".to_string()),
        Screen::PermissionRequest => lines.push("Camera access is required.".to_string()),
        Screen::CameraPreview => lines.push("[camera preview]".to_string()),
        Screen::PhotoReview => {
            let photo = view.photo.as_deref().unwrap_or_default();
            lines.push(format!("[photo] {photo}"));
        }
    }

    if !view.controls.is_empty() {
        let buttons = view
            .controls
            .iter()
            .map(|control| {
                if control.enabled {
                    format!("[ {} ]", control.action.label())
                } else {
                    format!("( {} )", control.action.label())
                }
            })
            .collect::<Vec<_>>()
            .join("  ");
        lines.push(buttons);
    }

    if let Some(activity) = view.activity {
        lines.push(activity.to_string());
    }

    if let Some(result) = &view.result {
        lines.push(result.title.to_string());
        lines.push(result.text.clone());
    }

    if let Some(alert) = &view.alert {
        lines.push(format!("!! {}: {}", alert.title, alert.message));
    }

    lines.join("\n")
}
