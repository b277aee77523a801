#![warn(missing_docs)]
//! # sign-lens-app
//!
//! ## Purpose
//! Wires capture, analysis, and session state into the single-screen
//! `sign-lens` flow.
//!
//! ## Responsibilities
//! - Turn configuration into a validated endpoint and capture settings.
//! - Drive permission, capture, analyze, and retake actions.
//! - Publish each new [`SessionState`] atomically to subscribers.
//! - Drop analysis results that arrive after the session moved on.
//!
//! ## Data flow
//! Action -> [`CaptureController`] / [`AnalysisClient`] -> session transition
//! -> `watch` channel -> [`project_view`] for rendering.
//!
//! ## Ownership and lifetimes
//! The app owns the controller, the client, and the state channel. Camera
//! devices stay owned by the front-end that mounts them.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`]. Failures the user must see
//! are also written into the session as alerts.

use std::sync::Arc;

use sign_lens_analysis_contract::HealthReply;
use sign_lens_capture::{
    CameraDevice, CaptureConfig, CaptureController, CaptureError, DEFAULT_SETTLE_DELAY_MS,
    PermissionProvider,
};
use sign_lens_core::{AnalysisOutcome, AnalysisTicket, CapturedImage, PermissionState};
use sign_lens_ui::{SessionState, ViewModel, project_view, render_text};
use sign_lens_upload::{AnalysisClient, AnalysisEndpoint, AnalysisTransport, UploadError};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("SIGN_LENS_VERSION");

/// Backend used when no URL is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

/// Environment variable overriding the backend URL.
pub const BACKEND_URL_ENV: &str = "SIGN_LENS_BACKEND_URL";

/// Environment variable overriding the capture settle delay.
pub const CAPTURE_DELAY_ENV: &str = "SIGN_LENS_CAPTURE_DELAY_MS";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Startup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Analysis backend base URL.
    pub backend_url: String,
    /// Delay before each capture, in milliseconds.
    pub capture_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            capture_delay_ms: DEFAULT_SETTLE_DELAY_MS,
        }
    }
}

impl AppConfig {
    /// Validates the backend URL.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when the URL is rejected.
    pub fn endpoint(&self) -> Result<AnalysisEndpoint, AppError> {
        AnalysisEndpoint::parse(&self.backend_url)
            .map_err(|error| AppError::Config(error.to_string()))
    }

    /// Capture settings derived from this configuration.
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig::with_settle_delay_ms(self.capture_delay_ms)
    }
}

/// Installs the stderr `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_directive` when set.
///
/// # Errors
/// Returns [`AppError::Logging`] when a global subscriber already exists or
/// the directive is invalid.
pub fn init_tracing(default_directive: &str) -> Result<(), AppError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive)
            .map_err(|error| AppError::Logging(error.to_string()))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| AppError::Logging(error.to_string()))
}

/// Single-screen session driver.
pub struct SignLensApp {
    capture: CaptureController,
    client: AnalysisClient,
    state: watch::Sender<SessionState>,
}

impl SignLensApp {
    /// Creates an app around an existing controller and client.
    pub fn new(capture: CaptureController, client: AnalysisClient) -> Self {
        let (state, _) = watch::channel(SessionState::new());
        Self {
            capture,
            client,
            state,
        }
    }

    /// Builds an app from configuration and injected platform seams.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] for an invalid backend URL.
    pub fn from_config(
        config: &AppConfig,
        permissions: Arc<dyn PermissionProvider>,
        transport: Arc<dyn AnalysisTransport>,
    ) -> Result<Self, AppError> {
        let endpoint = config.endpoint()?;
        let capture = CaptureController::new(config.capture_config(), permissions);
        Ok(Self::new(capture, AnalysisClient::new(endpoint, transport)))
    }

    /// Configured backend endpoint.
    pub fn endpoint(&self) -> &AnalysisEndpoint {
        self.client.endpoint()
    }

    /// Current session state.
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// View projection of the current state.
    pub fn view(&self) -> ViewModel {
        project_view(&self.state.borrow())
    }

    /// Text rendering of the current state.
    pub fn render(&self) -> String {
        render_text(&self.view())
    }

    /// Mounts the camera device backing the preview.
    pub fn mount_camera(&self, camera: &Arc<dyn CameraDevice>) {
        self.capture.mount(camera);
    }

    /// Releases the camera device.
    pub fn unmount_camera(&self) {
        self.capture.unmount();
    }

    /// Reads the OS permission decision without prompting.
    pub async fn check_permission(&self) -> PermissionState {
        let decision = self.capture.refresh_permission().await;
        self.apply(|state| state.with_permission(decision));
        self.snapshot().permission()
    }

    /// Prompts for camera access unless already granted.
    pub async fn request_permission(&self) -> PermissionState {
        let decision = self.capture.request_permission().await;
        self.apply(|state| state.with_permission(decision));
        self.snapshot().permission()
    }

    /// Captures a photo and moves the session to photo review.
    ///
    /// Failures are also surfaced as an alert.
    ///
    /// # Errors
    /// Returns [`AppError::ActionUnavailable`] when a photo is already under
    /// review, or [`AppError::Capture`] when capture fails.
    pub async fn take_picture(&self) -> Result<CapturedImage, AppError> {
        if self.state.borrow().photo().is_some() {
            return Err(AppError::ActionUnavailable("take picture"));
        }

        match self.capture.capture_photo().await {
            Ok(image) => {
                let captured = image.clone();
                self.apply(move |state| state.with_capture(captured));
                Ok(image)
            }
            Err(error) => {
                warn!(%error, "capture failed");
                let message = error.to_string();
                self.apply(move |state| state.with_capture_error(message));
                Err(error.into())
            }
        }
    }

    /// Analyzes the current photo and waits for the result.
    ///
    /// # Errors
    /// Returns [`AppError::ActionUnavailable`] when there is no photo or an
    /// analysis is already in flight.
    pub async fn analyze(&self) -> Result<AnalysisOutcome, AppError> {
        let (ticket, image) = self.begin_analysis()?;
        let outcome = self.client.analyze(&image).await;
        self.finish_analysis(ticket, outcome.clone());
        Ok(outcome)
    }

    /// Starts an analysis in the background.
    ///
    /// The session is marked pending before this returns. The task writes its
    /// result back only if the session still waits for it.
    ///
    /// # Errors
    /// Same as [`SignLensApp::analyze`].
    pub fn spawn_analysis(self: &Arc<Self>) -> Result<JoinHandle<AnalysisOutcome>, AppError> {
        let (ticket, image) = self.begin_analysis()?;
        let app = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let outcome = app.client.analyze(&image).await;
            app.finish_analysis(ticket, outcome.clone());
            outcome
        }))
    }

    /// Discards the photo and any analysis.
    pub fn retake(&self) {
        self.apply(SessionState::retake);
    }

    /// Closes the current alert.
    pub fn dismiss_alert(&self) {
        self.apply(SessionState::dismiss_alert);
    }

    /// Calls the backend health route.
    ///
    /// # Errors
    /// Returns [`AppError::Upload`] when the backend is unreachable or
    /// answers unexpectedly.
    pub async fn health_check(&self) -> Result<HealthReply, AppError> {
        Ok(self.client.health_check().await?)
    }

    fn begin_analysis(&self) -> Result<(AnalysisTicket, CapturedImage), AppError> {
        let mut started = None;
        self.state.send_if_modified(|state| match state.begin_analysis() {
            Some((next, ticket)) => {
                started = next.photo().cloned().map(|photo| (ticket, photo));
                *state = next;
                true
            }
            None => false,
        });

        let (ticket, image) = started.ok_or(AppError::ActionUnavailable("analyze"))?;
        info!(%ticket, "analysis started");
        Ok((ticket, image))
    }

    fn finish_analysis(&self, ticket: AnalysisTicket, outcome: AnalysisOutcome) {
        self.state.send_if_modified(|state| {
            if !state.is_current(ticket) {
                debug!(%ticket, "discarding result of superseded analysis");
                return false;
            }
            *state = state.resolve_analysis(ticket, outcome);
            true
        });
    }

    fn apply(&self, transition: impl FnOnce(&SessionState) -> SessionState) {
        self.state.send_modify(|state| *state = transition(state));
    }
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration rejected at startup.
    #[error("configuration error: {0}")]
    Config(String),
    /// Logging could not be initialised.
    #[error("logging error: {0}")]
    Logging(String),
    /// Action not offered by the current screen.
    #[error("{0} is not available right now")]
    ActionUnavailable(&'static str),
    /// Capture subsystem error.
    #[error(transparent)]
    Capture(#[from] CaptureError),
    /// Upload subsystem error.
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),
    /// Terminal I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
