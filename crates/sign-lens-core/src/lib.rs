#![warn(missing_docs)]
//! # sign-lens-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `sign-lens` workspace.
//!
//! ## Responsibilities
//! - Model camera permission state and its legal transitions.
//! - Represent a validated captured photo and resolve its local path.
//! - Represent analysis outcomes and the failure taxonomy surfaced to users.
//! - Tag in-flight analyses with tickets so late results can be recognized.
//!
//! ## Data flow
//! The capture controller produces a [`CapturedImage`]. The analysis client
//! turns it into an [`AnalysisOutcome`]. Session state pairs each pending
//! outcome with an [`AnalysisTicket`].
//!
//! ## Ownership and lifetimes
//! All values own their strings so they can move freely between the UI state
//! and async analysis tasks.
//!
//! ## Error model
//! Invalid captures and unresolvable image references return [`CoreError`].
//!
//! ## Example
//! ```rust
//! use sign_lens_core::{CapturedImage, PermissionState};
//!
//! let image = CapturedImage::new("file:///tmp/photo.jpg", 640, 480).unwrap();
//! assert_eq!(image.width(), 640);
//! assert!(CapturedImage::new("file:///tmp/photo.jpg", 0, 480).is_err());
//!
//! let state = PermissionState::Unknown.transition(PermissionState::Denied);
//! assert_eq!(state.transition(PermissionState::Granted), PermissionState::Granted);
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Camera permission state for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionState {
    /// The OS has not been asked yet.
    #[default]
    Unknown,
    /// The user refused camera access.
    Denied,
    /// Camera access is available for the rest of the session.
    Granted,
}

impl PermissionState {
    /// Returns `true` when the camera may be used.
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }

    /// Applies a decision reported by the OS and returns the resulting state.
    ///
    /// # Semantics
    /// - `Granted` is terminal: later decisions are ignored.
    /// - No decision moves the state back to `Unknown`.
    /// - `Unknown` and `Denied` accept `Denied` or `Granted`.
    pub fn transition(self, decision: PermissionState) -> PermissionState {
        match (self, decision) {
            (Self::Granted, _) => Self::Granted,
            (current, Self::Unknown) => current,
            (_, decision) => decision,
        }
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unknown => "unknown",
            Self::Denied => "denied",
            Self::Granted => "granted",
        };
        f.write_str(label)
    }
}

/// A photo produced by the capture controller.
///
/// Construction validates geometry, so a value of this type always has a
/// non-empty reference and positive dimensions. Deserialization goes through
/// the same check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CapturedImageRecord")]
pub struct CapturedImage {
    uri: String,
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct CapturedImageRecord {
    uri: String,
    width: u32,
    height: u32,
}

impl TryFrom<CapturedImageRecord> for CapturedImage {
    type Error = CoreError;

    fn try_from(record: CapturedImageRecord) -> Result<Self, Self::Error> {
        Self::new(record.uri, record.width, record.height)
    }
}

impl CapturedImage {
    /// Creates a validated captured image.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyReference`] for a blank reference.
    /// Returns [`CoreError::EmptyImage`] when either dimension is zero.
    pub fn new(uri: impl Into<String>, width: u32, height: u32) -> Result<Self, CoreError> {
        let uri = uri.into();
        if uri.trim().is_empty() {
            return Err(CoreError::EmptyReference);
        }
        if width == 0 || height == 0 {
            return Err(CoreError::EmptyImage { width, height });
        }

        Ok(Self { uri, width, height })
    }

    /// Opaque local reference reported by the camera (URI or path).
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resolves the reference to a filesystem path.
    ///
    /// `file://` URIs and plain paths are accepted. A single-letter scheme is
    /// read as a Windows drive prefix.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidReference`] for any other URI scheme or a
    /// `file://` URI that does not map to a local path.
    pub fn local_path(&self) -> Result<PathBuf, CoreError> {
        match Url::parse(&self.uri) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|_| CoreError::InvalidReference(self.uri.clone())),
            Ok(url) if url.scheme().len() == 1 => Ok(PathBuf::from(&self.uri)),
            Ok(_) => Err(CoreError::InvalidReference(self.uri.clone())),
            Err(_) => Ok(PathBuf::from(&self.uri)),
        }
    }
}

/// Categories of analysis failure shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The request never produced an HTTP response.
    Transport,
    /// The backend answered 2xx with an `error` field.
    BackendApplication,
    /// The backend answered with a non-2xx status.
    BackendHttp,
    /// The backend answered 2xx with a body outside the reply contract.
    InvalidResponse,
}

/// A settled analysis failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// User-facing message.
    pub message: String,
}

impl AnalysisFailure {
    /// Title used when the failure is surfaced as an alert.
    pub fn alert_title(&self) -> &'static str {
        match self.kind {
            FailureKind::BackendApplication => "Backend Error",
            _ => "Error",
        }
    }
}

/// Result of one analysis request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisOutcome {
    /// The request is in flight.
    Pending,
    /// The backend described the image.
    Success(String),
    /// The request failed.
    Failure(AnalysisFailure),
}

impl AnalysisOutcome {
    /// Failure for a request that never got an HTTP response.
    pub fn transport(detail: impl fmt::Display) -> Self {
        Self::Failure(AnalysisFailure {
            kind: FailureKind::Transport,
            message: format!("Failed to connect to backend: {detail}"),
        })
    }

    /// Failure reported by the backend through its `error` field.
    pub fn backend_application(message: impl Into<String>) -> Self {
        Self::Failure(AnalysisFailure {
            kind: FailureKind::BackendApplication,
            message: message.into(),
        })
    }

    /// Failure for a non-2xx status; the message carries status and body.
    pub fn backend_http(status: u16, body: &str) -> Self {
        Self::Failure(AnalysisFailure {
            kind: FailureKind::BackendHttp,
            message: format!("Backend error: {status} - {body}"),
        })
    }

    /// Failure for a 2xx body that does not follow the reply contract.
    pub fn invalid_response(detail: impl fmt::Display) -> Self {
        Self::Failure(AnalysisFailure {
            kind: FailureKind::InvalidResponse,
            message: format!("Invalid response from backend: {detail}"),
        })
    }

    /// Returns `true` once the outcome is `Success` or `Failure`.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Description text for successful outcomes.
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Success(description) => Some(description),
            _ => None,
        }
    }

    /// Failure details for failed outcomes.
    pub fn failure(&self) -> Option<&AnalysisFailure> {
        match self {
            Self::Failure(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Generation tag identifying one analysis request within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisTicket(u64);

impl AnalysisTicket {
    /// Creates a ticket for a generation number.
    pub fn new(generation: u64) -> Self {
        Self(generation)
    }

    /// Generation number of this ticket.
    pub fn generation(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnalysisTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "analysis#{}", self.0)
    }
}

/// Error type for core validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Capture produced an image without usable geometry.
    #[error("Image appears to be empty or invalid ({width}x{height})")]
    EmptyImage {
        /// Reported width.
        width: u32,
        /// Reported height.
        height: u32,
    },
    /// Capture produced no image reference.
    #[error("image reference is empty")]
    EmptyReference,
    /// The image reference cannot be read as a local file.
    #[error("image reference is not a local file: {0}")]
    InvalidReference(String),
}
