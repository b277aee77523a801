#![warn(missing_docs)]
//! # sign-lens-capture
//!
//! ## Purpose
//! Owns camera permission state and the camera device handle, and turns a
//! "take picture" action into a validated [`CapturedImage`].
//!
//! ## Responsibilities
//! - Define backend-agnostic camera and permission traits.
//! - Gate captures on permission and camera readiness.
//! - Wait a short settle delay before triggering the shutter.
//! - Provide a file-backed camera for terminal use and a synthetic camera for
//!   tests.
//!
//! ## Data flow
//! Front-end mounts a [`CameraDevice`] -> [`CaptureController::capture_photo`]
//! checks gates, waits, captures -> [`RawPhoto`] is validated into a
//! [`CapturedImage`].
//!
//! ## Ownership and lifetimes
//! The controller keeps only a weak handle to the mounted camera. Whoever
//! mounted the device owns it; once it is dropped or unmounted, captures fail
//! with [`CaptureError::CameraNotReady`].
//!
//! ## Error model
//! Gate violations, empty captures, and device failures are reported as
//! [`CaptureError`] values. None of them are retried.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use sign_lens_core::{CapturedImage, CoreError, PermissionState};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Default delay between a capture request and the shutter trigger.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

/// Per-capture options forwarded to the camera device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureOptions {
    /// Encoder quality in `[0.0, 1.0]`.
    pub quality: f32,
    /// Whether the device should also return an inline base64 payload.
    pub include_base64: bool,
    /// Whether the device should embed EXIF metadata.
    pub include_exif: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            quality: 1.0,
            include_base64: false,
            include_exif: false,
        }
    }
}

/// Capture controller configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureConfig {
    /// Delay applied before each capture.
    pub settle_delay: Duration,
    /// Options passed to the device.
    pub options: CaptureOptions,
}

impl CaptureConfig {
    /// Creates configuration with the given settle delay and default options.
    pub fn with_settle_delay_ms(settle_delay_ms: u64) -> Self {
        Self {
            settle_delay: Duration::from_millis(settle_delay_ms),
            options: CaptureOptions::default(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::with_settle_delay_ms(DEFAULT_SETTLE_DELAY_MS)
    }
}

/// Unvalidated capture result reported by a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPhoto {
    /// Local reference to the written photo.
    pub uri: String,
    /// Reported width in pixels.
    pub width: u32,
    /// Reported height in pixels.
    pub height: u32,
}

/// Trait implemented by camera providers.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Returns `true` once the device can take a picture.
    fn is_ready(&self) -> bool;

    /// Captures one photo to local storage.
    ///
    /// # Errors
    /// Returns [`CaptureError::Platform`] for device failures.
    async fn take_picture(&self, options: &CaptureOptions) -> Result<RawPhoto, CaptureError>;
}

/// Trait implemented by OS permission bridges.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Reads the current decision without prompting.
    async fn current(&self) -> PermissionState;

    /// Prompts the user and returns the decision.
    async fn request(&self) -> PermissionState;
}

/// Gatekeeper for permission and camera access.
pub struct CaptureController {
    config: CaptureConfig,
    permissions: Arc<dyn PermissionProvider>,
    permission: Mutex<PermissionState>,
    camera: RwLock<Option<Weak<dyn CameraDevice>>>,
}

impl CaptureController {
    /// Creates a controller with no mounted camera and unknown permission.
    pub fn new(config: CaptureConfig, permissions: Arc<dyn PermissionProvider>) -> Self {
        Self {
            config,
            permissions,
            permission: Mutex::new(PermissionState::Unknown),
            camera: RwLock::new(None),
        }
    }

    /// Returns the last known permission state.
    pub fn permission(&self) -> PermissionState {
        *self
            .permission
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Queries the current OS decision without prompting.
    ///
    /// An undetermined answer is recorded as `Denied`, so the session leaves
    /// `Unknown` after the first query and offers the permission request.
    pub async fn refresh_permission(&self) -> PermissionState {
        if self.permission().is_granted() {
            return PermissionState::Granted;
        }

        let decision = match self.permissions.current().await {
            PermissionState::Unknown => PermissionState::Denied,
            decision => decision,
        };
        self.apply_permission(decision)
    }

    /// Prompts for camera access unless it is already granted.
    pub async fn request_permission(&self) -> PermissionState {
        if self.permission().is_granted() {
            debug!("camera permission already granted; skipping prompt");
            return PermissionState::Granted;
        }

        let decision = self.permissions.request().await;
        let state = self.apply_permission(decision);
        info!(permission = %state, "camera permission requested");
        state
    }

    /// Mounts a camera. The controller keeps a non-owning handle.
    pub fn mount(&self, camera: &Arc<dyn CameraDevice>) {
        let mut slot = self.camera.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::downgrade(camera));
        debug!("camera mounted");
    }

    /// Releases the camera handle.
    pub fn unmount(&self) {
        let mut slot = self.camera.write().unwrap_or_else(PoisonError::into_inner);
        if slot.take().is_some() {
            debug!("camera unmounted");
        }
    }

    /// Returns `true` when a mounted camera is alive and ready.
    pub fn camera_ready(&self) -> bool {
        self.ready_camera().is_ok()
    }

    /// Captures and validates one photo.
    ///
    /// # Errors
    /// - [`CaptureError::PermissionDenied`] without granted permission.
    /// - [`CaptureError::CameraNotReady`] when no ready camera is mounted,
    ///   checked both before and after the settle delay.
    /// - [`CaptureError::EmptyImage`] when the device reports no geometry.
    /// - [`CaptureError::Platform`] for device failures.
    pub async fn capture_photo(&self) -> Result<CapturedImage, CaptureError> {
        if !self.permission().is_granted() {
            return Err(CaptureError::PermissionDenied);
        }
        self.ready_camera()?;

        tokio::time::sleep(self.config.settle_delay).await;

        let camera = self.ready_camera()?;
        let photo = camera.take_picture(&self.config.options).await?;

        match CapturedImage::new(photo.uri, photo.width, photo.height) {
            Ok(image) => {
                info!(
                    width = image.width(),
                    height = image.height(),
                    "photo captured"
                );
                Ok(image)
            }
            Err(error) => {
                warn!(%error, "camera returned an unusable photo");
                Err(CaptureError::EmptyImage(error))
            }
        }
    }

    fn apply_permission(&self, decision: PermissionState) -> PermissionState {
        let mut state = self
            .permission
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *state = state.transition(decision);
        *state
    }

    fn ready_camera(&self) -> Result<Arc<dyn CameraDevice>, CaptureError> {
        let slot = self.camera.read().unwrap_or_else(PoisonError::into_inner);
        let camera = slot
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(CaptureError::CameraNotReady)?;

        if !camera.is_ready() {
            return Err(CaptureError::CameraNotReady);
        }
        Ok(camera)
    }
}

/// Camera that "captures" an existing image file.
///
/// The reported geometry is decoded from the file itself. The device counts
/// as ready while the source file exists.
#[derive(Debug)]
pub struct FileCamera {
    source: PathBuf,
}

impl FileCamera {
    /// Creates a camera reading from `source`.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

#[async_trait]
impl CameraDevice for FileCamera {
    fn is_ready(&self) -> bool {
        self.source.is_file()
    }

    async fn take_picture(&self, options: &CaptureOptions) -> Result<RawPhoto, CaptureError> {
        let source = std::path::absolute(&self.source).map_err(|error| {
            CaptureError::Platform(format!(
                "cannot resolve {}: {error}",
                self.source.display()
            ))
        })?;

        let probe = source.clone();
        let (width, height) = tokio::task::spawn_blocking(move || image::image_dimensions(probe))
            .await
            .map_err(|error| CaptureError::Platform(format!("capture task failed: {error}")))?
            .map_err(|error| {
                CaptureError::Platform(format!("cannot decode {}: {error}", source.display()))
            })?;

        let uri = Url::from_file_path(&source)
            .map_err(|_| {
                CaptureError::Platform(format!("{} is not a file path", source.display()))
            })?
            .to_string();

        debug!(%uri, quality = options.quality, "file camera captured");
        Ok(RawPhoto { uri, width, height })
    }
}

/// Deterministic camera for tests and demos.
///
/// Scripted results are returned first, then the default photo.
#[derive(Debug)]
pub struct SyntheticCamera {
    photo: RawPhoto,
    ready: AtomicBool,
    script: Mutex<VecDeque<Result<RawPhoto, String>>>,
    captures: AtomicUsize,
}

impl SyntheticCamera {
    /// Creates a ready camera returning `uri` with the given geometry.
    pub fn new(uri: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            photo: RawPhoto {
                uri: uri.into(),
                width,
                height,
            },
            ready: AtomicBool::new(true),
            script: Mutex::new(VecDeque::new()),
            captures: AtomicUsize::new(0),
        }
    }

    /// Queues one result for the next capture. `Err` becomes a platform error.
    pub fn push_result(&self, result: Result<RawPhoto, String>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
    }

    /// Toggles device readiness.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Number of captures triggered so far.
    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraDevice for SyntheticCamera {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn take_picture(&self, _options: &CaptureOptions) -> Result<RawPhoto, CaptureError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match scripted {
            Some(result) => result.map_err(CaptureError::Platform),
            None => Ok(self.photo.clone()),
        }
    }
}

/// Permission provider with a fixed answer.
#[derive(Debug)]
pub struct StaticPermissions {
    initial: PermissionState,
    decision: PermissionState,
    prompts: AtomicUsize,
}

impl StaticPermissions {
    /// Creates a provider that reports `initial` and answers prompts with
    /// `decision`.
    pub fn new(initial: PermissionState, decision: PermissionState) -> Self {
        Self {
            initial,
            decision,
            prompts: AtomicUsize::new(0),
        }
    }

    /// Provider that grants on the first prompt.
    pub fn granting() -> Self {
        Self::new(PermissionState::Unknown, PermissionState::Granted)
    }

    /// Number of prompts shown so far.
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionProvider for StaticPermissions {
    async fn current(&self) -> PermissionState {
        self.initial
    }

    async fn request(&self) -> PermissionState {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.decision
    }
}

/// Capture layer error type.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Camera access was not granted.
    #[error("camera permission has not been granted")]
    PermissionDenied,
    /// No ready camera is mounted.
    #[error("Camera not ready")]
    CameraNotReady,
    /// The device returned a photo without usable geometry.
    #[error("{0}")]
    EmptyImage(#[source] CoreError),
    /// Device or OS failure.
    #[error("Failed to take picture: {0}")]
    Platform(String),
}
