//! Shared fixtures for app integration tests.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sign_lens_app::{AppConfig, SignLensApp};
use sign_lens_capture::{CameraDevice, StaticPermissions, SyntheticCamera};
use sign_lens_upload::{AnalysisTransport, ImageEnvelope, TransportResponse, UploadError};
use tokio::sync::Notify;
use url::Url;

/// Transport answering every POST with the same result, optionally held
/// until [`FixedTransport::release`] is called.
#[allow(dead_code)]
pub struct FixedTransport {
    reply: Result<TransportResponse, String>,
    gate: Option<Notify>,
    pub posts: AtomicUsize,
}

#[allow(dead_code)]
impl FixedTransport {
    pub fn replying(status: u16, body: &str) -> Self {
        Self {
            reply: Ok(TransportResponse {
                status,
                body: body.to_string(),
            }),
            gate: None,
            posts: AtomicUsize::new(0),
        }
    }

    pub fn disconnected(detail: &str) -> Self {
        Self {
            reply: Err(detail.to_string()),
            gate: None,
            posts: AtomicUsize::new(0),
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn posts(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }

    fn respond(&self) -> Result<TransportResponse, UploadError> {
        self.reply.clone().map_err(UploadError::Transport)
    }
}

#[async_trait]
impl AnalysisTransport for FixedTransport {
    async fn post_image(
        &self,
        _url: &Url,
        _envelope: ImageEnvelope,
    ) -> Result<TransportResponse, UploadError> {
        self.posts.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.respond()
    }

    async fn get(&self, _url: &Url) -> Result<TransportResponse, UploadError> {
        self.respond()
    }
}

/// App wired to a granting permission provider and the given transport.
#[allow(dead_code)]
pub struct Harness {
    pub app: Arc<SignLensApp>,
    pub camera: Arc<SyntheticCamera>,
    pub permissions: Arc<StaticPermissions>,
    pub transport: Arc<FixedTransport>,
}

/// Writes a fixture photo into `dir` and builds a mounted harness around it.
#[allow(dead_code)]
pub fn harness(dir: &Path, transport: FixedTransport) -> Harness {
    let path = dir.join("capture.jpg");
    std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9]).expect("fixture photo should be written");

    let permissions = Arc::new(StaticPermissions::granting());
    let transport = Arc::new(transport);
    let config = AppConfig {
        backend_url: "http://backend.test:8000".to_string(),
        capture_delay_ms: 0,
    };
    let app = Arc::new(
        SignLensApp::from_config(&config, permissions.clone(), transport.clone())
            .expect("app should build"),
    );

    let camera = Arc::new(SyntheticCamera::new(path.display().to_string(), 640, 480));
    let camera_handle: Arc<dyn CameraDevice> = camera.clone();
    app.mount_camera(&camera_handle);

    Harness {
        app,
        camera,
        permissions,
        transport,
    }
}
