//! Shared fixtures for upload integration tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use sign_lens_core::CapturedImage;
use sign_lens_upload::{AnalysisTransport, ImageEnvelope, TransportResponse, UploadError};
use url::Url;

/// Fake JPEG payload written to disk for uploads.
#[allow(dead_code)]
pub const FIXTURE_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];

/// Writes the fixture photo into `dir` and returns a captured image for it.
#[allow(dead_code)]
pub fn fixture_image(dir: &Path) -> CapturedImage {
    let path = dir.join("capture.jpg");
    std::fs::write(&path, FIXTURE_JPEG).expect("fixture photo should be written");
    CapturedImage::new(path.display().to_string(), 640, 480).expect("fixture image is valid")
}

/// Transport returning scripted results and recording every request.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<TransportResponse, UploadError>>>,
    pub posts: Mutex<Vec<(Url, ImageEnvelope)>>,
    pub gets: Mutex<Vec<Url>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn replying(status: u16, body: &str) -> Self {
        let transport = Self::default();
        transport.push(Ok(TransportResponse {
            status,
            body: body.to_string(),
        }));
        transport
    }

    pub fn failing(detail: &str) -> Self {
        let transport = Self::default();
        transport.push(Err(UploadError::Transport(detail.to_string())));
        transport
    }

    pub fn push(&self, result: Result<TransportResponse, UploadError>) {
        self.responses
            .lock()
            .expect("response lock should work")
            .push_back(result);
    }

    fn next(&self) -> Result<TransportResponse, UploadError> {
        self.responses
            .lock()
            .expect("response lock should work")
            .pop_front()
            .unwrap_or_else(|| Err(UploadError::Transport("no scripted response".to_string())))
    }
}

#[async_trait]
impl AnalysisTransport for ScriptedTransport {
    async fn post_image(
        &self,
        url: &Url,
        envelope: ImageEnvelope,
    ) -> Result<TransportResponse, UploadError> {
        self.posts
            .lock()
            .expect("post lock should work")
            .push((url.clone(), envelope));
        self.next()
    }

    async fn get(&self, url: &Url) -> Result<TransportResponse, UploadError> {
        self.gets.lock().expect("get lock should work").push(url.clone());
        self.next()
    }
}
