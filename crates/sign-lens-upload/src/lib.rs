#![warn(missing_docs)]
//! # sign-lens-upload
//!
//! ## Purpose
//! Sends a captured photo to the analysis backend and settles the reply into
//! an [`AnalysisOutcome`].
//!
//! ## Responsibilities
//! - Validate the configured backend base URL.
//! - Package the photo as a single-part multipart form (`image`,
//!   `photo.jpg`, `image/jpeg`).
//! - Issue exactly one POST per analysis through an injectable transport.
//! - Classify replies into success, application error, HTTP error, and
//!   transport failure.
//!
//! ## Data flow
//! [`CapturedImage`] -> [`ImageEnvelope::read`] ->
//! [`AnalysisTransport::post_image`] -> [`TransportResponse`] ->
//! [`outcome_from_response`].
//!
//! ## Ownership and lifetimes
//! Envelopes own the image bytes and are moved into the transport, so the
//! request body never borrows from session state.
//!
//! ## Error model
//! Endpoint validation, image reads, transport calls, and health checks
//! return [`UploadError`]. [`AnalysisClient::analyze`] never fails: every
//! error is folded into a settled [`AnalysisOutcome::Failure`]. There is no
//! retry.

use std::error::Error as StdError;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use sign_lens_analysis_contract::{
    AnalysisContractError, HealthReply, parse_analysis_reply, parse_health_reply,
};
use sign_lens_core::{AnalysisFailure, AnalysisOutcome, CapturedImage, FailureKind};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Analysis route relative to the backend base URL.
pub const ANALYZE_PATH: &str = "analyze-traffic-sign";
/// Health route relative to the backend base URL.
pub const HEALTH_PATH: &str = "test";
/// Multipart field carrying the photo.
pub const IMAGE_FIELD_NAME: &str = "image";
/// File name announced for the photo part.
pub const IMAGE_FILE_NAME: &str = "photo.jpg";
/// Content type announced for the photo part.
pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// Validated backend location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisEndpoint {
    base: Url,
    analyze: Url,
    health: Url,
}

impl AnalysisEndpoint {
    /// Parses a backend base URL such as `http://10.0.0.5:8000`.
    ///
    /// A URL that already ends with the analysis route is accepted and
    /// trimmed back to its base. Query and fragment are dropped.
    ///
    /// # Errors
    /// Returns [`UploadError::InvalidEndpoint`] for unparsable URLs, schemes
    /// other than `http`/`https`, or URLs without a host.
    pub fn parse(raw: &str) -> Result<Self, UploadError> {
        let mut base = Url::parse(raw.trim())
            .map_err(|error| UploadError::InvalidEndpoint(format!("invalid url: {error}")))?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(UploadError::InvalidEndpoint(format!(
                "unsupported scheme '{}'",
                base.scheme()
            )));
        }
        if base.host_str().is_none() {
            return Err(UploadError::InvalidEndpoint(
                "backend url has no host".to_string(),
            ));
        }

        base.set_query(None);
        base.set_fragment(None);

        let trimmed = base.path().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(ANALYZE_PATH).unwrap_or(trimmed);
        let base_path = format!("{}/", trimmed.trim_end_matches('/'));
        base.set_path(&base_path);

        let analyze = join(&base, ANALYZE_PATH)?;
        let health = join(&base, HEALTH_PATH)?;

        Ok(Self {
            base,
            analyze,
            health,
        })
    }

    /// Backend base URL (always ends with `/`).
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Full analysis URL.
    pub fn analyze_url(&self) -> &Url {
        &self.analyze
    }

    /// Full health URL.
    pub fn health_url(&self) -> &Url {
        &self.health
    }

    /// Returns `true` when the backend is reached over TLS.
    pub fn is_https(&self) -> bool {
        self.base.scheme() == "https"
    }
}

fn join(base: &Url, route: &str) -> Result<Url, UploadError> {
    base.join(route)
        .map_err(|error| UploadError::InvalidEndpoint(format!("cannot join {route}: {error}")))
}

/// Multipart payload for one analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEnvelope {
    /// Form field name.
    pub field_name: &'static str,
    /// Announced file name.
    pub file_name: &'static str,
    /// Announced content type.
    pub content_type: &'static str,
    /// Raw image bytes, sent as-is.
    pub bytes: Vec<u8>,
}

impl ImageEnvelope {
    /// Wraps JPEG bytes with the standard field, file name and content type.
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            field_name: IMAGE_FIELD_NAME,
            file_name: IMAGE_FILE_NAME,
            content_type: IMAGE_CONTENT_TYPE,
            bytes,
        }
    }

    /// Reads the captured photo from local storage.
    ///
    /// # Errors
    /// Returns [`UploadError::ImageRead`] when the reference is not a local
    /// file or the file cannot be read.
    pub async fn read(image: &CapturedImage) -> Result<Self, UploadError> {
        let path = image.local_path().map_err(|error| UploadError::ImageRead {
            reference: image.uri().to_string(),
            detail: error.to_string(),
        })?;

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|error| UploadError::ImageRead {
                reference: path.display().to_string(),
                detail: error.to_string(),
            })?;

        Ok(Self::jpeg(bytes))
    }
}

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl TransportResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstract HTTP transport used by [`AnalysisClient`].
#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    /// POSTs the envelope as `multipart/form-data`.
    ///
    /// # Errors
    /// Returns [`UploadError::Transport`] when no HTTP response is received.
    async fn post_image(
        &self,
        url: &Url,
        envelope: ImageEnvelope,
    ) -> Result<TransportResponse, UploadError>;

    /// Issues a GET request.
    ///
    /// # Errors
    /// Returns [`UploadError::Transport`] when no HTTP response is received.
    async fn get(&self, url: &Url) -> Result<TransportResponse, UploadError>;
}

/// `reqwest`-backed transport with platform default timeouts.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a default `reqwest` client.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisTransport for HttpTransport {
    async fn post_image(
        &self,
        url: &Url,
        envelope: ImageEnvelope,
    ) -> Result<TransportResponse, UploadError> {
        let part = Part::bytes(envelope.bytes)
            .file_name(envelope.file_name)
            .mime_str(envelope.content_type)
            .map_err(transport_error)?;
        let form = Form::new().part(envelope.field_name, part);

        let response = self
            .client
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        read_response(response).await
    }

    async fn get(&self, url: &Url) -> Result<TransportResponse, UploadError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport_error)?;
        read_response(response).await
    }
}

async fn read_response(response: reqwest::Response) -> Result<TransportResponse, UploadError> {
    let status = response.status().as_u16();
    let body = response.text().await.map_err(transport_error)?;
    Ok(TransportResponse { status, body })
}

fn transport_error(error: reqwest::Error) -> UploadError {
    UploadError::Transport(error_chain(&error))
}

fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Client for the analysis backend.
#[derive(Clone)]
pub struct AnalysisClient {
    endpoint: AnalysisEndpoint,
    transport: Arc<dyn AnalysisTransport>,
}

impl AnalysisClient {
    /// Creates a client for a validated endpoint.
    pub fn new(endpoint: AnalysisEndpoint, transport: Arc<dyn AnalysisTransport>) -> Self {
        if !endpoint.is_https() {
            warn!(base = %endpoint.base(), "analysis backend is reached over plain http");
        }
        Self {
            endpoint,
            transport,
        }
    }

    /// Configured endpoint.
    pub fn endpoint(&self) -> &AnalysisEndpoint {
        &self.endpoint
    }

    /// Runs one analysis and settles it. The result is never `Pending`.
    ///
    /// An unreadable photo and a request without any HTTP response both
    /// settle as [`FailureKind::Transport`].
    pub async fn analyze(&self, image: &CapturedImage) -> AnalysisOutcome {
        let outcome = match ImageEnvelope::read(image).await {
            Ok(envelope) => self.post(envelope).await,
            Err(error) => {
                warn!(%error, "captured photo could not be read");
                AnalysisOutcome::Failure(AnalysisFailure {
                    kind: FailureKind::Transport,
                    message: error.to_string(),
                })
            }
        };

        match &outcome {
            AnalysisOutcome::Failure(failure) => {
                info!(kind = ?failure.kind, "analysis settled with failure")
            }
            _ => info!("analysis settled with description"),
        }
        outcome
    }

    async fn post(&self, envelope: ImageEnvelope) -> AnalysisOutcome {
        info!(
            url = %self.endpoint.analyze_url(),
            bytes = envelope.bytes.len(),
            "submitting photo for analysis"
        );

        match self
            .transport
            .post_image(self.endpoint.analyze_url(), envelope)
            .await
        {
            Ok(response) => {
                debug!(status = response.status, "analysis backend answered");
                outcome_from_response(&response)
            }
            Err(error) => {
                warn!(%error, "analysis request failed");
                AnalysisOutcome::transport(error)
            }
        }
    }

    /// Calls the backend health route.
    ///
    /// # Errors
    /// Returns [`UploadError::Transport`], [`UploadError::Http`] for non-2xx
    /// statuses, or [`UploadError::Contract`] for unexpected bodies.
    pub async fn health_check(&self) -> Result<HealthReply, UploadError> {
        let response = self.transport.get(self.endpoint.health_url()).await?;
        if !response.is_success() {
            return Err(UploadError::Http {
                status: response.status,
                body: response.body,
            });
        }
        Ok(parse_health_reply(&response.body)?)
    }
}

/// Maps one HTTP exchange to a settled outcome.
///
/// - non-2xx -> [`FailureKind::BackendHttp`] with status and body;
/// - 2xx with `error` -> [`FailureKind::BackendApplication`];
/// - 2xx with `description` -> success;
/// - any other 2xx body -> [`FailureKind::InvalidResponse`].
pub fn outcome_from_response(response: &TransportResponse) -> AnalysisOutcome {
    if !response.is_success() {
        return AnalysisOutcome::backend_http(response.status, &response.body);
    }

    match parse_analysis_reply(&response.body) {
        Ok(reply) => reply.into_outcome(),
        Err(error) => AnalysisOutcome::invalid_response(error),
    }
}

/// Upload layer error type.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Backend URL failed validation.
    #[error("invalid backend endpoint: {0}")]
    InvalidEndpoint(String),
    /// Captured photo could not be read.
    #[error("cannot read captured image {reference}: {detail}")]
    ImageRead {
        /// Image reference or path.
        reference: String,
        /// Underlying failure.
        detail: String,
    },
    /// No HTTP response was received.
    #[error("{0}")]
    Transport(String),
    /// Backend answered with a non-2xx status.
    #[error("backend returned {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },
    /// Backend body did not follow the reply contract.
    #[error(transparent)]
    Contract(#[from] AnalysisContractError),
}

#[cfg(test)]
mod tests {
    //! Unit tests for endpoint validation and reply classification.

    use super::*;

    #[test]
    fn endpoint_derives_routes_from_base() {
        let endpoint = AnalysisEndpoint::parse("http://10.0.0.5:8000").expect("endpoint parses");
        assert_eq!(
            endpoint.analyze_url().as_str(),
            "http://10.0.0.5:8000/analyze-traffic-sign"
        );
        assert_eq!(endpoint.health_url().as_str(), "http://10.0.0.5:8000/test");
        assert!(!endpoint.is_https());
    }

    #[test]
    fn endpoint_accepts_full_analysis_url() {
        let endpoint = AnalysisEndpoint::parse("https://signs.example.test/api/analyze-traffic-sign")
            .expect("endpoint parses");
        assert_eq!(endpoint.base().as_str(), "https://signs.example.test/api/");
        assert_eq!(
            endpoint.analyze_url().as_str(),
            "https://signs.example.test/api/analyze-traffic-sign"
        );
    }

    #[test]
    fn endpoint_rejects_non_http_schemes() {
        assert!(AnalysisEndpoint::parse("ftp://signs.example.test").is_err());
        assert!(AnalysisEndpoint::parse("not a url").is_err());
    }

    #[test]
    fn non_success_status_wins_over_body() {
        let outcome = outcome_from_response(&TransportResponse {
            status: 502,
            body: r#"{"description":"Stop"}"#.to_string(),
        });
        assert_eq!(
            outcome.failure().map(|failure| failure.kind),
            Some(FailureKind::BackendHttp)
        );
    }
}
