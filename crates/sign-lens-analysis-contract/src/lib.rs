#![warn(missing_docs)]
//! # sign-lens-analysis-contract
//!
//! ## Purpose
//! Defines the backend reply schema and maps replies to analysis outcomes.
//!
//! ## Responsibilities
//! - Parse `{"description": ...}` / `{"error": ...}` analysis replies.
//! - Parse the `{"message": ...}` health reply.
//! - Keep the application-level error path separate from transport errors.
//!
//! ## Data flow
//! Raw 2xx body -> [`parse_analysis_reply`] -> [`AnalysisReply::into_outcome`]
//! -> session state.
//!
//! ## Error model
//! Invalid JSON or a body with neither field returns [`AnalysisContractError`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sign_lens_core::AnalysisOutcome;
use thiserror::Error;

/// Decoded analysis reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisReply {
    /// Backend described the sign.
    Description(String),
    /// Backend reported an application-level error.
    Error(String),
}

impl AnalysisReply {
    /// Converts the reply into a settled outcome.
    pub fn into_outcome(self) -> AnalysisOutcome {
        match self {
            Self::Description(description) => AnalysisOutcome::Success(description),
            Self::Error(message) => AnalysisOutcome::backend_application(message),
        }
    }
}

/// Health endpoint reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReply {
    /// Free-form server status text.
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct WireReply {
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Parses a 2xx analysis body.
///
/// A non-empty `error` wins over `description`. Non-string values are kept in
/// their JSON text form.
///
/// # Errors
/// Returns [`AnalysisContractError::Decode`] for invalid JSON.
/// Returns [`AnalysisContractError::InvalidContract`] when neither field
/// carries a value.
pub fn parse_analysis_reply(raw: &str) -> Result<AnalysisReply, AnalysisContractError> {
    let wire: WireReply = serde_json::from_str(raw)?;

    if let Some(error) = wire.error.and_then(value_text) {
        return Ok(AnalysisReply::Error(error));
    }

    wire.description
        .and_then(value_text)
        .map(AnalysisReply::Description)
        .ok_or_else(|| {
            AnalysisContractError::InvalidContract(
                "reply has neither description nor error".to_string(),
            )
        })
}

/// Parses the health endpoint body.
///
/// # Errors
/// Returns [`AnalysisContractError::Decode`] for invalid JSON or a missing
/// `message` field.
pub fn parse_health_reply(raw: &str) -> Result<HealthReply, AnalysisContractError> {
    Ok(serde_json::from_str(raw)?)
}

fn value_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

/// Analysis contract errors.
#[derive(Debug, Error)]
pub enum AnalysisContractError {
    /// JSON decode failure.
    #[error("analysis decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// Parsed payload violates contract invariants.
    #[error("analysis contract violation: {0}")]
    InvalidContract(String),
}
