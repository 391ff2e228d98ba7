/*

Classifier Port

The port through which the application reaches the external semantic classifier. The adapter owns
the transport, the credential check and the provider's wire format; the application only hands it a
fully built batch request and receives the raw text the classifier produced.

A batch call either fails as a whole or returns one raw payload. Whether that payload actually has
the expected shape is decided later by the response aligner, so a successful status with a garbled
body is still `Ok` here.

*/
use async_trait::async_trait;
use thiserror::Error;

use crate::application::use_cases::batch_request_builder::BatchRequest;
use crate::domain::entities::classification::ClassifierAvailability;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("API key not configured")]
    NotConfigured,
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
}

impl GatewayError {
    /// Transport failures are the ones a fallback policy reacts to.
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Http { .. } | GatewayError::Network(_))
    }
}

/// Raw text returned by the classifier for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub model: String,
    pub text: String,
}

impl RawResponse {
    pub fn new(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            text: text.into(),
        }
    }
}

#[async_trait]
pub trait ClassifierPort: Send + Sync {
    /// Issue exactly one classifier request for the whole batch.
    async fn call(&self, request: &BatchRequest) -> Result<RawResponse, GatewayError>;

    /// Probe the classifier. Never returns an error; failures are reported in the result.
    async fn check_availability(&self) -> ClassifierAvailability;

    /// Whether a credential is present, without any network access.
    fn is_configured(&self) -> bool;

    /// Model identifier used for provenance tags.
    fn model(&self) -> &str;
}
