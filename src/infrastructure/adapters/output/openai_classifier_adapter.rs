use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::output::classifier_port::{ClassifierPort, GatewayError, RawResponse};
use crate::application::use_cases::batch_request_builder::BatchRequest;
use crate::config::{ClassifierSettings, SettingsError};
use crate::domain::entities::classification::ClassifierAvailability;

const SYSTEM_PROMPT: &str =
    "You classify social media posts against user filter rules and answer with JSON only.";

/// OpenAI chat completion request structures
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// OpenAI chat completion response structures
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Classifier gateway speaking the OpenAI chat completions protocol.
pub struct OpenAIClassifierAdapter {
    settings: ClassifierSettings,
    client: Client,
}

impl OpenAIClassifierAdapter {
    pub fn new(settings: ClassifierSettings) -> Result<Self, SettingsError> {
        settings.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| SettingsError::Invalid(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { settings, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    /// Send one chat request and return the body of a successful response.
    async fn send_chat(&self, api_key: &str, request: &ChatRequest<'_>) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Network(format!("Request timed out: {}", e))
                } else {
                    GatewayError::Network(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Network(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = extract_error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unexpected status")
                    .to_string()
            });
            return Err(GatewayError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
}

#[async_trait]
impl ClassifierPort for OpenAIClassifierAdapter {
    async fn call(&self, request: &BatchRequest) -> Result<RawResponse, GatewayError> {
        let api_key = self.settings.credential().ok_or(GatewayError::NotConfigured)?;

        let chat = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage::new("system", SYSTEM_PROMPT),
                ChatMessage::new("user", request.prompt.clone()),
            ],
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
        };

        log::debug!(
            "Sending batch {} with {} post(s) to {}",
            request.id,
            request.len(),
            self.settings.model
        );
        let body = self.send_chat(api_key, &chat).await?;

        let content = serde_json::from_str::<ChatResponse>(&body)
            .ok()
            .and_then(|response| response.choices.into_iter().next())
            .and_then(|choice| choice.message.content);

        match content {
            Some(text) => Ok(RawResponse::new(self.settings.model.clone(), text)),
            None => {
                // Successful status with an unexpected body: let the aligner downgrade it.
                log::warn!("Batch {} returned a body without message content", request.id);
                Ok(RawResponse::new(self.settings.model.clone(), body))
            }
        }
    }

    async fn check_availability(&self) -> ClassifierAvailability {
        let Some(api_key) = self.settings.credential() else {
            return ClassifierAvailability::not_configured();
        };

        let probe = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage::new("user", "ping")],
            temperature: 0.0,
            max_tokens: 1,
        };

        match self.send_chat(api_key, &probe).await {
            Ok(body) => {
                let model = serde_json::from_str::<ChatResponse>(&body)
                    .ok()
                    .and_then(|response| response.model)
                    .unwrap_or_else(|| self.settings.model.clone());
                ClassifierAvailability::available(model)
            }
            Err(e) => ClassifierAvailability::unavailable(e.to_string()),
        }
    }

    fn is_configured(&self) -> bool {
        self.settings.credential().is_some()
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}
