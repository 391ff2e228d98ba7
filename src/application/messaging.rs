/*
Messaging

Request/response plumbing between the page side (orchestrator) and the background side that owns
the classifier and the rule store. Every request carries its own oneshot reply channel, so a
response can be produced asynchronously and still reach exactly one caller.

Wire form (JSON lines on the `serve` command) uses an `action` tag:

  {"action":"filterBatch","tweets":[{"text":"...","hasImages":false}],"filters":["crypto"]}
*/

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::application::ports::input::batch_classifier_port::BatchClassifierPort;
use crate::application::ports::output::rule_store_port::RuleStorePort;
use crate::application::use_cases::classification_service::ClassificationService;
use crate::config::FallbackPolicy;
use crate::domain::entities::classification::{ClassificationResult, ClassifierAvailability};
use crate::domain::entities::content_unit::TweetPayload;
use crate::domain::entities::filter_rule::RuleSet;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MessagingError {
    #[error("Background service is not running")]
    Closed,
    #[error("Background service dropped the request without replying")]
    NoReply,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    GetFilters,
    #[serde(rename = "checkAPI")]
    CheckApi,
    /// `filters` falls back to the stored rules when absent.
    FilterBatch {
        tweets: Vec<TweetPayload>,
        #[serde(default)]
        filters: Option<RuleSet>,
    },
    FilterContent {
        text: String,
        #[serde(default)]
        filters: Option<RuleSet>,
    },
    UpdateFilters {
        filters: RuleSet,
    },
    #[serde(rename = "getAIStatus")]
    GetAiStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiStatus {
    pub configured: bool,
    pub model: String,
    pub fallback: FallbackPolicy,
    pub active_filters: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Filters { filters: RuleSet },
    Batch { results: Vec<ClassificationResult> },
    Single(ClassificationResult),
    Availability(ClassifierAvailability),
    Status(AiStatus),
    Updated { success: bool },
    Error { error: String },
}

#[derive(Debug)]
pub struct Envelope {
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}

/// Background side: answers requests and broadcasts rule changes to every open page.
pub struct BackgroundService {
    classifier: Arc<ClassificationService>,
    store: Arc<dyn RuleStorePort>,
    updates: broadcast::Sender<RuleSet>,
}

impl BackgroundService {
    pub fn new(classifier: Arc<ClassificationService>, store: Arc<dyn RuleStorePort>) -> Self {
        let (updates, _) = broadcast::channel(16);
        Self {
            classifier,
            store,
            updates,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RuleSet> {
        self.updates.subscribe()
    }

    async fn rules_or_stored(&self, filters: Option<RuleSet>) -> Result<RuleSet, Response> {
        match filters {
            Some(rules) => Ok(rules),
            None => self.store.get().await.map_err(|e| Response::Error { error: e.to_string() }),
        }
    }

    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::GetFilters => match self.store.get().await {
                Ok(filters) => Response::Filters { filters },
                Err(e) => Response::Error { error: e.to_string() },
            },
            Request::CheckApi => Response::Availability(self.classifier.gateway().check_availability().await),
            Request::FilterBatch { tweets, filters } => match self.rules_or_stored(filters).await {
                Ok(rules) => Response::Batch {
                    results: self.classifier.classify(&tweets, &rules).await,
                },
                Err(response) => response,
            },
            Request::FilterContent { text, filters } => match self.rules_or_stored(filters).await {
                Ok(rules) => Response::Single(self.classifier.classify_one(&text, &rules).await),
                Err(response) => response,
            },
            Request::UpdateFilters { filters } => {
                if let Err(e) = self.store.set(&filters).await {
                    log::error!("Failed to save filter rules: {}", e);
                    return Response::Error { error: e.to_string() };
                }
                if self.updates.send(filters).is_err() {
                    log::debug!("No pages listening for rule updates");
                }
                Response::Updated { success: true }
            }
            Request::GetAiStatus => {
                let active_filters = match self.store.get().await {
                    Ok(rules) => rules.len(),
                    Err(e) => {
                        log::warn!("Could not read filter rules for status: {}", e);
                        0
                    }
                };
                let gateway = self.classifier.gateway();
                Response::Status(AiStatus {
                    configured: gateway.is_configured(),
                    model: gateway.model().to_string(),
                    fallback: self.classifier.fallback(),
                    active_filters,
                })
            }
        }
    }

    /// Answers requests until every client is dropped.
    pub async fn serve(&self, mut inbox: mpsc::Receiver<Envelope>) {
        while let Some(envelope) = inbox.recv().await {
            let response = self.handle(envelope.request).await;
            if envelope.reply.send(response).is_err() {
                log::warn!("Requester went away before the response was ready");
            }
        }
        log::debug!("Message inbox closed");
    }
}

pub fn channel(capacity: usize) -> (MessageClient, mpsc::Receiver<Envelope>) {
    let (outbox, inbox) = mpsc::channel(capacity);
    (MessageClient { outbox }, inbox)
}

/// Page side of the channel. Also usable as the orchestrator's classifier.
#[derive(Debug, Clone)]
pub struct MessageClient {
    outbox: mpsc::Sender<Envelope>,
}

impl MessageClient {
    pub async fn request(&self, request: Request) -> Result<Response, MessagingError> {
        let (reply, response) = oneshot::channel();
        self.outbox
            .send(Envelope { request, reply })
            .await
            .map_err(|_| MessagingError::Closed)?;
        response.await.map_err(|_| MessagingError::NoReply)
    }
}

#[async_trait]
impl BatchClassifierPort for MessageClient {
    async fn classify_batch(&self, units: &[TweetPayload], rules: &RuleSet) -> Vec<ClassificationResult> {
        let request = Request::FilterBatch {
            tweets: units.to_vec(),
            filters: Some(rules.clone()),
        };
        let error = match self.request(request).await {
            Ok(Response::Batch { results }) if results.len() == units.len() => return results,
            Ok(Response::Batch { results }) => {
                format!("expected {} results, got {}", units.len(), results.len())
            }
            Ok(Response::Error { error }) => error,
            Ok(other) => format!("unexpected response {:?}", other),
            Err(e) => e.to_string(),
        };
        log::warn!("filterBatch failed: {}", error);
        units
            .iter()
            .map(|_| ClassificationResult::batch_error(&error))
            .collect()
    }

    async fn availability(&self) -> ClassifierAvailability {
        match self.request(Request::CheckApi).await {
            Ok(Response::Availability(availability)) => availability,
            Ok(other) => ClassifierAvailability::unavailable(format!("unexpected response {:?}", other)),
            Err(e) => ClassifierAvailability::unavailable(e.to_string()),
        }
    }
}
