/*
Classification Service

Runs the batch pipeline for a list of posts:

  builder -> gateway -> aligner, one gateway call per bounded chunk

and decides what each post gets when the gateway cannot deliver. A missing credential means the
classifier is unavailable and the keyword heuristic answers instead. Transport failures follow the
configured fallback policy. Either way the output has one result per input post.
*/

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::ports::input::batch_classifier_port::BatchClassifierPort;
use crate::application::ports::output::classifier_port::ClassifierPort;
use crate::application::use_cases::batch_request_builder::BatchRequestBuilder;
use crate::application::use_cases::response_aligner::ResponseAligner;
use crate::config::{BatchSettings, FallbackPolicy};
use crate::domain::entities::classification::{ClassificationResult, ClassifierAvailability};
use crate::domain::entities::content_unit::TweetPayload;
use crate::domain::entities::filter_rule::RuleSet;
use crate::domain::services::heuristic_classifier::HeuristicClassifier;

pub struct ClassificationService {
    gateway: Arc<dyn ClassifierPort>,
    builder: BatchRequestBuilder,
    aligner: ResponseAligner,
    heuristic: HeuristicClassifier,
    fallback: FallbackPolicy,
}

impl ClassificationService {
    pub fn new(gateway: Arc<dyn ClassifierPort>, batch: BatchSettings, fallback: FallbackPolicy) -> Self {
        Self {
            gateway,
            builder: BatchRequestBuilder::new(batch),
            aligner: ResponseAligner::new(),
            heuristic: HeuristicClassifier::new(),
            fallback,
        }
    }

    pub fn fallback(&self) -> FallbackPolicy {
        self.fallback
    }

    pub fn gateway(&self) -> &Arc<dyn ClassifierPort> {
        &self.gateway
    }

    pub async fn classify(&self, units: &[TweetPayload], rules: &RuleSet) -> Vec<ClassificationResult> {
        if units.is_empty() {
            return Vec::new();
        }
        if rules.is_empty() {
            log::debug!("No filters active; skipping classification of {} post(s)", units.len());
            return units.iter().map(|_| ClassificationResult::no_filters_active()).collect();
        }

        let chunk_size = self.builder.settings().max_batch_size.max(1);
        let mut results = Vec::with_capacity(units.len());
        for chunk in units.chunks(chunk_size) {
            results.extend(self.classify_chunk(chunk, rules).await);
        }
        results
    }

    /// Legacy single-post path; same contract as a batch of one.
    pub async fn classify_one(&self, text: &str, rules: &RuleSet) -> ClassificationResult {
        let unit = TweetPayload::new(text, false);
        self.classify(std::slice::from_ref(&unit), rules)
            .await
            .into_iter()
            .next()
            .unwrap_or_else(ClassificationResult::no_filters_active)
    }

    async fn classify_chunk(&self, chunk: &[TweetPayload], rules: &RuleSet) -> Vec<ClassificationResult> {
        let Some(request) = self.builder.build(chunk, rules) else {
            return chunk.iter().map(|_| ClassificationResult::no_filters_active()).collect();
        };

        match self.gateway.call(&request).await {
            Ok(raw) => {
                log::info!(
                    "Batch {} classified {} post(s) with {}",
                    request.id,
                    request.len(),
                    raw.model
                );
                self.aligner.align(&raw, &request.items)
            }
            Err(e) if !e.is_transport() => {
                log::info!("{}; using keyword matching for {} post(s)", e, chunk.len());
                self.heuristic_results(chunk, rules)
            }
            Err(e) => {
                log::warn!("Batch {} failed: {}", request.id, e);
                match self.fallback {
                    FallbackPolicy::BatchError => {
                        let message = e.to_string();
                        chunk
                            .iter()
                            .map(|_| ClassificationResult::batch_error(&message))
                            .collect()
                    }
                    FallbackPolicy::Heuristic => self.heuristic_results(chunk, rules),
                }
            }
        }
    }

    fn heuristic_results(&self, chunk: &[TweetPayload], rules: &RuleSet) -> Vec<ClassificationResult> {
        chunk
            .iter()
            .map(|unit| self.heuristic.classify(&unit.text, rules))
            .collect()
    }
}

#[async_trait]
impl BatchClassifierPort for ClassificationService {
    async fn classify_batch(&self, units: &[TweetPayload], rules: &RuleSet) -> Vec<ClassificationResult> {
        self.classify(units, rules).await
    }

    async fn availability(&self) -> ClassifierAvailability {
        self.gateway.check_availability().await
    }
}
