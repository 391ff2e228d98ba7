/*
Filter Orchestrator

Owns the per-page state: the active rules, the scanner with its seen registry, and the visual
state of every post that has been looked at. A round is scan -> classify -> apply; rounds never
overlap because the run loop awaits each one before taking the next event.

Visual state per post:

  (unseen) -> Unfiltered -> Filtered -> Revealed

Filtered is entered only from Unfiltered, and Revealed only by an explicit user action. A revealed
post is never hidden again.
*/

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};

use crate::application::ports::input::batch_classifier_port::BatchClassifierPort;
use crate::application::ports::input::timeline_port::{PageMutation, TimelinePort};
use crate::application::ports::output::rule_store_port::{RuleStorePort, StoreError};
use crate::application::ports::output::suppression_port::SuppressionSurface;
use crate::application::use_cases::content_scanner::ContentScanner;
use crate::domain::entities::classification::ClassificationResult;
use crate::domain::entities::content_unit::{TweetPayload, UnitId, UnitVisualState};
use crate::domain::entities::filter_rule::RuleSet;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Failed to load filter rules: {0}")]
    Store(#[from] StoreError),
}

/// Events delivered to the run loop.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    Mutation(PageMutation),
    RulesUpdated(RuleSet),
    Reveal(UnitId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitOutcome {
    pub unit: UnitId,
    pub text: String,
    pub hidden: bool,
    pub result: ClassificationResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoundReport {
    pub units: Vec<UnitOutcome>,
}

impl RoundReport {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn hidden(&self) -> usize {
        self.units.iter().filter(|u| u.hidden).count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub rounds: usize,
    pub classified: usize,
    pub hidden: usize,
    pub revealed: usize,
}

/// What woke the run loop.
enum Wake {
    Event(PageEvent),
    RulesClosed,
    Deadline,
    Closed,
}

/// Next rule set broadcast by the background side; `None` once it has gone away.
async fn next_rules(updates: &mut Option<broadcast::Receiver<RuleSet>>) -> Option<RuleSet> {
    let receiver = updates.as_mut()?;
    loop {
        match receiver.recv().await {
            Ok(rules) => return Some(rules),
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("Skipped {} stale rule update(s)", skipped);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

impl RunSummary {
    fn record(&mut self, report: &RoundReport) {
        self.rounds += 1;
        self.classified += report.len();
        self.hidden += report.hidden();
    }
}

pub struct FilterOrchestrator<S: SuppressionSurface> {
    classifier: Arc<dyn BatchClassifierPort>,
    rule_store: Arc<dyn RuleStorePort>,
    scanner: ContentScanner,
    surface: S,
    rules: RuleSet,
    states: HashMap<UnitId, UnitVisualState>,
    debounce: Duration,
}

impl<S: SuppressionSurface> FilterOrchestrator<S> {
    pub fn new(
        classifier: Arc<dyn BatchClassifierPort>,
        rule_store: Arc<dyn RuleStorePort>,
        scanner: ContentScanner,
        surface: S,
        debounce: Duration,
    ) -> Self {
        Self {
            classifier,
            rule_store,
            scanner,
            surface,
            rules: RuleSet::new(),
            states: HashMap::new(),
            debounce,
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn state(&self, unit: UnitId) -> Option<&UnitVisualState> {
        self.states.get(&unit)
    }

    /// Availability probe (logged only), rule load, then the first round.
    pub async fn start<T: TimelinePort + ?Sized>(&mut self, page: &T) -> Result<RoundReport, OrchestratorError> {
        let availability = self.classifier.availability().await;
        if availability.available {
            log::info!(
                "Classifier available ({})",
                availability.model.as_deref().unwrap_or("unknown model")
            );
        } else {
            log::warn!(
                "Classifier unavailable: {}",
                availability.error.as_deref().unwrap_or("unknown error")
            );
        }

        self.rules = self.rule_store.get().await?;
        log::info!("Loaded {} filter rule(s)", self.rules.len());

        Ok(self.run_round(page).await)
    }

    pub async fn run_round<T: TimelinePort + ?Sized>(&mut self, page: &T) -> RoundReport {
        let units = self.scanner.scan(page.content_root());
        if units.is_empty() {
            return RoundReport::default();
        }
        log::info!("Classifying {} new post(s)", units.len());

        for unit in &units {
            self.states.entry(unit.id).or_insert(UnitVisualState::Unfiltered);
        }

        let payloads: Vec<TweetPayload> = units.iter().map(TweetPayload::from).collect();
        let results = self.classifier.classify_batch(&payloads, &self.rules).await;
        if results.len() != units.len() {
            log::warn!(
                "Classifier returned {} result(s) for {} post(s)",
                results.len(),
                units.len()
            );
        }

        // Every scanned post gets an outcome; missing slots count as a failed batch.
        let mut results = results.into_iter();
        let mut report = RoundReport::default();
        for unit in units {
            let result = results
                .next()
                .unwrap_or_else(|| ClassificationResult::batch_error("No result returned for post"));
            self.apply(unit.id, &result);
            report.units.push(UnitOutcome {
                unit: unit.id,
                text: unit.text,
                hidden: self.states.get(&unit.id).is_some_and(UnitVisualState::is_filtered),
                result,
            });
        }
        report
    }

    /// Hides a seen, unfiltered unit if the result asks for it. Returns whether anything changed;
    /// applying the same result twice, or to a revealed unit, does nothing.
    pub fn apply(&mut self, unit: UnitId, result: &ClassificationResult) -> bool {
        if !result.should_filter {
            return false;
        }
        match self.states.get(&unit) {
            Some(UnitVisualState::Unfiltered) => {
                self.states.insert(
                    unit,
                    UnitVisualState::Filtered {
                        matched_rule: result.matched_rule.clone(),
                        reason: result.reason.clone(),
                    },
                );
                self.surface.suppress(unit, result);
                true
            }
            _ => false,
        }
    }

    /// User chose to see a hidden post.
    pub fn reveal(&mut self, unit: UnitId) -> bool {
        match self.states.get(&unit) {
            Some(UnitVisualState::Filtered { .. }) => {
                self.states.insert(unit, UnitVisualState::Revealed);
                self.surface.unsuppress(unit);
                true
            }
            _ => false,
        }
    }

    /// Already-classified posts keep their state; the new rules apply to posts found from now on.
    pub fn update_rules(&mut self, rules: RuleSet) {
        log::info!("Filter rules updated ({} rule(s))", rules.len());
        self.rules = rules;
    }

    /// Processes events until the sender side closes.
    ///
    /// Mutations are coalesced: the first one arms a deadline `debounce` in the future and further
    /// mutations before it fires join the same round. A rules update runs a round immediately and
    /// absorbs any pending one.
    pub async fn run<T: TimelinePort + ?Sized>(
        &mut self,
        page: &mut T,
        events: mpsc::Receiver<PageEvent>,
    ) -> RunSummary {
        self.run_with_rule_updates(page, events, None).await
    }

    /// Same as [`run`](Self::run), also listening for rule sets broadcast by the background
    /// service. Each broadcast is handled as a `RulesUpdated` event. The loop still ends when
    /// `events` closes; a closed broadcast only stops the listening.
    pub async fn run_with_rule_updates<T: TimelinePort + ?Sized>(
        &mut self,
        page: &mut T,
        mut events: mpsc::Receiver<PageEvent>,
        mut updates: Option<broadcast::Receiver<RuleSet>>,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut pending: Option<Instant> = None;

        loop {
            let deadline = pending.unwrap_or_else(Instant::now);
            let wake = tokio::select! {
                biased;
                rules = next_rules(&mut updates), if updates.is_some() => match rules {
                    Some(rules) => Wake::Event(PageEvent::RulesUpdated(rules)),
                    None => Wake::RulesClosed,
                },
                event = events.recv() => match event {
                    Some(event) => Wake::Event(event),
                    None => Wake::Closed,
                },
                _ = sleep_until(deadline), if pending.is_some() => Wake::Deadline,
            };

            let event = match wake {
                Wake::Event(event) => event,
                Wake::RulesClosed => {
                    log::debug!("Rule update broadcast closed");
                    updates = None;
                    continue;
                }
                Wake::Deadline => {
                    pending = None;
                    let report = self.run_round(&*page).await;
                    summary.record(&report);
                    continue;
                }
                Wake::Closed => break,
            };

            match event {
                PageEvent::Mutation(mutation) => {
                    if let Err(e) = page.apply_mutation(&mutation) {
                        log::warn!("Ignoring page mutation: {}", e);
                        continue;
                    }
                    if pending.is_none() {
                        pending = Some(Instant::now() + self.debounce);
                    }
                }
                PageEvent::RulesUpdated(rules) => {
                    self.update_rules(rules);
                    pending = None;
                    let report = self.run_round(&*page).await;
                    summary.record(&report);
                }
                PageEvent::Reveal(unit) => {
                    if self.reveal(unit) {
                        summary.revealed += 1;
                    }
                }
            }
        }

        if pending.is_some() {
            let report = self.run_round(&*page).await;
            summary.record(&report);
        }
        log::debug!("Run loop finished after {} round(s)", summary.rounds);
        summary
    }
}
