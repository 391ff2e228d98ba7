/*
Filter Pipeline Test

Drives the whole page-side pipeline against a mock chat completions server:

  HtmlTimeline -> ContentScanner -> ClassificationService -> OpenAIClassifierAdapter (mockito)
               -> ResponseAligner -> FilterOrchestrator -> OverlayBoard

Covers the happy path, a rate-limited batch, an unconfigured credential, a page with no rules and
posts arriving through the debounced run loop.
*/

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;

use timeline_guard::application::ports::input::timeline_port::PageMutation;
use timeline_guard::application::use_cases::classification_service::ClassificationService;
use timeline_guard::application::use_cases::content_scanner::ContentScanner;
use timeline_guard::application::use_cases::filter_orchestrator::{FilterOrchestrator, PageEvent};
use timeline_guard::config::{BatchSettings, ClassifierSettings, FallbackPolicy, ScannerSettings};
use timeline_guard::domain::entities::content_unit::{UnitId, UnitVisualState};
use timeline_guard::domain::entities::filter_rule::RuleSet;
use timeline_guard::infrastructure::adapters::input::html_timeline::HtmlTimeline;
use timeline_guard::infrastructure::adapters::output::memory_rule_store::InMemoryRuleStore;
use timeline_guard::infrastructure::adapters::output::openai_classifier_adapter::OpenAIClassifierAdapter;
use timeline_guard::infrastructure::adapters::output::overlay_board::OverlayBoard;

fn tweet(text: &str) -> String {
    format!(
        r#"<article data-testid="tweet"><div data-testid="tweetText" lang="en">{}</div></article>"#,
        text
    )
}

fn timeline(posts: &[&str]) -> HtmlTimeline {
    let body: String = posts.iter().map(|p| tweet(p)).collect();
    let html = format!(
        "<html><body><nav>Home</nav><main aria-label=\"Timeline\">{}</main></body></html>",
        body
    );
    HtmlTimeline::parse(&html, "main").unwrap()
}

fn completion(content: serde_json::Value) -> String {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "gpt-4o-mini-2024-07-18",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content.to_string()}, "finish_reason": "stop"}]
    })
    .to_string()
}

fn orchestrator(
    server: Option<&ServerGuard>,
    rules: &[&str],
    fallback: FallbackPolicy,
) -> FilterOrchestrator<OverlayBoard> {
    let classifier = ClassifierSettings {
        api_key: server.map(|_| "sk-test".to_string()),
        base_url: server
            .map(|s| s.url())
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
        model: "gpt-4o-mini".to_string(),
        timeout_seconds: 5,
    };
    let gateway = Arc::new(OpenAIClassifierAdapter::new(classifier).unwrap());
    let service = Arc::new(ClassificationService::new(gateway, BatchSettings::default(), fallback));
    let store = Arc::new(InMemoryRuleStore::new(RuleSet::from_texts(rules.iter().copied())));

    FilterOrchestrator::new(
        service,
        store,
        ContentScanner::from_settings(&ScannerSettings::default()).unwrap(),
        OverlayBoard::new(),
        Duration::from_millis(20),
    )
}

#[tokio::test]
async fn test_batch_verdicts_hide_matching_posts() {
    let mut server = Server::new_async().await;
    // Verdicts come back out of order; the aligner places them by tweetIndex.
    let batch = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("tweetIndex".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion(json!({
            "results": [
                {"tweetIndex": 3, "shouldFilter": false, "matchedFilter": null, "confidence": 80, "reasoning": "Cooking"},
                {"tweetIndex": 2, "shouldFilter": false, "matchedFilter": null, "confidence": 85, "reasoning": "Fitness update"},
                {"tweetIndex": 1, "shouldFilter": true, "matchedFilter": "crypto", "confidence": 150, "reasoning": "Token promotion"}
            ]
        })))
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({"max_tokens": 1})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion(json!("pong")))
        .create_async()
        .await;

    let page = timeline(&[
        "New memecoin launching, 100x guaranteed",
        "Morning run done",
        "Try this pasta recipe",
    ]);
    let mut orchestrator = orchestrator(Some(&server), &["crypto"], FallbackPolicy::BatchError);

    let report = orchestrator.start(&page).await.unwrap();

    assert_eq!(report.len(), 3);
    let first = &report.units[0];
    assert!(first.hidden);
    assert_eq!(first.result.confidence.to_string(), "100%");
    assert_eq!(first.result.matched_rule.as_deref(), Some("crypto"));
    assert_eq!(first.result.method.to_string(), "gpt-4o-mini Batch API");

    let second = &report.units[1];
    assert!(!second.hidden);
    assert_eq!(second.result.reason, "Fitness update");
    assert!(!report.units[2].hidden);

    let board = orchestrator.surface();
    assert_eq!(board.suppressed_count(), 1);
    assert_eq!(board.overlay(first.unit).unwrap().label, "Filtered: crypto");
    batch.assert_async().await;
}

#[tokio::test]
async fn test_rate_limited_batch_leaves_posts_visible() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"message":"Rate limit reached for gpt-4o-mini","type":"requests"}}"#)
        .create_async()
        .await;

    let page = timeline(&["Congress passed a new voting bill today", "Cute cat picture"]);
    let mut orchestrator = orchestrator(Some(&server), &["political content"], FallbackPolicy::BatchError);

    let report = orchestrator.start(&page).await.unwrap();

    assert_eq!(report.len(), 2);
    for outcome in &report.units {
        assert!(!outcome.hidden);
        assert_eq!(outcome.result.method.to_string(), "Batch Error");
        assert_eq!(outcome.result.confidence.to_string(), "0%");
        assert!(outcome.result.reason.contains("Rate limit reached"));
        assert_eq!(orchestrator.state(outcome.unit), Some(&UnitVisualState::Unfiltered));
    }
    assert_eq!(orchestrator.surface().suppressed_count(), 0);
}

#[tokio::test]
async fn test_rate_limited_batch_with_heuristic_fallback() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body(r#"{"error":{"message":"Rate limit reached"}}"#)
        .create_async()
        .await;

    let page = timeline(&["Congress passed a new voting bill today", "Cute cat picture"]);
    let mut orchestrator = orchestrator(Some(&server), &["political content"], FallbackPolicy::Heuristic);

    let report = orchestrator.start(&page).await.unwrap();

    assert!(report.units[0].hidden);
    assert_eq!(report.units[0].result.method.to_string(), "Keywords");
    assert_eq!(report.units[0].result.confidence.to_string(), "50%");
    assert!(!report.units[1].hidden);
}

#[tokio::test]
async fn test_unconfigured_classifier_uses_keywords() {
    let page = timeline(&["Bitcoin just broke another record", "Weekend hiking photos"]);
    let mut orchestrator = orchestrator(None, &["crypto"], FallbackPolicy::BatchError);

    let report = orchestrator.start(&page).await.unwrap();

    assert!(report.units[0].hidden);
    assert_eq!(report.units[0].result.method.to_string(), "Keywords");
    assert!(!report.units[1].hidden);
}

#[tokio::test]
async fn test_no_rules_never_reaches_the_classifier() {
    let mut server = Server::new_async().await;
    let batch = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("tweetIndex".to_string()))
        .expect(0)
        .create_async()
        .await;

    let page = timeline(&["anything", "at all"]);
    let mut orchestrator = orchestrator(Some(&server), &[], FallbackPolicy::BatchError);

    let report = orchestrator.start(&page).await.unwrap();

    assert_eq!(report.len(), 2);
    assert!(report
        .units
        .iter()
        .all(|u| u.result.method.to_string() == "No Filters Active"));
    batch.assert_async().await;
}

#[tokio::test]
async fn test_unparseable_reply_is_a_parse_error_per_post() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("tweetIndex".to_string()))
        .with_status(200)
        .with_body(
            json!({"choices": [{"message": {"role": "assistant", "content": "Sorry, I cannot help with that."}}]})
                .to_string(),
        )
        .create_async()
        .await;

    let page = timeline(&["one", "two", "three"]);
    let mut orchestrator = orchestrator(Some(&server), &["sports"], FallbackPolicy::BatchError);

    let report = orchestrator.start(&page).await.unwrap();

    assert_eq!(report.len(), 3);
    for outcome in &report.units {
        assert!(!outcome.result.should_filter);
        assert!(outcome.result.method.to_string().contains("Parse Error"));
    }
}

#[tokio::test]
async fn test_new_posts_are_classified_once_through_the_run_loop() {
    let page_posts = ["Bitcoin halving is coming"];
    let mut page = timeline(&page_posts);
    let mut orchestrator = orchestrator(None, &["crypto"], FallbackPolicy::BatchError);
    let first = orchestrator.start(&page).await.unwrap();
    assert_eq!(first.len(), 1);

    let (events, inbox) = mpsc::channel(8);
    events
        .send(PageEvent::Mutation(PageMutation::Append(tweet("ETH gas fees are wild"))))
        .await
        .unwrap();
    events
        .send(PageEvent::Mutation(PageMutation::Prepend(tweet("Sunset at the beach"))))
        .await
        .unwrap();
    events.send(PageEvent::Reveal(UnitId::new(1))).await.unwrap();
    drop(events);

    let summary = orchestrator.run(&mut page, inbox).await;

    assert_eq!(summary.rounds, 1);
    assert_eq!(summary.classified, 2);
    assert_eq!(summary.hidden, 1);
    assert_eq!(summary.revealed, 1);
    assert_eq!(orchestrator.state(UnitId::new(1)), Some(&UnitVisualState::Revealed));
    assert_eq!(orchestrator.surface().suppressed_count(), 1);
}
