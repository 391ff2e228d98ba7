/*
Messaging Test

Background service backed by the JSON file rule store and a mock classifier endpoint, driven
through the message client the page side uses. The last test keeps a page open on the other end of
the channel and follows a rule update into its next filter round.
*/

use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::Duration;

use timeline_guard::application::messaging::{self, BackgroundService, MessageClient, Request, Response};
use timeline_guard::application::ports::input::batch_classifier_port::BatchClassifierPort;
use timeline_guard::application::ports::input::timeline_port::PageMutation;
use timeline_guard::application::ports::output::rule_store_port::RuleStorePort;
use timeline_guard::application::use_cases::classification_service::ClassificationService;
use timeline_guard::application::use_cases::content_scanner::ContentScanner;
use timeline_guard::application::use_cases::filter_orchestrator::{FilterOrchestrator, PageEvent};
use timeline_guard::config::{BatchSettings, ClassifierSettings, FallbackPolicy, ScannerSettings};
use timeline_guard::domain::entities::content_unit::TweetPayload;
use timeline_guard::domain::entities::filter_rule::RuleSet;
use timeline_guard::infrastructure::adapters::input::html_timeline::HtmlTimeline;
use timeline_guard::infrastructure::adapters::output::file_rule_store::JsonFileRuleStore;
use timeline_guard::infrastructure::adapters::output::openai_classifier_adapter::OpenAIClassifierAdapter;
use timeline_guard::infrastructure::adapters::output::overlay_board::OverlayBoard;

struct Harness {
    client: MessageClient,
    store: Arc<JsonFileRuleStore>,
    updates: tokio::sync::broadcast::Receiver<RuleSet>,
    _dir: TempDir,
}

fn start(base_url: String, max_batch_size: usize) -> Harness {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileRuleStore::new(dir.path().join("filters.json")));

    let gateway = OpenAIClassifierAdapter::new(ClassifierSettings {
        api_key: Some("sk-test".to_string()),
        base_url,
        model: "gpt-4o-mini".to_string(),
        timeout_seconds: 5,
    })
    .unwrap();
    let batch = BatchSettings {
        max_batch_size,
        ..BatchSettings::default()
    };
    let service = Arc::new(ClassificationService::new(Arc::new(gateway), batch, FallbackPolicy::BatchError));

    let background = BackgroundService::new(service, store.clone());
    let updates = background.subscribe();
    let (client, inbox) = messaging::channel(8);
    tokio::spawn(async move { background.serve(inbox).await });

    Harness {
        client,
        store,
        updates,
        _dir: dir,
    }
}

fn completion(results: serde_json::Value) -> String {
    json!({
        "model": "gpt-4o-mini-2024-07-18",
        "choices": [{"message": {"role": "assistant", "content": json!({"results": results}).to_string()}}]
    })
    .to_string()
}

#[tokio::test]
async fn test_update_filters_is_persisted_and_broadcast() {
    let server = Server::new_async().await;
    let mut harness = start(server.url(), 20);

    let request: Request = serde_json::from_value(json!({
        "action": "updateFilters",
        "filters": ["crypto", " political content ", "crypto"]
    }))
    .unwrap();
    let response = harness.client.request(request).await.unwrap();

    assert_eq!(serde_json::to_value(&response).unwrap(), json!({"success": true}));
    assert_eq!(
        harness.updates.recv().await.unwrap().texts(),
        vec!["crypto", "political content"]
    );
    assert_eq!(
        harness.store.get().await.unwrap().texts(),
        vec!["crypto", "political content"]
    );
    let on_disk = std::fs::read_to_string(harness.store.path()).unwrap();
    assert!(on_disk.contains("political content"));
}

#[tokio::test]
async fn test_filter_batch_is_split_into_bounded_calls() {
    let mut server = Server::new_async().await;
    let calls = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("tweetIndex".to_string()))
        .with_status(200)
        .with_body(completion(json!([
            {"tweetIndex": 1, "shouldFilter": true, "matchedFilter": "sports", "confidence": 92, "reasoning": "Match report"},
            {"tweetIndex": 2, "shouldFilter": false, "confidence": 75, "reasoning": "Unrelated"}
        ])))
        .expect(2)
        .create_async()
        .await;

    let harness = start(server.url(), 2);
    harness.store.set(&RuleSet::from_texts(["sports"])).await.unwrap();

    let tweets = vec![
        TweetPayload::new("What a goal in the final minute", false),
        TweetPayload::new("Lovely weather", false),
        TweetPayload::new("Playoffs start tonight", true),
        TweetPayload::new("Reading a book", false),
    ];
    let response = harness
        .client
        .request(Request::FilterBatch { tweets, filters: None })
        .await
        .unwrap();

    let Response::Batch { results } = response else {
        panic!("expected batch response, got {:?}", response);
    };
    assert_eq!(results.len(), 4);
    assert_eq!(
        results.iter().map(|r| r.should_filter).collect::<Vec<_>>(),
        vec![true, false, true, false]
    );
    assert_eq!(results[0].confidence.to_string(), "92%");
    calls.assert_async().await;
}

#[tokio::test]
async fn test_filter_content_and_status() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body(r#"{"error":{"message":"The server had an error"}}"#)
        .create_async()
        .await;

    let harness = start(server.url(), 20);

    let request: Request = serde_json::from_value(json!({
        "action": "filterContent",
        "text": "Congress passed a new voting bill today",
        "filters": ["political content"]
    }))
    .unwrap();
    let Response::Single(result) = harness.client.request(request).await.unwrap() else {
        panic!("expected single result");
    };
    assert!(!result.should_filter);
    assert_eq!(result.method.to_string(), "Batch Error");

    let status = harness.client.request(Request::GetAiStatus).await.unwrap();
    assert_eq!(
        serde_json::to_value(&status).unwrap(),
        json!({"configured": true, "model": "gpt-4o-mini", "fallback": "batch_error", "activeFilters": 0})
    );

    let availability = harness.client.availability().await;
    assert!(!availability.available);
    assert_eq!(availability.error.as_deref(), Some("HTTP 500: The server had an error"));
}

fn tweet(text: &str) -> String {
    format!(
        r#"<article data-testid="tweet"><div data-testid="tweetText">{}</div></article>"#,
        text
    )
}

#[tokio::test]
async fn test_rule_update_reaches_an_open_page() {
    let mut server = Server::new_async().await;
    let batch = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("crypto".to_string()))
        .with_status(200)
        .with_body(completion(json!([
            {"tweetIndex": 1, "shouldFilter": true, "matchedFilter": "crypto", "confidence": 88, "reasoning": "Token giveaway"}
        ])))
        .expect(1)
        .create_async()
        .await;

    let Harness {
        client,
        store,
        updates,
        _dir,
    } = start(server.url(), 20);

    let html = format!("<main>{}</main>", tweet("Quarterly earnings beat estimates"));
    let mut page = HtmlTimeline::parse(&html, "main").unwrap();
    let mut orchestrator = FilterOrchestrator::new(
        Arc::new(client.clone()),
        store.clone(),
        ContentScanner::from_settings(&ScannerSettings::default()).unwrap(),
        OverlayBoard::new(),
        Duration::from_millis(10),
    );
    let initial = orchestrator.start(&page).await.unwrap();
    assert_eq!(initial.units[0].result.method.to_string(), "No Filters Active");

    let request: Request =
        serde_json::from_value(json!({"action": "updateFilters", "filters": ["crypto"]})).unwrap();
    assert_eq!(client.request(request).await.unwrap(), Response::Updated { success: true });

    let (events, inbox) = mpsc::channel(4);
    events
        .send(PageEvent::Mutation(PageMutation::Append(tweet("Free token airdrop for the first 100 wallets"))))
        .await
        .unwrap();
    drop(events);

    let summary = orchestrator
        .run_with_rule_updates(&mut page, inbox, Some(updates))
        .await;

    assert_eq!(orchestrator.rules().texts(), vec!["crypto"]);
    assert_eq!(summary.classified, 1);
    assert_eq!(summary.hidden, 1);
    let board = orchestrator.surface();
    assert_eq!(board.suppressed_count(), 1);
    assert_eq!(
        board.overlays().next().map(|overlay| overlay.label.as_str()),
        Some("Filtered: crypto")
    );
    batch.assert_async().await;
}
