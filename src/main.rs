// src/main.rs
use clap::Parser;
use env_logger::Env;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::Duration;

use timeline_guard::application::messaging::{self, BackgroundService, Request};
use timeline_guard::application::ports::input::batch_classifier_port::BatchClassifierPort;
use timeline_guard::application::ports::input::timeline_port::PageMutation;
use timeline_guard::application::ports::output::rule_store_port::RuleStorePort;
use timeline_guard::application::use_cases::classification_service::ClassificationService;
use timeline_guard::application::use_cases::content_scanner::ContentScanner;
use timeline_guard::application::use_cases::filter_orchestrator::{FilterOrchestrator, PageEvent};
use timeline_guard::cli::{ClassifyArgs, Cli, Command, RuleCommands, ScanArgs, ServeArgs};
use timeline_guard::config::Settings;
use timeline_guard::domain::entities::filter_rule::RuleSet;
use timeline_guard::error::AppError;
use timeline_guard::infrastructure::adapters::input::html_timeline::HtmlTimeline;
use timeline_guard::infrastructure::adapters::output::file_rule_store::JsonFileRuleStore;
use timeline_guard::infrastructure::adapters::output::memory_rule_store::InMemoryRuleStore;
use timeline_guard::infrastructure::adapters::output::openai_classifier_adapter::OpenAIClassifierAdapter;
use timeline_guard::infrastructure::adapters::output::overlay_board::OverlayBoard;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let settings = Settings::load(&cli.config)?;
    log::debug!("Loaded configuration from {}", cli.config.display());

    let rule_file = JsonFileRuleStore::new(settings.rules_path.clone());
    log::debug!("Filter rules stored in {}", rule_file.path().display());
    let store: Arc<dyn RuleStorePort> = Arc::new(rule_file);
    let gateway = Arc::new(OpenAIClassifierAdapter::new(settings.classifier.clone())?);
    let service = Arc::new(ClassificationService::new(
        gateway,
        settings.batch.clone(),
        settings.fallback,
    ));

    match cli.command {
        Command::Scan(args) => scan(&settings, service, store, args).await,
        Command::Status => print_json(&service.availability().await),
        Command::Rules(command) => rules(store, command).await,
        Command::Classify(args) => classify(service, store, args).await,
        Command::Serve(args) => serve(&settings, service, store, args).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Rules given on the command line win over the stored ones.
async fn effective_rules(store: &Arc<dyn RuleStorePort>, overrides: &[String]) -> Result<RuleSet, AppError> {
    if overrides.is_empty() {
        Ok(store.get().await?)
    } else {
        Ok(RuleSet::from_texts(overrides))
    }
}

async fn scan(
    settings: &Settings,
    service: Arc<ClassificationService>,
    store: Arc<dyn RuleStorePort>,
    args: ScanArgs,
) -> Result<(), AppError> {
    let rules = effective_rules(&store, &args.rules).await?;
    let html = tokio::fs::read_to_string(&args.page).await?;
    let mut page = HtmlTimeline::parse(&html, &settings.scanner.root_selector)?;
    let scanner = ContentScanner::from_settings(&settings.scanner)?;

    let mut orchestrator = FilterOrchestrator::new(
        service,
        Arc::new(InMemoryRuleStore::new(rules)),
        scanner,
        OverlayBoard::new(),
        Duration::from_millis(settings.scanner.debounce_ms),
    );

    let initial = orchestrator.start(&page).await?;

    let mut follow_up = None;
    if !args.append.is_empty() {
        let (events, inbox) = mpsc::channel(args.append.len());
        for fragment in &args.append {
            let html = tokio::fs::read_to_string(fragment).await?;
            if events.send(PageEvent::Mutation(PageMutation::Append(html))).await.is_err() {
                break;
            }
        }
        drop(events);
        let summary = orchestrator.run(&mut page, inbox).await;
        log::info!(
            "Appended {} fragment(s): {} round(s), {} post(s) hidden",
            args.append.len(),
            summary.rounds,
            summary.hidden
        );
        follow_up = Some(summary);
    }

    let board = orchestrator.into_surface();
    print_json(&json!({
        "initial": initial,
        "appended": follow_up,
        "overlays": board.overlays().collect::<Vec<_>>(),
    }))
}

async fn rules(store: Arc<dyn RuleStorePort>, command: RuleCommands) -> Result<(), AppError> {
    let mut rules = store.get().await?;
    match command {
        RuleCommands::List => {}
        RuleCommands::Add(args) => {
            if !rules.insert(&args.rule) {
                log::warn!("Rule {:?} already present or empty", args.rule.trim());
            }
            store.set(&rules).await?;
        }
        RuleCommands::Remove(args) => {
            if !rules.remove(&args.rule) {
                return Err(AppError::InvalidRule(args.rule));
            }
            store.set(&rules).await?;
        }
    }
    print_json(&rules)
}

async fn classify(
    service: Arc<ClassificationService>,
    store: Arc<dyn RuleStorePort>,
    args: ClassifyArgs,
) -> Result<(), AppError> {
    let rules = effective_rules(&store, &args.rules).await?;
    print_json(&service.classify_one(&args.text, &rules).await)
}

async fn serve(
    settings: &Settings,
    service: Arc<ClassificationService>,
    store: Arc<dyn RuleStorePort>,
    args: ServeArgs,
) -> Result<(), AppError> {
    let background = BackgroundService::new(service, store.clone());
    let (client, inbox) = messaging::channel(32);

    // The watched page classifies through the same channel and follows rule updates until stdin closes.
    let (page_events, page_inbox) = mpsc::channel::<PageEvent>(1);
    let watched = match &args.page {
        Some(path) => {
            let html = tokio::fs::read_to_string(path).await?;
            let page = HtmlTimeline::parse(&html, &settings.scanner.root_selector)?;
            let orchestrator = FilterOrchestrator::new(
                Arc::new(client.clone()),
                store,
                ContentScanner::from_settings(&settings.scanner)?,
                OverlayBoard::new(),
                Duration::from_millis(settings.scanner.debounce_ms),
            );
            Some((page, orchestrator, background.subscribe()))
        }
        None => None,
    };

    let page_side = async move {
        let Some((mut page, mut orchestrator, updates)) = watched else {
            return Ok(None);
        };
        let initial = orchestrator.start(&page).await?;
        log::info!("Watching page: {} post(s) hidden", initial.hidden());
        let summary = orchestrator
            .run_with_rule_updates(&mut page, page_inbox, Some(updates))
            .await;
        Ok::<_, AppError>(Some((summary, orchestrator.into_surface())))
    };

    let requests = async move {
        let _page_events = page_events;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let reply = match serde_json::from_str::<Request>(&line) {
                Ok(request) => serde_json::to_string(&client.request(request).await?)?,
                Err(e) => json!({ "error": format!("Invalid request: {}", e) }).to_string(),
            };
            println!("{}", reply);
        }
        Ok::<(), AppError>(())
    };

    let (result, (), watched) = tokio::join!(requests, background.serve(inbox), page_side);
    result?;
    if let Some((summary, board)) = watched? {
        println!(
            "{}",
            json!({
                "page": summary,
                "overlays": board.overlays().collect::<Vec<_>>(),
            })
        );
    }
    Ok(())
}
