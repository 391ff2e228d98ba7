// src/error.rs
use thiserror::Error;

use crate::application::messaging::MessagingError;
use crate::application::ports::input::timeline_port::TimelineError;
use crate::application::ports::output::rule_store_port::StoreError;
use crate::application::use_cases::content_scanner::ScanError;
use crate::application::use_cases::filter_orchestrator::OrchestratorError;
use crate::config::SettingsError;

/// Everything the binary can fail with.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid filter rule: {0:?}")]
    InvalidRule(String),
}
