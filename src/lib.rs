// src/lib.rs
pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::messaging::{BackgroundService, MessageClient, Request, Response};
pub use application::use_cases::classification_service::ClassificationService;
pub use application::use_cases::filter_orchestrator::{FilterOrchestrator, PageEvent};
pub use config::Settings;
pub use error::AppError;
