pub mod batch_request_builder;
pub mod classification_service;
pub mod content_scanner;
pub mod filter_orchestrator;
pub mod response_aligner;
