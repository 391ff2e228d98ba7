// src/application/ports/output/rule_store_port.rs
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::filter_rule::RuleSet;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stored rules are not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence of the user's filter rules. Reads and writes are eventually consistent
/// key-value operations; nothing here is transactional.
#[async_trait]
pub trait RuleStorePort: Send + Sync {
    async fn get(&self) -> Result<RuleSet, StoreError>;

    async fn set(&self, rules: &RuleSet) -> Result<(), StoreError>;
}
