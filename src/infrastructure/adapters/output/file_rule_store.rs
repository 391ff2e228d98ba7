// src/infrastructure/adapters/output/file_rule_store.rs
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::application::ports::output::rule_store_port::{RuleStorePort, StoreError};
use crate::domain::entities::filter_rule::RuleSet;

/// Rule store persisted as a JSON array of strings.
///
/// A missing file reads as an empty rule set.
pub struct JsonFileRuleStore {
    path: PathBuf,
}

impl JsonFileRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RuleStorePort for JsonFileRuleStore {
    async fn get(&self) -> Result<RuleSet, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(RuleSet::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(RuleSet::new()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn set(&self, rules: &RuleSet) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(rules)?;
        tokio::fs::write(&self.path, content).await?;
        log::debug!("Stored {} filter rule(s) at {}", rules.len(), self.path.display());
        Ok(())
    }
}
