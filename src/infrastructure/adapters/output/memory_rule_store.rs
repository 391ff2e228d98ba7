/*

In-memory Rule Store

Keeps the rule set in process memory. Nothing survives a restart; used by tests and by callers
that only need rules for a single run.

*/
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::ports::output::rule_store_port::{RuleStorePort, StoreError};
use crate::domain::entities::filter_rule::RuleSet;

#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    rules: RwLock<RuleSet>,
}

impl InMemoryRuleStore {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }
}

#[async_trait]
impl RuleStorePort for InMemoryRuleStore {
    async fn get(&self) -> Result<RuleSet, StoreError> {
        Ok(self.rules.read().await.clone())
    }

    async fn set(&self, rules: &RuleSet) -> Result<(), StoreError> {
        *self.rules.write().await = rules.clone();
        Ok(())
    }
}
