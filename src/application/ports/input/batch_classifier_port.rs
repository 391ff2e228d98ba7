use async_trait::async_trait;

use crate::domain::entities::classification::{ClassificationResult, ClassifierAvailability};
use crate::domain::entities::content_unit::TweetPayload;
use crate::domain::entities::filter_rule::RuleSet;

/// Entry point the filter orchestrator uses to get verdicts for scanned posts.
///
/// Implementations must return exactly one result per unit, in the order given, even when the
/// classifier fails entirely.
#[async_trait]
pub trait BatchClassifierPort: Send + Sync {
    async fn classify_batch(&self, units: &[TweetPayload], rules: &RuleSet) -> Vec<ClassificationResult>;

    async fn availability(&self) -> ClassifierAvailability;
}
