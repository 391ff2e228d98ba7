use scraper::ElementRef;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimelineError {
    #[error("Invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("Content root is no longer part of the document")]
    RootNotFound,
}

/// A change observed under the content root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageMutation {
    /// New markup added after the existing posts (infinite scroll).
    Append(String),
    /// New markup added before the existing posts (fresh posts at the top).
    Prepend(String),
}

/// The live page the scanner walks. Node identity must stay stable across mutations so
/// that already-seen posts are recognised on later scans.
pub trait TimelinePort {
    fn content_root(&self) -> ElementRef<'_>;

    fn apply_mutation(&mut self, mutation: &PageMutation) -> Result<(), TimelineError>;
}
