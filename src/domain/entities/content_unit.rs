use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a scanned block of timeline content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(u64);

impl UnitId {
    pub fn new(value: u64) -> Self {
        UnitId(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit-{}", self.0)
    }
}

/// One post found on the page, ready to be classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUnit {
    pub id: UnitId,
    pub text: String,
    pub has_images: bool,
}

impl ContentUnit {
    pub fn new(id: UnitId, text: String, has_images: bool) -> Self {
        Self { id, text, has_images }
    }
}

/// Wire form of a unit in `filterBatch` requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetPayload {
    pub text: String,
    #[serde(default)]
    pub has_images: bool,
}

impl TweetPayload {
    pub fn new(text: impl Into<String>, has_images: bool) -> Self {
        Self {
            text: text.into(),
            has_images,
        }
    }
}

impl From<&ContentUnit> for TweetPayload {
    fn from(unit: &ContentUnit) -> Self {
        TweetPayload {
            text: unit.text.clone(),
            has_images: unit.has_images,
        }
    }
}

/// Visual state of a unit that has been seen. An unseen unit has no state at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum UnitVisualState {
    Unfiltered,
    Filtered {
        matched_rule: Option<String>,
        reason: String,
    },
    Revealed,
}

impl UnitVisualState {
    pub fn is_filtered(&self) -> bool {
        matches!(self, UnitVisualState::Filtered { .. })
    }
}
