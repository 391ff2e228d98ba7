use serde::Serialize;
use std::collections::BTreeMap;

use crate::application::ports::output::suppression_port::SuppressionSurface;
use crate::domain::entities::classification::ClassificationResult;
use crate::domain::entities::content_unit::UnitId;

/// What the user sees over a hidden post.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    pub unit: UnitId,
    pub label: String,
    pub reason: String,
    pub confidence: String,
    pub method: String,
    pub visible: bool,
}

impl Overlay {
    fn from_result(unit: UnitId, result: &ClassificationResult) -> Self {
        let label = match &result.matched_rule {
            Some(rule) => format!("Filtered: {}", rule),
            None => "Filtered".to_string(),
        };
        Self {
            unit,
            label,
            reason: result.reason.clone(),
            confidence: result.confidence.to_string(),
            method: result.method.to_string(),
            visible: true,
        }
    }
}

/// In-memory rendering surface. Overlays are kept after a reveal, just hidden.
#[derive(Debug, Default, Serialize)]
pub struct OverlayBoard {
    overlays: BTreeMap<UnitId, Overlay>,
}

impl OverlayBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_suppressed(&self, unit: UnitId) -> bool {
        self.overlays.get(&unit).map(|o| o.visible).unwrap_or(false)
    }

    pub fn overlay(&self, unit: UnitId) -> Option<&Overlay> {
        self.overlays.get(&unit)
    }

    pub fn overlays(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays.values()
    }

    pub fn suppressed_count(&self) -> usize {
        self.overlays.values().filter(|o| o.visible).count()
    }
}

impl SuppressionSurface for OverlayBoard {
    fn suppress(&mut self, unit: UnitId, result: &ClassificationResult) {
        log::info!("Hiding {} ({})", unit, result.reason);
        self.overlays.insert(unit, Overlay::from_result(unit, result));
    }

    fn unsuppress(&mut self, unit: UnitId) {
        if let Some(overlay) = self.overlays.get_mut(&unit) {
            log::info!("Revealing {}", unit);
            overlay.visible = false;
        }
    }
}
