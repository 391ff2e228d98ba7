use crate::domain::entities::classification::ClassificationResult;
use crate::domain::entities::content_unit::UnitId;

/// Rendering surface that hides posts behind an overlay with a reveal affordance.
///
/// The orchestrator owns the visual state machine and only calls `suppress` for units that are
/// not already filtered, and `unsuppress` for units the user chose to reveal.
pub trait SuppressionSurface {
    fn suppress(&mut self, unit: UnitId, result: &ClassificationResult);

    fn unsuppress(&mut self, unit: UnitId);
}
