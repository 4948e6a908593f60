//! Optional price predictor port trait.

use crate::domain::error::CoinstratError;
use crate::domain::indicator::IndicatorSnapshot;

/// Advisory price forecast. Failures are surfaced as informational notes by
/// the engine, never as fatal errors; correctness must not depend on this.
pub trait PricePredictorPort: Send + Sync {
    fn predict_price(&self, snapshot: &IndicatorSnapshot) -> Result<f64, CoinstratError>;
}
