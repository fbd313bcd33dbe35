//! Sequence model port traits.

use crate::domain::error::TickerdeskError;
use std::sync::Arc;

/// A trained sequence-to-one model over a window of normalized values.
pub trait SequenceModel: Send + Sync {
    /// Number of trailing samples the model expects per prediction.
    fn window_len(&self) -> usize;

    /// Predict the next normalized value from exactly `window_len()` inputs.
    fn predict(&self, window: &[f64]) -> Result<f64, TickerdeskError>;
}

/// Produces a model on demand, typically by reading an artifact from disk.
pub trait ModelLoader: Send + Sync {
    /// Human-readable source, used in log lines.
    fn describe(&self) -> String;

    fn load(&self) -> Result<Arc<dyn SequenceModel>, TickerdeskError>;
}
