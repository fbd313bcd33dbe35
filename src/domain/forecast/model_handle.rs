//! Lazily loaded, shareable model slot.

use crate::domain::error::TickerdeskError;
use crate::ports::model_port::{ModelLoader, SequenceModel};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// Loads a model on first use and hands out shared references to it.
///
/// Loading happens under the slot lock, so concurrent first callers trigger
/// a single load. Failures are not cached: the next call tries again.
pub struct ModelHandle {
    loader: Box<dyn ModelLoader>,
    slot: Mutex<Option<Arc<dyn SequenceModel>>>,
}

impl ModelHandle {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            slot: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<dyn SequenceModel>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The loaded model, loading it now if needed.
    pub fn try_get(&self) -> Result<Arc<dyn SequenceModel>, TickerdeskError> {
        let mut slot = self.lock();
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }
        let model = self.loader.load()?;
        info!(
            source = %self.loader.describe(),
            window = model.window_len(),
            "model loaded"
        );
        *slot = Some(Arc::clone(&model));
        Ok(model)
    }

    /// Like [`try_get`](Self::try_get) but logs a failure and returns `None`.
    pub fn get(&self) -> Option<Arc<dyn SequenceModel>> {
        match self.try_get() {
            Ok(model) => Some(model),
            Err(e) => {
                warn!(source = %self.loader.describe(), error = %e, "model unavailable");
                None
            }
        }
    }

    /// Drop the cached model so the next call reloads it.
    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().is_some()
    }

    pub fn describe(&self) -> String {
        self.loader.describe()
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("source", &self.loader.describe())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
