//! Loads an exported LSTM network from a JSON artifact on disk.

use crate::domain::error::TickerdeskError;
use crate::domain::forecast::lstm::LstmNetwork;
use crate::ports::model_port::{ModelLoader, SequenceModel};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct JsonModelLoader {
    path: PathBuf,
}

impl JsonModelLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_error(&self, reason: impl std::fmt::Display) -> TickerdeskError {
        TickerdeskError::ModelLoad {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Parse and validate without wrapping in a trait object.
    pub fn load_network(&self) -> Result<LstmNetwork, TickerdeskError> {
        let content = fs::read_to_string(&self.path).map_err(|e| self.load_error(e))?;
        let network: LstmNetwork =
            serde_json::from_str(&content).map_err(|e| self.load_error(e))?;
        network.validate()?;
        debug!(
            path = %self.path.display(),
            layers = network.lstm.len(),
            dense = network.dense.len(),
            window = network.window,
            "model artifact parsed"
        );
        Ok(network)
    }
}

impl ModelLoader for JsonModelLoader {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Arc<dyn SequenceModel>, TickerdeskError> {
        Ok(Arc::new(self.load_network()?))
    }
}
