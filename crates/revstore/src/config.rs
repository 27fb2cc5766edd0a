//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EnvelopeError, Result};

/// Configuration for the [`EnvelopeStore`](crate::EnvelopeStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Run the identity verifier on every read.
    pub verify_on_read: bool,
    /// Hash-check blobs fetched from the content store.
    pub verify_blobs: bool,
    /// Maximum keys per backend batch query.
    pub batch_chunk_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            verify_on_read: true,
            verify_blobs: true,
            batch_chunk_size: 256,
        }
    }
}

impl StoreConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EnvelopeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_chunk_size == 0 {
            return Err(EnvelopeError::Config(
                "batch_chunk_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
