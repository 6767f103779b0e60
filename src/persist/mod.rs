//! Whole-record storage of the radio config.

/// JSON file store.
pub mod json;

use tracing::warn;

use crate::config::{ConfigError, RadioConfig};

/// Failure to load or save the radio config.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Filesystem error.
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed or mistyped JSON.
    #[error("config file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    /// Record parsed but failed validation.
    #[error("stored config rejected: {0}")]
    Invalid(#[from] ConfigError),
    /// Any other failure.
    #[error("{0}")]
    Message(String),
}

/// Result alias for store operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Whole-record storage for the radio configuration.
pub trait ConfigStore: Send + Sync {
    /// Returns the last saved record, or [`RadioConfig::default`] when
    /// nothing has been saved yet.
    fn load(&self) -> PersistResult<RadioConfig>;

    /// Replaces the stored record. Readers never observe a partial write.
    fn save(&self, config: &RadioConfig) -> PersistResult<()>;
}

/// Loads the stored record, falling back to the default when it is unreadable.
pub fn load_or_default(store: &dyn ConfigStore) -> RadioConfig {
    match store.load() {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "stored radio config unusable, using defaults");
            RadioConfig::default()
        }
    }
}
