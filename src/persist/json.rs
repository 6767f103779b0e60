//! JSON file implementation of [`ConfigStore`].

use std::{
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::RadioConfig;

use super::{ConfigStore, PersistError, PersistResult};

/// Stores the radio configuration as one pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Uses `path` as the config file. Nothing is touched until `load`/`save`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Location of the config file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> PersistResult<RadioConfig> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no saved radio config");
                return Ok(RadioConfig::default());
            }
            Err(err) => return Err(err.into()),
        };

        let config: RadioConfig = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    fn save(&self, config: &RadioConfig) -> PersistResult<()> {
        config.validate()?;
        let dir = self.parent_dir();
        std::fs::create_dir_all(dir)?;

        // Same directory as the target so the rename cannot cross filesystems.
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, config)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|err| PersistError::Io(err.error))?;

        debug!(path = %self.path.display(), channel = config.channel, "radio config saved");
        Ok(())
    }
}
