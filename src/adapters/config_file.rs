//! JSON file configuration adapter.
//!
//! A missing file yields [`ControlConfig::default()`]; fields absent from
//! the file take their default values. Anything that fails to parse or to
//! validate is rejected.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::ControlConfig;

#[derive(Debug, Clone)]
pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<ControlConfig, ConfigError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Config: {} not found, using defaults", self.path.display());
                return Ok(ControlConfig::default());
            }
            Err(e) => {
                warn!("Config: reading {} failed: {}", self.path.display(), e);
                return Err(ConfigError::IoError);
            }
        };
        let cfg: ControlConfig = serde_json::from_str(&text).map_err(|e| {
            warn!("Config: {} is not valid: {}", self.path.display(), e);
            ConfigError::Corrupted
        })?;
        cfg.validate()?;
        info!("Config: loaded {}", self.path.display());
        Ok(cfg)
    }

    fn save(&self, config: &ControlConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let text = serde_json::to_string_pretty(config).map_err(|_| ConfigError::IoError)?;
        std::fs::write(&self.path, text).map_err(|e| {
            warn!("Config: writing {} failed: {}", self.path.display(), e);
            ConfigError::IoError
        })
    }
}
