//! Key-value store adapter.
//!
//! Implements both [`ActuatorStateStore`] and [`ConfigPort`] over one
//! namespaced blob store. Values are `postcard`-encoded; keys are
//! `{namespace}::{key}`:
//!
//! | Namespace  | Key           | Value              |
//! |------------|---------------|--------------------|
//! | `actuator` | module name   | [`ActuatorState`]  |
//! | `greenhouse` | `ctlcfg`    | [`ControlConfig`]  |
//!
//! The backend is an in-process map. Writes are validated before they land
//! and a record that fails to decode surfaces as
//! [`StoreError::Corrupted`], never as a default.

use std::cell::RefCell;
use std::collections::HashMap;

use log::{debug, info};

use crate::app::ports::{ActuatorStateStore, ConfigError, ConfigPort, StoreError};
use crate::config::ControlConfig;
use crate::model::{ActuatorState, Module};

const ACTUATOR_NAMESPACE: &str = "actuator";
const CONFIG_NAMESPACE: &str = "greenhouse";
const CONFIG_KEY: &str = "ctlcfg";

/// Upper bound for one stored value.
const MAX_BLOB_SIZE: usize = 4000;

#[derive(Debug, Default)]
pub struct KvStore {
    store: RefCell<HashMap<String, Vec<u8>>>,
}

impl KvStore {
    pub fn new() -> Self {
        info!("KvStore: in-memory backend");
        Self::default()
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Raw read. `None` if the key was never written.
    pub fn read(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.store
            .borrow()
            .get(&Self::composite_key(namespace, key))
            .cloned()
    }

    /// Raw write, replacing any previous value.
    pub fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StoreError> {
        if data.len() > MAX_BLOB_SIZE {
            return Err(StoreError::IoError);
        }
        self.store
            .borrow_mut()
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    pub fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store
            .borrow()
            .contains_key(&Self::composite_key(namespace, key))
    }

    /// Drop every actuator record (factory reset).
    pub fn erase_actuators(&self) {
        let prefix = format!("{}::", ACTUATOR_NAMESPACE);
        self.store
            .borrow_mut()
            .retain(|k: &String, _: &mut Vec<u8>| !k.starts_with(&prefix));
    }
}

impl ActuatorStateStore for KvStore {
    fn load(&self, module: Module) -> Result<Option<ActuatorState>, StoreError> {
        let Some(bytes) = self.read(ACTUATOR_NAMESPACE, module.name()) else {
            return Ok(None);
        };
        let state: ActuatorState =
            postcard::from_bytes(&bytes).map_err(|_| StoreError::Corrupted)?;
        if state.module != module {
            return Err(StoreError::Corrupted);
        }
        Ok(Some(state))
    }

    fn save(&mut self, state: &ActuatorState) -> Result<(), StoreError> {
        let bytes = postcard::to_allocvec(state).map_err(|_| StoreError::IoError)?;
        self.write(ACTUATOR_NAMESPACE, state.module.name(), &bytes)?;
        debug!("KvStore: saved {} ({} bytes)", state.module, bytes.len());
        Ok(())
    }
}

impl ConfigPort for KvStore {
    fn load(&self) -> Result<ControlConfig, ConfigError> {
        match self.read(CONFIG_NAMESPACE, CONFIG_KEY) {
            Some(bytes) => {
                let cfg: ControlConfig =
                    postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                cfg.validate()?;
                info!("KvStore: loaded config from store");
                Ok(cfg)
            }
            None => {
                info!("KvStore: no stored config, using defaults");
                Ok(ControlConfig::default())
            }
        }
    }

    fn save(&self, config: &ControlConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.write(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)
            .map_err(|_| ConfigError::IoError)?;
        info!("KvStore: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}
