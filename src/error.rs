//! Unified error type for the greenhouse controller.
//!
//! Every port error converts into [`Error`], so callers that want a single
//! type (the binary, operator requests) can use `?` across subsystems.

use core::fmt;

use crate::app::ports::{ConfigError, PublishError, StoreError};

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug)]
pub enum Error {
    /// Reading or writing a store failed.
    Store(StoreError),
    /// Delivering a command to the device failed.
    Publish(PublishError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// The control loop is gone (its request queue was closed).
    LoopStopped,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Publish(e) => write!(f, "publish: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::LoopStopped => write!(f, "control loop stopped"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<PublishError> for Error {
    fn from(e: PublishError) -> Self {
        Self::Publish(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
