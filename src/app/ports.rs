//! Port traits — the hexagonal boundary between the control loop and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlLoop (domain)
//! ```
//!
//! Driven adapters (sensor feed, crop store, actuator record store, command
//! transport, event sinks, clock) implement these traits. The
//! [`ControlLoop`](super::service::ControlLoop) consumes them via generics,
//! so the decision engine never touches storage or the broker directly.
//!
//! ## Failure contract
//!
//! - A failed sensor or crop read is treated like missing data: the tick
//!   is skipped. A failed actuator record read counts as an OFF record for
//!   that module only.
//! - Writes ([`ActuatorStateStore::save`], [`CommandPublisher::publish`])
//!   are best-effort. The loop logs a failure and carries on; actuator
//!   commands are idempotent, so the next tick repairs any gap.

use crate::config::ControlConfig;
use crate::model::{ActuatorState, CropProfile, DeviceCommand, Module, SensorReading};

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Wall-clock source. Injected so tests can drive time explicitly.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Input ports (driven adapter: outside world → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the most recent sensor measurement.
pub trait SensorGateway {
    /// Latest reading, or `None` if nothing has been received yet.
    fn latest_reading(&self) -> Result<Option<SensorReading>, StoreError>;
}

/// Read-side port for crop setpoints.
pub trait CropProfileStore {
    /// The single active profile, if any.
    fn active_profile(&self) -> Result<Option<CropProfile>, StoreError>;
}

// ───────────────────────────────────────────────────────────────
// Output ports (driven adapter: domain → outside world)
// ───────────────────────────────────────────────────────────────

/// Persists the last known state of each module.
pub trait ActuatorStateStore {
    /// Load the record for `module`, `None` if never written.
    fn load(&self, module: Module) -> Result<Option<ActuatorState>, StoreError>;

    /// Insert or replace the record for `state.module`.
    fn save(&mut self, state: &ActuatorState) -> Result<(), StoreError>;
}

/// Delivers commands to the physical device.
pub trait CommandPublisher {
    /// Send one command. Commands are idempotent; re-sending is safe.
    fn publish(&mut self, device_id: &str, command: &DeviceCommand) -> Result<(), PublishError>;
}

/// Everything a control tick touches, satisfied by one adapter value.
///
/// Passing a single `&mut io` avoids borrowing four adapters mutably at
/// once while keeping each port boundary explicit.
pub trait FarmPorts: SensorGateway + CropProfileStore + ActuatorStateStore + CommandPublisher {}

impl<T> FarmPorts for T where T: SensorGateway + CropProfileStore + ActuatorStateStore + CommandPublisher {}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (log, dashboard
/// feed, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads and persists the control configuration.
///
/// Implementations MUST call [`ControlConfig::validate`] before returning
/// a loaded config and before persisting one. Out-of-range thresholds are
/// rejected with [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Load configuration. Returns [`ControlConfig::default()`] if none is stored.
    fn load(&self) -> Result<ControlConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ControlConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from the control loop)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when a schedule fires.
///
/// The host loop implements this by forwarding each [`Job`] to the
/// [`ControlLoop`](super::service::ControlLoop); the scheduler itself knows
/// nothing about sensors or actuators.
pub trait SchedulerDelegate {
    /// * `label`: the human-readable label of the schedule that fired.
    /// * `job`: what the schedule asks for.
    fn on_schedule_fired(&mut self, label: &str, job: Job);
}

/// Work items a schedule can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// Evaluate every module once.
    ControlTick,
    /// Zero the LED accumulated-light counter.
    DailyLightReset,
    /// Force the LED on and ask the camera for a picture.
    PhotoCapture,
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// Stored config could not be parsed.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from the store ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend not reachable.
    Unavailable,
    /// Stored record failed to decode.
    Corrupted,
    /// Generic I/O error.
    IoError,
}

/// Errors from [`CommandPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// Transport has no live connection.
    NotConnected,
    /// The transport refused the message.
    Rejected,
    /// Generic I/O error (e.g. GPIO write failure).
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "store unavailable"),
            Self::Corrupted => write!(f, "record corrupted"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for PublishError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "publisher not connected"),
            Self::Rejected => write!(f, "message rejected"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
