//! Outbound application events.
//!
//! The [`ControlLoop`](super::service::ControlLoop) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them: log a line, feed a dashboard, record for a
//! test.

use crate::model::{Module, Switch};

/// Why a tick did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoActiveCrop,
    NoSensorReading,
    /// The latest reading is older than the configured maximum age.
    StaleReading { age_secs: u64 },
    /// The sensor or crop store could not be read.
    StoreUnavailable,
}

/// Who asked for an override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideKind {
    Manual,
    Photo,
}

/// Structured events emitted by the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A tick was skipped.
    TickSkipped(SkipReason),

    /// A module's persisted status changed.
    ModuleSwitched {
        module: Module,
        from: bool,
        to: Switch,
        /// `true` for operator commands applied outside a tick.
        immediate: bool,
    },

    /// An override was set or extended.
    OverrideEnabled {
        module: Module,
        kind: OverrideKind,
        until_ms: u64,
    },

    /// An override was released early or ran out.
    OverrideCleared { module: Module },

    /// The heater hit its activation limit.
    HeaterRestStarted { until_ms: u64 },

    /// The pump ran; the next activation is possible at `next_eligible_ms`.
    PumpCooldownStarted { next_eligible_ms: u64 },

    /// The daily accumulated-light counter was zeroed.
    LightReset { previous_hours: f64 },

    /// A capture command went out to the camera node.
    PhotoCaptureRequested,
}
