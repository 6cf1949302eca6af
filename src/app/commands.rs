//! Inbound commands to the control loop.
//!
//! These represent actions requested by the outside world (dashboard,
//! console, scheduler) that need I/O and therefore run on the loop thread.
//! Override bookkeeping does not go through here: the
//! [`ControlHandle`](super::service::ControlHandle) writes it directly
//! under the state mutex.

use crate::model::{Module, Switch};

/// Commands that request handlers queue for the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Persist and publish `switch` for `module` now, bypassing automatic logic.
    ApplyImmediate { module: Module, switch: Switch },

    /// Force the LED on and publish a camera capture command.
    CapturePhoto,

    /// Zero the LED accumulated-light counter.
    ResetAccumulatedLight,
}
