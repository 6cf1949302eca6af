//! Threshold / hysteresis rules, one file per actuator group.
//!
//! These functions are pure: they look at a reading and the crop
//! setpoints and say what the automatic logic wants. Overrides, safety
//! gates and persistence are applied afterwards by the
//! [`ControlLoop`](crate::app::service::ControlLoop).

pub mod climate;
pub mod irrigation;
pub mod lighting;
