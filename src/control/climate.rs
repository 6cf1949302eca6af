//! Heater / cooler arbitration.
//!
//! The heater and both coolers are decided together because they share
//! one priority order:
//!
//! 1. **Heating**: temperature below `target_temp - low_threshold`.
//!    The heater is wanted and both coolers are forced OFF.
//! 2. **Dehumidifying**: humidity above `target_humi + tolerance`.
//!    Heater OFF, cooler B ON, cooler A OFF.
//! 3. **Ventilating**: both nominal. Heater OFF; each cooler follows its
//!    own duty cycle.

use crate::model::{CropProfile, SensorReading};

/// Which branch of the priority order applies this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimateMode {
    Heating,
    Dehumidifying,
    Ventilating,
}

/// Thresholds for [`classify`].
#[derive(Debug, Clone, Copy)]
pub struct ClimateLimits {
    pub heater_low_threshold_c: f32,
    pub humidity_tolerance: f32,
}

/// Pick the climate branch for `reading` against `profile`.
pub fn classify(reading: &SensorReading, profile: &CropProfile, limits: ClimateLimits) -> ClimateMode {
    if reading.temperature < profile.target_temp - limits.heater_low_threshold_c {
        ClimateMode::Heating
    } else if reading.humidity > profile.target_humi + limits.humidity_tolerance {
        ClimateMode::Dehumidifying
    } else {
        ClimateMode::Ventilating
    }
}
