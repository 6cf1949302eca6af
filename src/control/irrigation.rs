//! Soil-moisture rule for the water pump.

use crate::model::{CropProfile, SensorReading};

/// True when the soil is drier than `target_soil - threshold`.
///
/// This is the raw demand only; the pump cooldown decides whether the
/// demand may actually switch the pump on.
pub fn needs_water(reading: &SensorReading, profile: &CropProfile, threshold: f32) -> bool {
    reading.soil_moisture < profile.target_soil - threshold
}
