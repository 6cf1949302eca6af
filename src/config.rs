//! Control configuration parameters
//!
//! All tunable thresholds, durations and identifiers for the greenhouse
//! control loop. Values are loaded through a
//! [`ConfigPort`](crate::app::ports::ConfigPort) and validated at startup.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Upper bound on the heater overload limit (fixed history capacity).
pub const MAX_HEATER_ACTIVATIONS: usize = 32;

/// Core control configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    // --- Identity / timing ---
    /// Device id used in command topics (`farm/{device_id}/...`)
    pub device_id: String,
    /// Control tick interval (seconds)
    pub tick_interval_secs: u32,
    /// Oldest sensor reading the loop will act on (seconds)
    pub max_reading_age_secs: u32,
    /// Local time offset from UTC (minutes), used for the daily reset
    pub utc_offset_minutes: i32,

    // --- Heater ---
    /// Heater turns on below `target_temp - heater_low_threshold_c`
    pub heater_low_threshold_c: f32,
    /// Trailing window for overload counting (seconds)
    pub heater_window_secs: u32,
    /// Activations allowed inside the window before a forced rest
    pub heater_max_activations: u8,
    /// Forced rest after an overload (seconds)
    pub heater_rest_secs: u32,

    // --- Humidity / ventilation ---
    /// Dehumidify above `target_humi + humidity_tolerance`
    pub humidity_tolerance: f32,
    /// Cooler A ventilation cycle length (seconds)
    pub cooler_a_cycle_secs: u32,
    /// Cooler A ON segment at the end of each cycle (seconds)
    pub cooler_a_on_secs: u32,
    /// Cooler B ventilation cycle length (seconds)
    pub cooler_b_cycle_secs: u32,
    /// Cooler B ON segment at the end of each cycle (seconds)
    pub cooler_b_on_secs: u32,

    // --- Water pump ---
    /// Pump turns on below `target_soil - soil_threshold`
    pub soil_threshold: f32,
    /// Minimum rest after an activation (seconds)
    pub pump_cooldown_secs: u32,

    // --- Grow light ---
    /// LED turns off above `target_light + light_tolerance_hours`
    pub light_tolerance_hours: f32,
    /// Local hour of the daily accumulated-light reset (0-23)
    pub light_reset_hour: u8,
    /// Local minute of the daily accumulated-light reset (0-59)
    pub light_reset_minute: u8,

    // --- Overrides / photo capture ---
    /// Manual override length applied by operator commands (minutes)
    pub manual_override_minutes: u32,
    /// LED force-on window around a photo capture (minutes)
    pub photo_override_minutes: u32,
    /// Automatic photo capture interval (seconds, 0 = disabled)
    pub photo_capture_interval_secs: u32,

    // --- Broker ---
    /// MQTT broker host; empty keeps commands on the local log
    pub mqtt_host: String,
    /// MQTT broker port
    pub mqtt_port: u16,
    /// Topic the sensor node publishes its readings on
    pub sensor_topic: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            // Identity / timing
            device_id: "raspi-01".to_string(),
            tick_interval_secs: 60,
            max_reading_age_secs: 600,
            utc_offset_minutes: 9 * 60, // KST

            // Heater
            heater_low_threshold_c: 1.5,
            heater_window_secs: 600,
            heater_max_activations: 8,
            heater_rest_secs: 180,

            // Humidity / ventilation
            humidity_tolerance: 10.0,
            cooler_a_cycle_secs: 15 * 60,
            cooler_a_on_secs: 5 * 60,
            cooler_b_cycle_secs: 20 * 60,
            cooler_b_on_secs: 5 * 60,

            // Water pump
            soil_threshold: 10.0,
            pump_cooldown_secs: 2 * 24 * 3600,

            // Grow light
            light_tolerance_hours: 1.0,
            light_reset_hour: 8,
            light_reset_minute: 0,

            // Overrides / photo
            manual_override_minutes: 5,
            photo_override_minutes: 3,
            photo_capture_interval_secs: 3600,

            // Broker
            mqtt_host: String::new(),
            mqtt_port: 1883,
            sensor_topic: "datafarm/sensor_data".to_string(),
        }
    }
}

impl ControlConfig {
    /// Whether commands go to a real broker.
    pub fn broker_enabled(&self) -> bool {
        !self.mqtt_host.is_empty()
    }

    /// Control tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        u64::from(self.tick_interval_secs) * 1000
    }

    /// Range-check every field. Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_id.is_empty() || self.device_id.contains(['/', '+', '#']) {
            return Err(ConfigError::ValidationFailed(
                "device_id must be non-empty and free of MQTT wildcards",
            ));
        }
        if !(1..=3600).contains(&self.tick_interval_secs) {
            return Err(ConfigError::ValidationFailed(
                "tick_interval_secs must be 1–3600",
            ));
        }
        if self.max_reading_age_secs < self.tick_interval_secs {
            return Err(ConfigError::ValidationFailed(
                "max_reading_age_secs must be >= tick_interval_secs",
            ));
        }
        if !(-14 * 60..=14 * 60).contains(&self.utc_offset_minutes) {
            return Err(ConfigError::ValidationFailed(
                "utc_offset_minutes must be within ±14h",
            ));
        }
        if !(0.0..=20.0).contains(&self.heater_low_threshold_c) {
            return Err(ConfigError::ValidationFailed(
                "heater_low_threshold_c must be 0.0–20.0",
            ));
        }
        if self.heater_window_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "heater_window_secs must be > 0",
            ));
        }
        if self.heater_max_activations == 0
            || usize::from(self.heater_max_activations) > MAX_HEATER_ACTIVATIONS
        {
            return Err(ConfigError::ValidationFailed(
                "heater_max_activations must be 1–32",
            ));
        }
        if self.heater_rest_secs == 0 {
            return Err(ConfigError::ValidationFailed("heater_rest_secs must be > 0"));
        }
        if !(0.0..=50.0).contains(&self.humidity_tolerance) {
            return Err(ConfigError::ValidationFailed(
                "humidity_tolerance must be 0.0–50.0",
            ));
        }
        if self.cooler_a_cycle_secs == 0 || self.cooler_a_on_secs > self.cooler_a_cycle_secs {
            return Err(ConfigError::ValidationFailed(
                "cooler A cycle must be > 0 and contain its ON segment",
            ));
        }
        if self.cooler_b_cycle_secs == 0 || self.cooler_b_on_secs > self.cooler_b_cycle_secs {
            return Err(ConfigError::ValidationFailed(
                "cooler B cycle must be > 0 and contain its ON segment",
            ));
        }
        if !(0.0..=100.0).contains(&self.soil_threshold) {
            return Err(ConfigError::ValidationFailed(
                "soil_threshold must be 0.0–100.0",
            ));
        }
        if !(0.0..=24.0).contains(&self.light_tolerance_hours) {
            return Err(ConfigError::ValidationFailed(
                "light_tolerance_hours must be 0.0–24.0",
            ));
        }
        if self.light_reset_hour > 23 || self.light_reset_minute > 59 {
            return Err(ConfigError::ValidationFailed(
                "light reset time must be a valid HH:MM",
            ));
        }
        if !(1..=24 * 60).contains(&self.manual_override_minutes) {
            return Err(ConfigError::ValidationFailed(
                "manual_override_minutes must be 1–1440",
            ));
        }
        if !(1..=60).contains(&self.photo_override_minutes) {
            return Err(ConfigError::ValidationFailed(
                "photo_override_minutes must be 1–60",
            ));
        }
        if self.broker_enabled() && self.mqtt_port == 0 {
            return Err(ConfigError::ValidationFailed("mqtt_port must be > 0"));
        }
        if self.sensor_topic.is_empty() || self.sensor_topic.contains(['+', '#']) {
            return Err(ConfigError::ValidationFailed(
                "sensor_topic must be non-empty and free of MQTT wildcards",
            ));
        }
        Ok(())
    }
}
