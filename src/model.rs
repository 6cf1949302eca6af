//! Domain records shared by the control loop and its ports.
//!
//! Everything here is plain data: sensor snapshots, crop setpoints, the
//! persisted per-module actuator record and the outbound device command.
//! Time is always epoch milliseconds (`u64`), supplied by a
//! [`Clock`](crate::app::ports::Clock).

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

/// The five physical actuators of the greenhouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Module {
    #[serde(rename = "heater")]
    Heater,
    #[serde(rename = "coolerA")]
    CoolerA,
    #[serde(rename = "coolerB")]
    CoolerB,
    #[serde(rename = "waterPump")]
    WaterPump,
    #[serde(rename = "led")]
    Led,
}

impl Module {
    pub const COUNT: usize = 5;

    /// Every module, in control-loop evaluation order.
    pub const ALL: [Module; Module::COUNT] = [
        Module::Led,
        Module::WaterPump,
        Module::Heater,
        Module::CoolerA,
        Module::CoolerB,
    ];

    /// Dense index for fixed-size per-module tables.
    pub const fn index(self) -> usize {
        match self {
            Self::Heater => 0,
            Self::CoolerA => 1,
            Self::CoolerB => 2,
            Self::WaterPump => 3,
            Self::Led => 4,
        }
    }

    /// Wire name used in topics, payloads and the persisted record.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Heater => "heater",
            Self::CoolerA => "coolerA",
            Self::CoolerB => "coolerB",
            Self::WaterPump => "waterPump",
            Self::Led => "led",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a request names a module that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownModule(pub String);

impl fmt::Display for UnknownModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown module '{}'", self.0)
    }
}

impl std::error::Error for UnknownModule {}

impl FromStr for Module {
    type Err = UnknownModule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| UnknownModule(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Switch command
// ---------------------------------------------------------------------------

/// On/off command for a relay-driven actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub const fn from_status(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }

    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Switch {
    type Err = ();

    /// Case-insensitive `on` / `off`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("on") {
            Ok(Self::On)
        } else if s.eq_ignore_ascii_case("off") {
            Ok(Self::Off)
        } else {
            Err(())
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A point-in-time snapshot of the greenhouse sensors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorReading {
    /// Air temperature (°C).
    pub temperature: f32,
    /// Relative humidity (%).
    pub humidity: f32,
    /// Soil moisture (%).
    pub soil_moisture: f32,
    /// Reservoir level (device units).
    pub water_level: i32,
    /// When the reading was taken (epoch ms).
    pub timestamp_ms: u64,
}

/// Setpoints for the crop currently being grown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    pub crop_id: String,
    /// Target air temperature (°C).
    pub target_temp: f32,
    /// Target relative humidity (%).
    pub target_humi: f32,
    /// Target soil moisture (%).
    pub target_soil: f32,
    /// Target light exposure (hours per day).
    pub target_light: f32,
}

// ---------------------------------------------------------------------------
// Persisted actuator record
// ---------------------------------------------------------------------------

/// Last known state of one module, as persisted by the
/// [`ActuatorStateStore`](crate::app::ports::ActuatorStateStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorState {
    pub module: Module,
    pub status: bool,
    pub command: Switch,
    /// When the command last changed (epoch ms).
    pub command_time_ms: Option<u64>,
    /// When the module was last written while ON (epoch ms).
    pub last_operation_ms: Option<u64>,
    /// Light hours accumulated today. Only meaningful for [`Module::Led`].
    pub accumulated_light_hours: f64,
}

impl ActuatorState {
    /// A fresh, switched-off record.
    pub fn off(module: Module) -> Self {
        Self {
            module,
            status: false,
            command: Switch::Off,
            command_time_ms: None,
            last_operation_ms: None,
            accumulated_light_hours: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound device command
// ---------------------------------------------------------------------------

/// A message for the device, rendered by
/// [`CommandPublisher`](crate::app::ports::CommandPublisher) adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Switch one actuator.
    Actuator { module: Module, switch: Switch },
    /// Ask the camera node to take a picture.
    Capture,
}

#[derive(Serialize)]
struct ActuatorPayload {
    command: &'static str,
    status: u8,
}

impl DeviceCommand {
    /// `farm/{device_id}/{module}` or `farm/{device_id}/camera-command`.
    pub fn topic(&self, device_id: &str) -> String {
        match self {
            Self::Actuator { module, .. } => format!("farm/{}/{}", device_id, module.name()),
            Self::Capture => format!("farm/{}/camera-command", device_id),
        }
    }

    /// `{"command":"on","status":1}` for actuators, `capture` for the camera.
    pub fn payload(&self) -> String {
        match self {
            Self::Actuator { switch, .. } => {
                let body = ActuatorPayload {
                    command: switch.as_str(),
                    status: u8::from(switch.is_on()),
                };
                // Serialising a two-field struct of primitives cannot fail.
                serde_json::to_string(&body).unwrap_or_default()
            }
            Self::Capture => "capture".to_string(),
        }
    }
}
