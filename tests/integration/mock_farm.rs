//! Mock farm adapter for integration tests.
//!
//! Implements every farm port in one struct and records each persist and
//! publish call, so tests can assert on the full write history. Failures
//! are injected per port with plain flags.

use std::collections::HashMap;
use std::sync::Arc;

use greenhouse::adapters::time::ManualClock;
use greenhouse::app::events::AppEvent;
use greenhouse::app::ports::{
    ActuatorStateStore, Clock, CommandPublisher, CropProfileStore, EventSink, PublishError,
    SensorGateway, StoreError,
};
use greenhouse::app::service::ControlLoop;
use greenhouse::config::ControlConfig;
use greenhouse::model::{ActuatorState, CropProfile, DeviceCommand, Module, SensorReading, Switch};

/// 2024-01-01T00:00:00Z.
pub const T0: u64 = 1_704_067_200_000;
pub const SEC: u64 = 1_000;
pub const MIN: u64 = 60 * SEC;

// ── MockFarm ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MockFarm {
    pub reading: Option<SensorReading>,
    pub profile: Option<CropProfile>,
    pub records: HashMap<Module, ActuatorState>,
    /// Every successful save, in order.
    pub saves: Vec<ActuatorState>,
    /// Every successful publish, in order: (topic, payload).
    pub published: Vec<(String, String)>,
    pub fail_reads: bool,
    pub fail_saves: bool,
    pub fail_publish: bool,
}

#[allow(dead_code)]
impl MockFarm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status currently persisted for `module`.
    pub fn status(&self, module: Module) -> Option<bool> {
        self.records.get(&module).map(|r| r.status)
    }

    pub fn record(&self, module: Module) -> Option<&ActuatorState> {
        self.records.get(&module)
    }

    /// Saves written for `module`.
    pub fn saves_for(&self, module: Module) -> usize {
        self.saves.iter().filter(|s| s.module == module).count()
    }

    /// Payloads published on `farm/raspi-01/{module}`.
    pub fn published_for(&self, module: Module) -> Vec<&str> {
        let topic = format!("farm/raspi-01/{}", module.name());
        self.published
            .iter()
            .filter(|(t, _)| *t == topic)
            .map(|(_, p)| p.as_str())
            .collect()
    }

    /// Last command sent for `module`, decoded from the payload.
    pub fn last_command(&self, module: Module) -> Option<Switch> {
        self.published_for(module).last().map(|p| {
            if p.contains("\"on\"") {
                Switch::On
            } else {
                Switch::Off
            }
        })
    }

    pub fn clear_history(&mut self) {
        self.saves.clear();
        self.published.clear();
    }
}

impl SensorGateway for MockFarm {
    fn latest_reading(&self) -> Result<Option<SensorReading>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Unavailable);
        }
        Ok(self.reading)
    }
}

impl CropProfileStore for MockFarm {
    fn active_profile(&self) -> Result<Option<CropProfile>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Unavailable);
        }
        Ok(self.profile.clone())
    }
}

impl ActuatorStateStore for MockFarm {
    fn load(&self, module: Module) -> Result<Option<ActuatorState>, StoreError> {
        Ok(self.records.get(&module).cloned())
    }

    fn save(&mut self, state: &ActuatorState) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::IoError);
        }
        self.records.insert(state.module, state.clone());
        self.saves.push(state.clone());
        Ok(())
    }
}

impl CommandPublisher for MockFarm {
    fn publish(&mut self, device_id: &str, command: &DeviceCommand) -> Result<(), PublishError> {
        if self.fail_publish {
            return Err(PublishError::NotConnected);
        }
        self.published
            .push((command.topic(device_id), command.payload()));
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn switched(&self, module: Module) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::ModuleSwitched { module: m, .. } if *m == module))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Fixtures ──────────────────────────────────────────────────

/// Temperate crop: nothing to do at 24 °C / 60 % / soil 50 / light 12 h.
pub fn crop() -> CropProfile {
    CropProfile {
        crop_id: "lettuce".into(),
        target_temp: 24.0,
        target_humi: 60.0,
        target_soil: 50.0,
        target_light: 12.0,
    }
}

pub fn reading(temperature: f32, humidity: f32, soil_moisture: f32, at: u64) -> SensorReading {
    SensorReading {
        temperature,
        humidity,
        soil_moisture,
        water_level: 1,
        timestamp_ms: at,
    }
}

pub struct Rig {
    pub control: ControlLoop,
    pub clock: Arc<ManualClock>,
    pub farm: MockFarm,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::with_config(ControlConfig::default())
    }

    pub fn with_config(config: ControlConfig) -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let control = ControlLoop::new(config, clock.clone()).expect("valid config");
        let mut farm = MockFarm::new();
        farm.profile = Some(crop());
        Self {
            control,
            clock,
            farm,
            sink: RecordingSink::new(),
        }
    }

    /// Set a fresh reading taken now.
    pub fn sense(&mut self, temperature: f32, humidity: f32, soil: f32) {
        self.farm.reading = Some(reading(temperature, humidity, soil, self.clock.now_ms()));
    }

    pub fn tick(&mut self) -> greenhouse::app::service::TickOutcome {
        self.control.drain_commands(&mut self.farm, &mut self.sink);
        self.control.tick(&mut self.farm, &mut self.sink)
    }

    /// Advance one minute, refresh the reading's timestamp, tick.
    pub fn next_minute(&mut self) -> greenhouse::app::service::TickOutcome {
        self.clock.advance(MIN);
        if let Some(r) = self.farm.reading.as_mut() {
            r.timestamp_ms = self.clock.now_ms();
        }
        self.tick()
    }
}
