//! Port composition.
//!
//! The control loop takes one `&mut impl FarmPorts`. [`FarmIo`] builds
//! that value out of four independent adapters, and the pair impl of
//! [`CommandPublisher`] lets one command reach two outputs (broker and
//! local relays, say).

use crate::app::ports::{
    ActuatorStateStore, CommandPublisher, CropProfileStore, PublishError, SensorGateway,
    StoreError,
};
use crate::model::{ActuatorState, CropProfile, DeviceCommand, Module, SensorReading};

/// Sensors, crop profiles, actuator records and command output.
#[derive(Debug)]
pub struct FarmIo<S, P, A, C> {
    pub sensors: S,
    pub profiles: P,
    pub actuators: A,
    pub publisher: C,
}

impl<S, P, A, C> FarmIo<S, P, A, C> {
    pub fn new(sensors: S, profiles: P, actuators: A, publisher: C) -> Self {
        Self {
            sensors,
            profiles,
            actuators,
            publisher,
        }
    }
}

impl<S: SensorGateway, P, A, C> SensorGateway for FarmIo<S, P, A, C> {
    fn latest_reading(&self) -> Result<Option<SensorReading>, StoreError> {
        self.sensors.latest_reading()
    }
}

impl<S, P: CropProfileStore, A, C> CropProfileStore for FarmIo<S, P, A, C> {
    fn active_profile(&self) -> Result<Option<CropProfile>, StoreError> {
        self.profiles.active_profile()
    }
}

impl<S, P, A: ActuatorStateStore, C> ActuatorStateStore for FarmIo<S, P, A, C> {
    fn load(&self, module: Module) -> Result<Option<ActuatorState>, StoreError> {
        self.actuators.load(module)
    }

    fn save(&mut self, state: &ActuatorState) -> Result<(), StoreError> {
        self.actuators.save(state)
    }
}

impl<S, P, A, C: CommandPublisher> CommandPublisher for FarmIo<S, P, A, C> {
    fn publish(&mut self, device_id: &str, command: &DeviceCommand) -> Result<(), PublishError> {
        self.publisher.publish(device_id, command)
    }
}

/// Publish to both; both are always attempted, the first error wins.
impl<A: CommandPublisher, B: CommandPublisher> CommandPublisher for (A, B) {
    fn publish(&mut self, device_id: &str, command: &DeviceCommand) -> Result<(), PublishError> {
        let first = self.0.publish(device_id, command);
        let second = self.1.publish(device_id, command);
        first.and(second)
    }
}
