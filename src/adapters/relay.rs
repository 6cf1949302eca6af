//! GPIO relay board adapter.
//!
//! Drives one `embedded-hal` output pin per module. Wired this way the
//! controller switches the actuators itself instead of asking a remote
//! node over the broker. Most opto-isolated relay boards energise on a
//! LOW input, hence [`RelayBoard::active_low`].
//!
//! The camera is not on the relay board; a capture command is accepted
//! and ignored.

use embedded_hal::digital::OutputPin;
use log::{debug, error};

use crate::app::ports::{CommandPublisher, PublishError};
use crate::model::{DeviceCommand, Module, Switch};

pub struct RelayBoard<P: OutputPin> {
    pins: [Option<P>; Module::COUNT],
    active_low: bool,
    states: [bool; Module::COUNT],
}

impl<P: OutputPin> RelayBoard<P> {
    /// Board whose relays close on a HIGH input.
    pub fn new() -> Self {
        Self {
            pins: [None, None, None, None, None],
            active_low: false,
            states: [false; Module::COUNT],
        }
    }

    /// Board whose relays close on a LOW input.
    pub fn active_low() -> Self {
        Self {
            active_low: true,
            ..Self::new()
        }
    }

    /// Attach `pin` to `module` and drive it to OFF.
    pub fn attach(&mut self, module: Module, mut pin: P) -> Result<(), PublishError> {
        Self::drive(&mut pin, false, self.active_low)?;
        self.pins[module.index()] = Some(pin);
        self.states[module.index()] = false;
        Ok(())
    }

    /// Last level commanded for `module`.
    pub fn is_on(&self, module: Module) -> bool {
        self.states[module.index()]
    }

    /// Switch `module`. Unwired modules are reported as not connected.
    pub fn set(&mut self, module: Module, switch: Switch) -> Result<(), PublishError> {
        let active_low = self.active_low;
        let Some(pin) = self.pins[module.index()].as_mut() else {
            return Err(PublishError::NotConnected);
        };
        Self::drive(pin, switch.is_on(), active_low)?;
        self.states[module.index()] = switch.is_on();
        debug!("Relay: {} -> {}", module, switch);
        Ok(())
    }

    /// Open every relay.
    pub fn all_off(&mut self) {
        for module in Module::ALL {
            if self.pins[module.index()].is_some() {
                if let Err(e) = self.set(module, Switch::Off) {
                    error!("Relay: {} did not switch off: {}", module, e);
                }
            }
        }
    }

    fn drive(pin: &mut P, on: bool, active_low: bool) -> Result<(), PublishError> {
        let result = if on != active_low {
            pin.set_high()
        } else {
            pin.set_low()
        };
        result.map_err(|_| PublishError::IoError)
    }
}

impl<P: OutputPin> Default for RelayBoard<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: OutputPin> CommandPublisher for RelayBoard<P> {
    fn publish(&mut self, _device_id: &str, command: &DeviceCommand) -> Result<(), PublishError> {
        match *command {
            DeviceCommand::Actuator { module, switch } => self.set(module, switch),
            DeviceCommand::Capture => {
                debug!("Relay: capture command ignored, no camera on this board");
                Ok(())
            }
        }
    }
}
