//! Control loop — the hexagonal core.
//!
//! [`ControlLoop`] owns the in-memory control state (overrides, duty
//! cycles, heater and pump gates, light accrual) and evaluates every module
//! once per tick. All I/O flows through port traits injected at call sites,
//! so the whole loop is testable with a mock farm and a manual clock.
//!
//! ```text
//!  SensorGateway ──┐   ┌─────────────────────────────┐ ──▶ ActuatorStateStore
//!                  ├──▶│         ControlLoop          │
//! CropProfileStore ┘   │ Overrides · Duty · Gates     │ ──▶ CommandPublisher
//!                      └──────────────▲──────────────┘ ──▶ EventSink
//!                                     │
//!                    ControlHandle (request threads)
//! ```
//!
//! ## Tick phases
//!
//! 1. Read the active crop and the latest reading; either missing skips
//!    the tick. Then read the five persisted records. A record that is
//!    absent or unreadable counts as OFF for that module alone, and the
//!    tick's own write replaces it.
//! 2. Lock the shared state and plan one decision per module, in order
//!    LED → water pump → heater/coolers. Modules under an active override
//!    get no plan. The lock is released before any write.
//! 3. Apply each plan: persist, then publish. Either may fail without
//!    stopping the other or the rest of the tick.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};

use crate::config::ControlConfig;
use crate::control::climate::{self, ClimateLimits, ClimateMode};
use crate::control::irrigation;
use crate::control::lighting::{self, LightAccumulator};
use crate::duty_cycle::{DutyCycle, DutyCycleTracker};
use crate::error::{Error, Result};
use crate::model::{ActuatorState, CropProfile, DeviceCommand, Module, SensorReading, Switch};
use crate::overrides::OverrideRegistry;
use crate::safety::{Gate, HeaterSafety, PumpCooldown};

use super::commands::ControlCommand;
use super::events::{AppEvent, OverrideKind, SkipReason};
use super::ports::{Clock, ConfigError, EventSink, FarmPorts, Job, PublishError, StoreError};

// ───────────────────────────────────────────────────────────────
// Shared state
// ───────────────────────────────────────────────────────────────

/// Mutable control state shared between the loop and request threads.
///
/// None of this survives a restart: overrides, cycle positions, heater
/// history and the pump cooldown all start fresh.
#[derive(Debug)]
pub struct ControlState {
    pub overrides: OverrideRegistry,
    pub duty: DutyCycleTracker,
    pub heater: HeaterSafety,
    pub pump: PumpCooldown,
    pub light: LightAccumulator,
}

impl ControlState {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            overrides: OverrideRegistry::new(),
            duty: DutyCycleTracker::new(
                DutyCycle::from_secs(config.cooler_a_cycle_secs, config.cooler_a_on_secs),
                DutyCycle::from_secs(config.cooler_b_cycle_secs, config.cooler_b_on_secs),
            ),
            heater: HeaterSafety::new(
                config.heater_window_secs,
                config.heater_max_activations,
                config.heater_rest_secs,
            ),
            pump: PumpCooldown::new(config.pump_cooldown_secs),
            light: LightAccumulator::new(config.tick_interval_ms()),
        }
    }
}

pub type SharedState = Arc<Mutex<ControlState>>;

/// A panic while holding the lock leaves plain data behind; keep using it.
fn lock(state: &Mutex<ControlState>) -> MutexGuard<'_, ControlState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ───────────────────────────────────────────────────────────────
// Request surface
// ───────────────────────────────────────────────────────────────

/// Cloneable, thread-safe control surface for request handlers.
///
/// Override changes land immediately under the state mutex. Work that
/// needs the stores or the publisher is queued for the loop thread and
/// runs before its next tick.
#[derive(Clone)]
pub struct ControlHandle {
    state: SharedState,
    clock: Arc<dyn Clock>,
    tx: Sender<ControlCommand>,
    manual_minutes: u32,
    photo_minutes: u32,
}

impl ControlHandle {
    /// Suspend automatic control of `module` for `minutes`. Returns the expiry.
    pub fn enable_manual_override(&self, module: Module, minutes: u32) -> u64 {
        let now = self.clock.now_ms();
        let until = lock(&self.state).overrides.enable(module, minutes, now);
        warn!("Override: {} under manual control for {} min (until {})", module, minutes, until);
        until
    }

    /// Hand `module` back to automatic control on the next tick.
    pub fn disable_manual_override(&self, module: Module) -> bool {
        let removed = lock(&self.state).overrides.disable(module);
        if removed {
            info!("Override: {} released", module);
        } else {
            info!("Override: {} was not overridden", module);
        }
        removed
    }

    /// Force the LED on for `minutes`. Returns the expiry.
    pub fn enable_photo_override(&self, minutes: u32) -> u64 {
        let now = self.clock.now_ms();
        let until = lock(&self.state).overrides.enable_photo(minutes, now);
        warn!("Override: LED forced on for photo capture, {} min (until {})", minutes, until);
        until
    }

    pub fn is_override_active(&self, module: Module) -> bool {
        let now = self.clock.now_ms();
        lock(&self.state).overrides.is_active(module, now)
    }

    /// Queue a direct operator command for `module`.
    pub fn apply_immediate(&self, module: Module, switch: Switch) -> Result<()> {
        self.send(ControlCommand::ApplyImmediate { module, switch })
    }

    /// Dashboard button: take `module` over for the configured manual
    /// duration and switch it now. Returns the override expiry.
    pub fn manual_control(&self, module: Module, switch: Switch) -> Result<u64> {
        let until = self.enable_manual_override(module, self.manual_minutes);
        self.apply_immediate(module, switch)?;
        Ok(until)
    }

    /// Start the photo window now and queue the capture itself
    /// (LED write and camera command) for the loop thread.
    pub fn request_photo_capture(&self) -> Result<()> {
        self.enable_photo_override(self.photo_minutes);
        self.send(ControlCommand::CapturePhoto)
    }

    /// Queue a reset of the LED accumulated-light counter.
    pub fn reset_accumulated_light(&self) -> Result<()> {
        self.send(ControlCommand::ResetAccumulatedLight)
    }

    fn send(&self, cmd: ControlCommand) -> Result<()> {
        self.tx.send(cmd).map_err(|_| Error::LoopStopped)
    }
}

// ───────────────────────────────────────────────────────────────
// ControlLoop
// ───────────────────────────────────────────────────────────────

/// Result of one [`ControlLoop::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Skipped(SkipReason),
    /// `applied` modules were written; `failures` writes or publishes failed.
    Completed { applied: u8, failures: u8 },
}

/// One module's decision for this tick.
#[derive(Debug, Clone, Copy)]
struct Plan {
    module: Module,
    switch: Switch,
    /// New accumulated light (LED only); `None` keeps the stored value.
    accumulated: Option<f64>,
}

/// Inputs gathered before planning.
struct TickInputs {
    profile: CropProfile,
    reading: SensorReading,
    records: [ActuatorState; Module::COUNT],
}

/// The tick orchestrator.
pub struct ControlLoop {
    config: ControlConfig,
    clock: Arc<dyn Clock>,
    state: SharedState,
    tx: Sender<ControlCommand>,
    rx: Receiver<ControlCommand>,
    tick_count: u64,
}

impl ControlLoop {
    /// Build the loop from a configuration, rejecting invalid values.
    pub fn new(config: ControlConfig, clock: Arc<dyn Clock>) -> core::result::Result<Self, ConfigError> {
        config.validate()?;
        let state = Arc::new(Mutex::new(ControlState::new(&config)));
        let (tx, rx) = mpsc::channel();
        info!(
            "ControlLoop: device '{}', tick every {}s",
            config.device_id, config.tick_interval_secs
        );
        Ok(Self {
            config,
            clock,
            state,
            tx,
            rx,
            tick_count: 0,
        })
    }

    /// A request surface bound to this loop.
    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
            tx: self.tx.clone(),
            manual_minutes: self.config.manual_override_minutes,
            photo_minutes: self.config.photo_override_minutes,
        }
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// Total ticks started since construction, skipped ones included.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Shared state, for inspection.
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    // ── Scheduler entry point ─────────────────────────────────

    /// Run a scheduled job.
    pub fn run_job(&mut self, job: Job, io: &mut impl FarmPorts, sink: &mut impl EventSink) {
        match job {
            Job::ControlTick => {
                self.tick(io, sink);
            }
            Job::DailyLightReset => {
                if let Err(e) = self.reset_accumulated_light(io, sink) {
                    error!("Daily light reset failed: {}", e);
                }
            }
            Job::PhotoCapture => {
                if let Err(e) = self.capture_photo(io, sink) {
                    error!("Scheduled photo capture failed: {}", e);
                }
            }
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Evaluate every module once.
    pub fn tick(&mut self, io: &mut impl FarmPorts, sink: &mut impl EventSink) -> TickOutcome {
        self.tick_count += 1;
        let now = self.clock.now_ms();
        debug!("Tick #{} at {}", self.tick_count, now);

        let lapsed = lock(&self.state).overrides.prune(now);
        for module in lapsed {
            sink.emit(&AppEvent::OverrideCleared { module });
        }

        let inputs = match self.gather(io, now) {
            Ok(inputs) => inputs,
            Err(reason) => {
                warn!("Tick #{} skipped: {:?}", self.tick_count, reason);
                sink.emit(&AppEvent::TickSkipped(reason));
                return TickOutcome::Skipped(reason);
            }
        };

        let mut events: heapless::Vec<AppEvent, 4> = heapless::Vec::new();
        let plans = self.plan(&inputs, now, &mut events);
        for event in &events {
            sink.emit(event);
        }

        let mut applied = 0u8;
        let mut failures = 0u8;
        for plan in plans {
            let previous = &inputs.records[plan.module.index()];
            let (saved, published) = self.apply(plan, previous, now, false, io, sink);
            applied += 1;
            failures += u8::from(saved.is_err()) + u8::from(published.is_err());
        }

        TickOutcome::Completed { applied, failures }
    }

    /// Read everything the planner needs. A missing crop or reading skips
    /// the tick; actuator records never do.
    fn gather(&self, io: &impl FarmPorts, now: u64) -> core::result::Result<TickInputs, SkipReason> {
        let profile = match io.active_profile() {
            Ok(Some(p)) => p,
            Ok(None) => return Err(SkipReason::NoActiveCrop),
            Err(e) => {
                error!("Crop profile read failed: {}", e);
                return Err(SkipReason::StoreUnavailable);
            }
        };

        let reading = match io.latest_reading() {
            Ok(Some(r)) => r,
            Ok(None) => return Err(SkipReason::NoSensorReading),
            Err(e) => {
                error!("Sensor read failed: {}", e);
                return Err(SkipReason::StoreUnavailable);
            }
        };

        let age_ms = now.saturating_sub(reading.timestamp_ms);
        if age_ms > u64::from(self.config.max_reading_age_secs) * 1000 {
            return Err(SkipReason::StaleReading {
                age_secs: age_ms / 1000,
            });
        }

        let records = Module::ALL.map(|module| self.load_or_default(module, io));

        Ok(TickInputs {
            profile,
            reading,
            records,
        })
    }

    /// Decide every module under one lock of the shared state.
    fn plan(
        &self,
        inputs: &TickInputs,
        now: u64,
        events: &mut heapless::Vec<AppEvent, 4>,
    ) -> heapless::Vec<Plan, { Module::COUNT }> {
        let cfg = &self.config;
        let mut plans = heapless::Vec::new();
        let mut st = lock(&self.state);

        let mut push = |plan: Plan| {
            // One plan per module at most, so capacity is never exceeded.
            let _ = plans.push(plan);
        };

        // ── LED ───────────────────────────────────────────────
        if st.overrides.is_active(Module::Led, now) {
            warn!("LED: manual override active, automatic control skipped");
        } else if st.overrides.photo_active(now) {
            warn!("LED: photo override active, forcing ON");
            push(Plan {
                module: Module::Led,
                switch: Switch::On,
                accumulated: None,
            });
        } else {
            let led = &inputs.records[Module::Led.index()];
            let accumulated = led.accumulated_light_hours + st.light.accrue(led.status, now);
            let on = lighting::decide(
                accumulated,
                inputs.profile.target_light,
                cfg.light_tolerance_hours,
                led.status,
            );
            debug!(
                "LED: {:.2}h of {:.2}h (+{:.1}h band) -> {}",
                accumulated,
                inputs.profile.target_light,
                cfg.light_tolerance_hours,
                Switch::from_status(on)
            );
            push(Plan {
                module: Module::Led,
                switch: Switch::from_status(on),
                accumulated: Some(accumulated),
            });
        }

        // ── Water pump ────────────────────────────────────────
        if st.overrides.is_active(Module::WaterPump, now) {
            warn!("Pump: manual override active, automatic control skipped");
        } else {
            let wanted = irrigation::needs_water(&inputs.reading, &inputs.profile, cfg.soil_threshold);
            let on = wanted
                && match st.pump.try_activate(now) {
                    Gate::Allowed => {
                        if let Some(next_eligible_ms) = st.pump.cooling_until(now) {
                            let _ = events.push(AppEvent::PumpCooldownStarted { next_eligible_ms });
                        }
                        true
                    }
                    Gate::RestStarted(until) | Gate::Blocked(until) => {
                        debug!("Pump: soil dry but cooling down until {}", until);
                        false
                    }
                };
            push(Plan {
                module: Module::WaterPump,
                switch: Switch::from_status(on),
                accumulated: None,
            });
        }

        // ── Heater / coolers ──────────────────────────────────
        let mode = climate::classify(
            &inputs.reading,
            &inputs.profile,
            ClimateLimits {
                heater_low_threshold_c: cfg.heater_low_threshold_c,
                humidity_tolerance: cfg.humidity_tolerance,
            },
        );
        debug!(
            "Climate: T={:.1}/{:.1}C H={:.1}/{:.1}% -> {:?}",
            inputs.reading.temperature,
            inputs.profile.target_temp,
            inputs.reading.humidity,
            inputs.profile.target_humi,
            mode
        );

        if st.overrides.is_active(Module::Heater, now) {
            warn!("Heater: manual override active, automatic control skipped");
        } else {
            let on = mode == ClimateMode::Heating
                && match st.heater.try_activate(now) {
                    Gate::Allowed => true,
                    Gate::RestStarted(until) => {
                        let _ = events.push(AppEvent::HeaterRestStarted { until_ms: until });
                        false
                    }
                    Gate::Blocked(until) => {
                        debug!("Heater: resting until {}", until);
                        false
                    }
                };
            push(Plan {
                module: Module::Heater,
                switch: Switch::from_status(on),
                accumulated: None,
            });
        }

        for cooler in [Module::CoolerA, Module::CoolerB] {
            if st.overrides.is_active(cooler, now) {
                warn!("{}: manual override active, automatic control skipped", cooler);
                continue;
            }
            let on = match mode {
                ClimateMode::Heating => false,
                ClimateMode::Dehumidifying => cooler == Module::CoolerB,
                ClimateMode::Ventilating => st.duty.desired(cooler, now),
            };
            push(Plan {
                module: cooler,
                switch: Switch::from_status(on),
                accumulated: None,
            });
        }

        plans
    }

    // ── Applying decisions ────────────────────────────────────

    /// Persist and publish one decision. Both writes are always attempted;
    /// failures are logged here and handed back to the caller.
    fn apply(
        &self,
        plan: Plan,
        previous: &ActuatorState,
        now: u64,
        immediate: bool,
        io: &mut impl FarmPorts,
        sink: &mut impl EventSink,
    ) -> (core::result::Result<(), StoreError>, core::result::Result<(), PublishError>) {
        let mut next = previous.clone();
        next.status = plan.switch.is_on();
        next.command = plan.switch;
        let changed = previous.status != next.status || previous.command != next.command;
        if changed {
            next.command_time_ms = Some(now);
        }
        if next.status {
            next.last_operation_ms = Some(now);
        }
        if let (Module::Led, Some(hours)) = (plan.module, plan.accumulated) {
            next.accumulated_light_hours = hours;
        }

        let saved = io.save(&next);
        if let Err(e) = &saved {
            error!("{}: persisting state failed: {}", plan.module, e);
        }

        let command = DeviceCommand::Actuator {
            module: plan.module,
            switch: plan.switch,
        };
        let published = io.publish(&self.config.device_id, &command);
        if let Err(e) = &published {
            error!("{}: publishing '{}' failed: {}", plan.module, plan.switch, e);
        }

        if changed {
            info!(
                "{}: {} -> {}{}",
                plan.module,
                previous.command,
                plan.switch,
                if immediate { " (operator)" } else { "" }
            );
            sink.emit(&AppEvent::ModuleSwitched {
                module: plan.module,
                from: previous.status,
                to: plan.switch,
                immediate,
            });
        } else {
            debug!("{}: holds {}", plan.module, plan.switch);
        }

        (saved, published)
    }

    /// Stored record for `module`, or a fresh OFF record when there is none
    /// or it cannot be read. The next write replaces a bad record.
    fn load_or_default(&self, module: Module, io: &impl FarmPorts) -> ActuatorState {
        match io.load(module) {
            Ok(Some(state)) => state,
            Ok(None) => {
                warn!("{}: no stored record, creating one", module);
                ActuatorState::off(module)
            }
            Err(e) => {
                error!("{}: stored record unreadable ({}), treating it as OFF", module, e);
                ActuatorState::off(module)
            }
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Execute every queued request. Returns how many ran.
    pub fn drain_commands(&mut self, io: &mut impl FarmPorts, sink: &mut impl EventSink) -> usize {
        let mut handled = 0;
        while let Ok(cmd) = self.rx.try_recv() {
            if let Err(e) = self.handle_command(cmd, io, sink) {
                error!("Command {:?} failed: {}", cmd, e);
            }
            handled += 1;
        }
        handled
    }

    /// Process one request from a [`ControlHandle`] or the console.
    pub fn handle_command(
        &mut self,
        cmd: ControlCommand,
        io: &mut impl FarmPorts,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match cmd {
            ControlCommand::ApplyImmediate { module, switch } => {
                self.apply_immediate(module, switch, io, sink)
            }
            ControlCommand::CapturePhoto => self.capture_photo(io, sink),
            ControlCommand::ResetAccumulatedLight => self.reset_accumulated_light(io, sink),
        }
    }

    /// Persist and publish `switch` for `module` without consulting
    /// automatic logic. LED accumulated light is preserved.
    ///
    /// Switching the pump ON restarts its cooldown, so watering resumes
    /// under automatic control only after a full cooldown.
    pub fn apply_immediate(
        &mut self,
        module: Module,
        switch: Switch,
        io: &mut impl FarmPorts,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let now = self.clock.now_ms();
        let previous = self.load_or_default(module, io);
        if module == Module::WaterPump && switch.is_on() {
            let next_eligible_ms = lock(&self.state).pump.record_activation(now);
            sink.emit(&AppEvent::PumpCooldownStarted { next_eligible_ms });
        }
        let plan = Plan {
            module,
            switch,
            accumulated: None,
        };
        let (saved, published) = self.apply(plan, &previous, now, true, io, sink);
        saved?;
        published?;
        Ok(())
    }

    /// Force the LED on for the photo window and ask the camera for a shot.
    ///
    /// A manual LED override outranks the photo override: the LED is left
    /// alone, but the capture command still goes out.
    pub fn capture_photo(&mut self, io: &mut impl FarmPorts, sink: &mut impl EventSink) -> Result<()> {
        let now = self.clock.now_ms();
        let minutes = self.config.photo_override_minutes;
        let (until, manual_led) = {
            let mut st = lock(&self.state);
            let until = st.overrides.enable_photo(minutes, now);
            (until, st.overrides.is_active(Module::Led, now))
        };
        info!("Photo: LED forced on for {} min (until {})", minutes, until);
        sink.emit(&AppEvent::OverrideEnabled {
            module: Module::Led,
            kind: OverrideKind::Photo,
            until_ms: until,
        });

        // The capture goes out even if the LED write fails.
        let mut result = Ok(());
        if manual_led {
            warn!("Photo: LED under manual override, leaving it as is");
        } else {
            let previous = self.load_or_default(Module::Led, io);
            let plan = Plan {
                module: Module::Led,
                switch: Switch::On,
                accumulated: None,
            };
            let (saved, published) = self.apply(plan, &previous, now, false, io, sink);
            result = saved.map_err(Error::from).and(published.map_err(Error::from));
        }

        if let Err(e) = io.publish(&self.config.device_id, &DeviceCommand::Capture) {
            error!("Photo: capture command failed: {}", e);
            return Err(e.into());
        }
        info!("Photo: capture command sent");
        sink.emit(&AppEvent::PhotoCaptureRequested);
        result
    }

    /// Zero the LED accumulated-light counter, whatever the LED status.
    pub fn reset_accumulated_light(
        &mut self,
        io: &mut impl FarmPorts,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let mut led = self.load_or_default(Module::Led, io);
        let previous_hours = led.accumulated_light_hours;
        led.accumulated_light_hours = 0.0;
        io.save(&led)?;
        info!("LED: accumulated light reset ({:.2}h -> 0)", previous_hours);
        sink.emit(&AppEvent::LightReset { previous_hours });
        Ok(())
    }
}
