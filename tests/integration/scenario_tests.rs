//! End-to-end control scenarios: one ControlLoop, a mock farm and a
//! manual clock, ticked minute by minute.

use std::sync::Arc;

use crate::mock_farm::{MIN, RecordingSink, Rig, T0, crop, reading};

use greenhouse::adapters::farm::FarmIo;
use greenhouse::adapters::kv_store::KvStore;
use greenhouse::adapters::memory::{CropProfiles, LatestReading};
use greenhouse::adapters::mqtt::{LogTransport, MqttCommandPublisher};
use greenhouse::adapters::time::ManualClock;
use greenhouse::app::events::{AppEvent, SkipReason};
use greenhouse::app::ports::{ActuatorStateStore, Clock, Job};
use greenhouse::app::service::{ControlLoop, TickOutcome};
use greenhouse::config::ControlConfig;
use greenhouse::model::{ActuatorState, Module, Switch};

const HOUR: u64 = 60 * MIN;
const ON_PAYLOAD: &str = r#"{"command":"on","status":1}"#;
const OFF_PAYLOAD: &str = r#"{"command":"off","status":0}"#;

// ── Climate ───────────────────────────────────────────────────

#[test]
fn cold_air_heats_and_stops_both_coolers() {
    let mut rig = Rig::new();
    rig.sense(18.0, 60.0, 50.0);

    let outcome = rig.tick();

    assert_eq!(outcome, TickOutcome::Completed { applied: 5, failures: 0 });
    assert_eq!(rig.farm.status(Module::Heater), Some(true));
    assert_eq!(rig.farm.status(Module::CoolerA), Some(false));
    assert_eq!(rig.farm.status(Module::CoolerB), Some(false));
    assert_eq!(rig.farm.published_for(Module::Heater), vec![ON_PAYLOAD]);
    assert_eq!(rig.farm.published_for(Module::CoolerB), vec![OFF_PAYLOAD]);
}

#[test]
fn humid_air_runs_cooler_b_only() {
    let mut rig = Rig::new();
    rig.sense(24.0, 85.0, 50.0);

    rig.tick();

    assert_eq!(rig.farm.status(Module::CoolerB), Some(true));
    assert_eq!(rig.farm.status(Module::CoolerA), Some(false));
    assert_eq!(rig.farm.status(Module::Heater), Some(false));
}

#[test]
fn humidity_at_band_edge_ventilates() {
    let mut rig = Rig::new();
    // 70 is not above 60 + 10.
    rig.sense(24.0, 70.0, 50.0);

    rig.tick();

    // First window of each duty cycle is the OFF segment.
    assert_eq!(rig.farm.status(Module::CoolerA), Some(false));
    assert_eq!(rig.farm.status(Module::CoolerB), Some(false));
}

#[test]
fn cooler_a_follows_its_duty_cycle_when_ventilating() {
    let mut rig = Rig::new();
    rig.sense(24.0, 60.0, 50.0);
    rig.tick();

    let mut pattern = vec![rig.farm.status(Module::CoolerA) == Some(true)];
    for _ in 1..=15 {
        rig.next_minute();
        pattern.push(rig.farm.status(Module::CoolerA) == Some(true));
    }

    // 10 min off, 5 min on, then a fresh cycle.
    let expected: Vec<bool> = (0..=15).map(|m| (10..15).contains(&m)).collect();
    assert_eq!(pattern, expected);
}

#[test]
fn heater_rests_after_hitting_activation_limit() {
    let mut rig = Rig::new();
    rig.sense(18.0, 60.0, 50.0);

    rig.tick();
    for _ in 1..8 {
        rig.next_minute();
        assert_eq!(rig.farm.status(Module::Heater), Some(true));
    }

    // Ninth attempt inside the 10-minute window.
    rig.next_minute();
    assert_eq!(rig.farm.status(Module::Heater), Some(false));
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::HeaterRestStarted { until_ms: T0 + 11 * MIN })
    );

    rig.next_minute();
    rig.next_minute();
    assert_eq!(rig.farm.status(Module::Heater), Some(false), "still resting");

    rig.next_minute();
    assert_eq!(rig.farm.status(Module::Heater), Some(true), "rest over at +11 min");
    assert_eq!(rig.farm.status(Module::CoolerA), Some(false));
}

// ── Irrigation ────────────────────────────────────────────────

#[test]
fn dry_soil_waters_once_then_waits_out_cooldown() {
    let mut rig = Rig::new();
    rig.sense(24.0, 60.0, 20.0);

    rig.tick();
    assert_eq!(rig.farm.status(Module::WaterPump), Some(true));
    assert!(
        rig.sink.events.contains(&AppEvent::PumpCooldownStarted {
            next_eligible_ms: T0 + 48 * HOUR,
        })
    );

    rig.next_minute();
    assert_eq!(rig.farm.status(Module::WaterPump), Some(false));

    // Still dry for the whole cooldown: never ON again.
    let cooldown_end = T0 + 48 * HOUR;
    for _ in 0..7 {
        rig.clock.advance(6 * HOUR);
        rig.sense(24.0, 60.0, 20.0);
        rig.tick();
        assert_eq!(rig.farm.status(Module::WaterPump), Some(false));
    }
    assert!(rig.clock.now_ms() < cooldown_end);

    rig.clock.set(cooldown_end);
    rig.sense(24.0, 60.0, 20.0);
    rig.tick();
    assert_eq!(rig.farm.status(Module::WaterPump), Some(true));
}

#[test]
fn moist_soil_keeps_pump_off() {
    let mut rig = Rig::new();
    rig.sense(24.0, 60.0, 45.0);
    rig.tick();
    assert_eq!(rig.farm.status(Module::WaterPump), Some(false));
}

// ── Lighting ──────────────────────────────────────────────────

#[test]
fn led_accrues_light_while_on() {
    let mut rig = Rig::new();
    rig.sense(24.0, 60.0, 50.0);

    // First tick switches the LED on; the next 60 accrue one hour.
    rig.tick();
    for _ in 0..60 {
        rig.next_minute();
    }

    let led = rig.farm.record(Module::Led).unwrap();
    assert!(led.status);
    assert!((led.accumulated_light_hours - 1.0).abs() < 1e-9);
    assert_eq!(led.last_operation_ms, Some(rig.clock.now_ms()));
    assert_eq!(led.command_time_ms, Some(T0));
}

#[test]
fn led_switches_off_above_target_band_and_holds_inside_it() {
    let mut rig = Rig::new();
    rig.sense(24.0, 60.0, 50.0);
    let mut led = ActuatorState::off(Module::Led);
    led.status = true;
    led.command = Switch::On;
    led.accumulated_light_hours = 12.5;
    rig.farm.records.insert(Module::Led, led);

    rig.tick();
    assert_eq!(rig.farm.status(Module::Led), Some(true), "inside band holds ON");

    rig.farm.records.get_mut(&Module::Led).unwrap().accumulated_light_hours = 13.2;
    rig.next_minute();
    assert_eq!(rig.farm.status(Module::Led), Some(false));
}

#[test]
fn daily_reset_zeroes_light_whatever_the_status() {
    let mut rig = Rig::new();
    rig.sense(24.0, 60.0, 50.0);
    rig.tick();
    for _ in 0..30 {
        rig.next_minute();
    }
    assert!(rig.farm.record(Module::Led).unwrap().accumulated_light_hours > 0.0);

    rig.control
        .run_job(Job::DailyLightReset, &mut rig.farm, &mut rig.sink);

    let led = rig.farm.record(Module::Led).unwrap();
    assert_eq!(led.accumulated_light_hours, 0.0);
    assert!(led.status);
    assert!(matches!(rig.sink.events.last(), Some(AppEvent::LightReset { .. })));
}

// ── Skipped ticks ─────────────────────────────────────────────

#[test]
fn tick_without_crop_does_nothing() {
    let mut rig = Rig::new();
    rig.farm.profile = None;
    rig.sense(18.0, 60.0, 20.0);

    assert_eq!(rig.tick(), TickOutcome::Skipped(SkipReason::NoActiveCrop));
    assert!(rig.farm.saves.is_empty());
    assert!(rig.farm.published.is_empty());
}

#[test]
fn tick_without_reading_does_nothing() {
    let mut rig = Rig::new();
    assert_eq!(rig.tick(), TickOutcome::Skipped(SkipReason::NoSensorReading));
    assert!(rig.farm.saves.is_empty());
}

#[test]
fn stale_reading_skips_tick() {
    let mut rig = Rig::new();
    rig.farm.reading = Some(reading(18.0, 60.0, 20.0, T0 - 601 * 1_000));

    assert_eq!(
        rig.tick(),
        TickOutcome::Skipped(SkipReason::StaleReading { age_secs: 601 })
    );
    assert!(rig.farm.published.is_empty());
}

#[test]
fn unreadable_store_skips_tick() {
    let mut rig = Rig::new();
    rig.sense(18.0, 60.0, 20.0);
    rig.farm.fail_reads = true;

    assert_eq!(rig.tick(), TickOutcome::Skipped(SkipReason::StoreUnavailable));
    assert!(rig.farm.saves.is_empty());
}

#[test]
fn skipped_tick_leaves_heater_history_untouched() {
    let mut rig = Rig::new();
    rig.sense(18.0, 60.0, 50.0);
    rig.farm.profile = None;
    for _ in 0..20 {
        rig.next_minute();
    }

    rig.farm.profile = Some(crop());
    rig.next_minute();
    assert_eq!(rig.farm.status(Module::Heater), Some(true));
}

#[test]
fn corrupt_record_does_not_stop_the_other_modules() {
    let clock = Arc::new(ManualClock::new(T0));
    let mut control = ControlLoop::new(ControlConfig::default(), clock.clone()).unwrap();
    let latest = LatestReading::new();
    let profiles = CropProfiles::new();
    profiles.set_active(crop());
    let mut io = FarmIo::new(
        latest.clone(),
        profiles,
        KvStore::new(),
        MqttCommandPublisher::new(LogTransport),
    );
    let mut sink = RecordingSink::new();
    io.actuators.write("actuator", "coolerA", &[0xFF; 3]).unwrap();
    assert!(io.load(Module::CoolerA).is_err());

    for _ in 0..3 {
        latest.record(reading(5.0, 60.0, 10.0, clock.now_ms()));
        let outcome = control.tick(&mut io, &mut sink);
        assert!(matches!(outcome, TickOutcome::Completed { applied: 5, .. }));
        clock.advance(MIN);
    }

    assert!(io.load(Module::Heater).unwrap().unwrap().status);
    assert!(io.load(Module::WaterPump).unwrap().is_some());
    // The tick's own write replaced the bad record.
    assert!(!io.load(Module::CoolerA).unwrap().unwrap().status);
}

#[test]
fn operator_write_replaces_corrupt_record() {
    let clock = Arc::new(ManualClock::new(T0));
    let mut control = ControlLoop::new(ControlConfig::default(), clock).unwrap();
    let mut io = FarmIo::new(
        LatestReading::new(),
        CropProfiles::new(),
        KvStore::new(),
        MqttCommandPublisher::new(LogTransport),
    );
    let mut sink = RecordingSink::new();
    io.actuators.write("actuator", "coolerA", &[0xFF; 3]).unwrap();

    control
        .apply_immediate(Module::CoolerA, Switch::On, &mut io, &mut sink)
        .unwrap();

    let cooler = io.load(Module::CoolerA).unwrap().unwrap();
    assert!(cooler.status);
    assert_eq!(cooler.command_time_ms, Some(T0));
}

// ── Best-effort writes ────────────────────────────────────────

#[test]
fn failed_saves_do_not_block_publishing() {
    let mut rig = Rig::new();
    rig.sense(18.0, 60.0, 50.0);
    rig.farm.fail_saves = true;

    let outcome = rig.tick();

    assert_eq!(outcome, TickOutcome::Completed { applied: 5, failures: 5 });
    assert_eq!(rig.farm.published.len(), 5);
    assert_eq!(rig.farm.last_command(Module::Heater), Some(Switch::On));
}

#[test]
fn failed_publishing_does_not_block_saves() {
    let mut rig = Rig::new();
    rig.sense(18.0, 60.0, 50.0);
    rig.farm.fail_publish = true;

    let outcome = rig.tick();

    assert_eq!(outcome, TickOutcome::Completed { applied: 5, failures: 5 });
    assert_eq!(rig.farm.saves.len(), 5);
    assert_eq!(rig.farm.status(Module::Heater), Some(true));
}

#[test]
fn commands_are_republished_every_tick_but_switches_logged_once() {
    let mut rig = Rig::new();
    rig.sense(18.0, 60.0, 50.0);
    rig.tick();
    rig.next_minute();
    rig.next_minute();

    assert_eq!(rig.farm.published_for(Module::Heater).len(), 3);
    assert_eq!(rig.sink.switched(Module::Heater), 1);
}
