//! Manual and photo overrides, operator commands and the request handle.

use crate::mock_farm::{MIN, Rig, T0};

use greenhouse::app::events::{AppEvent, OverrideKind};
use greenhouse::app::ports::Job;
use greenhouse::model::{ActuatorState, Module, Switch};

const CAMERA_TOPIC: &str = "farm/raspi-01/camera-command";

fn capture_count(rig: &Rig) -> usize {
    rig.farm
        .published
        .iter()
        .filter(|(topic, payload)| topic == CAMERA_TOPIC && payload == "capture")
        .count()
}

/// LED record that automatic control would switch OFF.
fn saturated_led() -> ActuatorState {
    let mut led = ActuatorState::off(Module::Led);
    led.status = true;
    led.command = Switch::On;
    led.accumulated_light_hours = 20.0;
    led
}

// ── Manual override ───────────────────────────────────────────

#[test]
fn manual_led_override_blocks_writes_for_five_minutes() {
    let mut rig = Rig::new();
    rig.sense(24.0, 60.0, 50.0);
    let handle = rig.control.handle();

    let until = handle.enable_manual_override(Module::Led, 5);
    assert_eq!(until, T0 + 5 * MIN);

    rig.tick();
    for _ in 1..5 {
        rig.next_minute();
    }
    assert_eq!(rig.farm.saves_for(Module::Led), 0);
    assert!(rig.farm.published_for(Module::Led).is_empty());
    assert_eq!(rig.farm.saves_for(Module::Heater), 5, "other modules keep running");

    // Expiry reached: automatic control resumes.
    rig.next_minute();
    assert_eq!(rig.farm.saves_for(Module::Led), 1);
    assert!(!handle.is_override_active(Module::Led));
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::OverrideCleared { module: Module::Led })
    );
}

#[test]
fn released_override_returns_control_next_tick() {
    let mut rig = Rig::new();
    rig.sense(18.0, 60.0, 50.0);
    let handle = rig.control.handle();

    handle.enable_manual_override(Module::Heater, 30);
    rig.tick();
    assert_eq!(rig.farm.status(Module::Heater), None);

    assert!(handle.disable_manual_override(Module::Heater));
    assert!(!handle.disable_manual_override(Module::Heater));
    rig.next_minute();
    assert_eq!(rig.farm.status(Module::Heater), Some(true));
}

#[test]
fn re_enabling_replaces_the_expiry() {
    let rig = Rig::new();
    let handle = rig.control.handle();

    handle.enable_manual_override(Module::CoolerA, 30);
    let until = handle.enable_manual_override(Module::CoolerA, 1);
    assert_eq!(until, T0 + MIN);

    rig.clock.advance(MIN);
    assert!(!handle.is_override_active(Module::CoolerA));
}

#[test]
fn manual_control_switches_now_and_holds_against_automatic_logic() {
    let mut rig = Rig::new();
    rig.sense(24.0, 60.0, 50.0);
    let handle = rig.control.handle();

    // Ventilating would keep cooler A off for its first ten minutes.
    handle.manual_control(Module::CoolerA, Switch::On).unwrap();
    rig.tick();
    for _ in 1..5 {
        rig.next_minute();
    }

    assert_eq!(rig.farm.status(Module::CoolerA), Some(true));
    assert_eq!(rig.farm.saves_for(Module::CoolerA), 1, "only the operator write");
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::ModuleSwitched {
            module: Module::CoolerA,
            immediate: true,
            ..
        }
    )));

    // Override lapses after five minutes; the duty cycle takes over.
    rig.next_minute();
    assert_eq!(rig.farm.status(Module::CoolerA), Some(false));
}

// ── Immediate apply ───────────────────────────────────────────

#[test]
fn apply_immediate_writes_and_publishes_without_a_tick() {
    let mut rig = Rig::new();

    rig.control
        .apply_immediate(Module::WaterPump, Switch::On, &mut rig.farm, &mut rig.sink)
        .unwrap();

    let pump = rig.farm.record(Module::WaterPump).unwrap();
    assert!(pump.status);
    assert_eq!(pump.command, Switch::On);
    assert_eq!(pump.command_time_ms, Some(T0));
    assert_eq!(pump.last_operation_ms, Some(T0));
    assert_eq!(rig.farm.last_command(Module::WaterPump), Some(Switch::On));
}

#[test]
fn manual_watering_starts_the_pump_cooldown() {
    let mut rig = Rig::new();
    rig.sense(24.0, 60.0, 20.0);
    let handle = rig.control.handle();

    handle.manual_control(Module::WaterPump, Switch::On).unwrap();
    rig.tick();
    assert!(
        rig.sink.events.contains(&AppEvent::PumpCooldownStarted {
            next_eligible_ms: T0 + 48 * 60 * MIN,
        })
    );

    let mut on_minutes = Vec::new();
    for minute in 0..10 {
        if minute > 0 {
            rig.next_minute();
        }
        if rig.farm.status(Module::WaterPump) == Some(true) {
            on_minutes.push(minute);
        }
    }

    // Held ON by the override, then the soil is still dry but the pump
    // is cooling down.
    assert_eq!(on_minutes, vec![0, 1, 2, 3, 4]);
    let pump_on_writes = rig
        .farm
        .saves
        .iter()
        .filter(|s| s.module == Module::WaterPump && s.status)
        .count();
    assert_eq!(pump_on_writes, 1, "only the operator write");
}

#[test]
fn apply_immediate_keeps_accumulated_light() {
    let mut rig = Rig::new();
    let mut led = ActuatorState::off(Module::Led);
    led.status = true;
    led.command = Switch::On;
    led.accumulated_light_hours = 3.5;
    rig.farm.records.insert(Module::Led, led);

    rig.control
        .apply_immediate(Module::Led, Switch::Off, &mut rig.farm, &mut rig.sink)
        .unwrap();

    let led = rig.farm.record(Module::Led).unwrap();
    assert!(!led.status);
    assert_eq!(led.accumulated_light_hours, 3.5);
}

#[test]
fn apply_immediate_reports_failures_after_trying_both_writes() {
    let mut rig = Rig::new();
    rig.farm.fail_saves = true;

    let result =
        rig.control
            .apply_immediate(Module::Heater, Switch::On, &mut rig.farm, &mut rig.sink);

    assert!(matches!(result, Err(greenhouse::Error::Store(_))));
    assert_eq!(rig.farm.last_command(Module::Heater), Some(Switch::On));
}

// ── Photo override ────────────────────────────────────────────

#[test]
fn photo_capture_forces_led_on_for_three_minutes() {
    let mut rig = Rig::new();
    rig.sense(24.0, 60.0, 50.0);
    rig.farm.records.insert(Module::Led, saturated_led());
    let handle = rig.control.handle();

    handle.request_photo_capture().unwrap();
    rig.tick();

    assert_eq!(capture_count(&rig), 1);
    assert_eq!(rig.farm.status(Module::Led), Some(true));
    assert!(rig.sink.events.contains(&AppEvent::PhotoCaptureRequested));
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::OverrideEnabled {
            kind: OverrideKind::Photo,
            ..
        }
    )));

    rig.next_minute();
    rig.next_minute();
    assert_eq!(rig.farm.status(Module::Led), Some(true), "still inside the photo window");

    rig.next_minute();
    assert_eq!(rig.farm.status(Module::Led), Some(false));
}

#[test]
fn photo_window_does_not_accrue_light() {
    let mut rig = Rig::new();
    rig.sense(24.0, 60.0, 50.0);
    let handle = rig.control.handle();

    handle.enable_photo_override(3);
    rig.tick();
    rig.next_minute();
    rig.next_minute();

    assert_eq!(rig.farm.record(Module::Led).unwrap().accumulated_light_hours, 0.0);
}

#[test]
fn manual_led_override_outranks_photo_capture() {
    let mut rig = Rig::new();
    rig.sense(24.0, 60.0, 50.0);
    let handle = rig.control.handle();

    handle.manual_control(Module::Led, Switch::Off).unwrap();
    handle.request_photo_capture().unwrap();
    rig.tick();
    rig.next_minute();

    assert_eq!(rig.farm.status(Module::Led), Some(false));
    assert_eq!(rig.farm.saves_for(Module::Led), 1, "only the manual write");
    assert_eq!(capture_count(&rig), 1, "the camera still fires");
}

#[test]
fn scheduled_photo_job_captures() {
    let mut rig = Rig::new();
    rig.control
        .run_job(Job::PhotoCapture, &mut rig.farm, &mut rig.sink);

    assert_eq!(capture_count(&rig), 1);
    assert_eq!(rig.farm.status(Module::Led), Some(true));
}

#[test]
fn requests_from_other_threads_reach_the_loop() {
    let mut rig = Rig::new();
    rig.sense(24.0, 60.0, 50.0);
    let handle = rig.control.handle();

    std::thread::spawn(move || {
        handle.manual_control(Module::Heater, Switch::On).unwrap();
    })
    .join()
    .unwrap();

    rig.tick();
    assert_eq!(rig.farm.status(Module::Heater), Some(true));
    assert_eq!(rig.control.tick_count(), 1);
}
