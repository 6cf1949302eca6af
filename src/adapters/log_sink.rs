//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade, one line per event. A dashboard feed would implement
//! the same trait.

use log::{info, warn};

use crate::app::events::{AppEvent, OverrideKind};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::TickSkipped(reason) => {
                warn!("TICK  | skipped: {:?}", reason);
            }
            AppEvent::ModuleSwitched {
                module,
                from,
                to,
                immediate,
            } => {
                info!(
                    "SWITCH| {} {} -> {}{}",
                    module,
                    if *from { "on" } else { "off" },
                    to,
                    if *immediate { " [operator]" } else { "" }
                );
            }
            AppEvent::OverrideEnabled {
                module,
                kind,
                until_ms,
            } => {
                let kind = match kind {
                    OverrideKind::Manual => "manual",
                    OverrideKind::Photo => "photo",
                };
                info!("OVRD  | {} {} until {}", module, kind, until_ms);
            }
            AppEvent::OverrideCleared { module } => {
                info!("OVRD  | {} cleared", module);
            }
            AppEvent::HeaterRestStarted { until_ms } => {
                warn!("HEAT  | activation limit reached, resting until {}", until_ms);
            }
            AppEvent::PumpCooldownStarted { next_eligible_ms } => {
                info!("PUMP  | watered, next eligible at {}", next_eligible_ms);
            }
            AppEvent::LightReset { previous_hours } => {
                info!("LIGHT | daily reset, {:.2}h accumulated", previous_hours);
            }
            AppEvent::PhotoCaptureRequested => {
                info!("PHOTO | capture requested");
            }
        }
    }
}
