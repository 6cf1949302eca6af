//! Time-proportioned ventilation.
//!
//! Each cooler repeats a fixed-length window split into an OFF segment
//! followed by an ON segment:
//!
//! ```text
//!   cycle_start                                   cycle_start + cycle
//!   │◀──────────── off ────────────▶│◀──── on ────▶│
//!   └───────────────────────────────┴──────────────┘
//! ```
//!
//! When the elapsed time reaches the cycle length the window restarts
//! from "now" rather than from the nominal boundary, so a late tick shifts
//! the schedule instead of producing a burst of catch-up cycles.

use crate::model::Module;

/// Fixed timing for one cooler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCycle {
    /// Full window length (ms).
    pub cycle_ms: u64,
    /// ON segment at the end of the window (ms).
    pub on_ms: u64,
}

impl DutyCycle {
    pub const fn from_secs(cycle_secs: u32, on_secs: u32) -> Self {
        Self {
            cycle_ms: cycle_secs as u64 * 1000,
            on_ms: on_secs as u64 * 1000,
        }
    }

    /// OFF segment at the start of the window (ms).
    pub const fn off_ms(&self) -> u64 {
        self.cycle_ms.saturating_sub(self.on_ms)
    }

    /// Configured ON fraction of the window.
    pub fn duty_fraction(&self) -> f64 {
        if self.cycle_ms == 0 {
            return 0.0;
        }
        self.on_ms as f64 / self.cycle_ms as f64
    }
}

/// Live cycle position for one cooler.
#[derive(Debug, Clone, Copy)]
struct Track {
    timing: DutyCycle,
    cycle_start: Option<u64>,
}

impl Track {
    fn desired(&mut self, now_ms: u64) -> bool {
        let start = *self.cycle_start.get_or_insert(now_ms);
        let mut elapsed = now_ms.saturating_sub(start);
        if elapsed >= self.timing.cycle_ms {
            self.cycle_start = Some(now_ms);
            elapsed = 0;
        }
        elapsed >= self.timing.off_ms()
    }
}

/// Per-cooler cycle bookkeeping.
#[derive(Debug, Clone)]
pub struct DutyCycleTracker {
    cooler_a: Track,
    cooler_b: Track,
}

impl DutyCycleTracker {
    pub fn new(cooler_a: DutyCycle, cooler_b: DutyCycle) -> Self {
        Self {
            cooler_a: Track {
                timing: cooler_a,
                cycle_start: None,
            },
            cooler_b: Track {
                timing: cooler_b,
                cycle_start: None,
            },
        }
    }

    /// Whether `module` should be running at `now_ms`.
    ///
    /// The first call for a cooler opens its first window. Modules without
    /// a duty cycle always return `false`.
    pub fn desired(&mut self, module: Module, now_ms: u64) -> bool {
        match self.track_mut(module) {
            Some(track) => track.desired(now_ms),
            None => false,
        }
    }

    /// Start of the current window, if one has been opened.
    pub fn cycle_start(&self, module: Module) -> Option<u64> {
        self.track(module).and_then(|t| t.cycle_start)
    }

    pub fn timing(&self, module: Module) -> Option<DutyCycle> {
        self.track(module).map(|t| t.timing)
    }

    fn track(&self, module: Module) -> Option<&Track> {
        match module {
            Module::CoolerA => Some(&self.cooler_a),
            Module::CoolerB => Some(&self.cooler_b),
            _ => None,
        }
    }

    fn track_mut(&mut self, module: Module) -> Option<&mut Track> {
        match module {
            Module::CoolerA => Some(&mut self.cooler_a),
            Module::CoolerB => Some(&mut self.cooler_b),
            _ => None,
        }
    }
}
