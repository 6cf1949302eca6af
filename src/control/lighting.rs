//! Accumulated-light controller for the LED grow-light.
//!
//! The LED tracks how many hours of light the crop received today and
//! steers toward the profile's `target_light`:
//!
//! | accumulated                       | decision |
//! |-----------------------------------|----------|
//! | `< target`                        | ON       |
//! | `> target + tolerance`            | OFF      |
//! | otherwise (hysteresis band)       | hold     |
//!
//! Accrual happens per tick while the LED is ON. The elapsed time is
//! clamped to one tick interval so a stalled loop cannot credit hours
//! of light it never observed.

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Accrual clock for the LED.
#[derive(Debug, Clone)]
pub struct LightAccumulator {
    tick_ms: u64,
    last_tick: Option<u64>,
}

impl LightAccumulator {
    pub fn new(tick_ms: u64) -> Self {
        Self {
            tick_ms,
            last_tick: None,
        }
    }

    /// Hours to credit for the interval ending at `now_ms`.
    ///
    /// Returns 0 when the LED was OFF. The first accrual after startup
    /// credits one tick interval.
    pub fn accrue(&mut self, led_on: bool, now_ms: u64) -> f64 {
        let elapsed = match self.last_tick {
            Some(prev) => now_ms.saturating_sub(prev),
            None => self.tick_ms,
        };
        self.last_tick = Some(now_ms);
        if !led_on {
            return 0.0;
        }
        elapsed.min(self.tick_ms) as f64 / MS_PER_HOUR
    }
}

/// Hysteresis decision. `current` is the persisted LED status.
pub fn decide(accumulated_hours: f64, target_hours: f32, tolerance_hours: f32, current: bool) -> bool {
    let target = f64::from(target_hours);
    if accumulated_hours < target {
        true
    } else if accumulated_hours > target + f64::from(tolerance_hours) {
        false
    } else {
        current
    }
}
