//! Actuator protection gates.
//!
//! Two gates sit between a module's automatic decision and the actuator:
//!
//! - [`HeaterSafety`] counts heater activation attempts in a trailing
//!   window. Reaching the limit forces the heater OFF and starts a rest
//!   period in which no activation is allowed, whatever the temperature.
//! - [`PumpCooldown`] enforces a minimum interval between pump
//!   activations so a sensor stuck at "dry" cannot flood the bed.
//!
//! Both gates are consulted only when automatic logic wants the actuator
//! ON; an OFF decision passes straight through. An operator pump ON skips
//! the gate but still restarts the cooldown.
//!
//! ## Heater lifecycle
//!
//! 1. Each ON attempt prunes history older than the window.
//! 2. If the remaining count is below the limit, the attempt is recorded
//!    and allowed.
//! 3. Otherwise the attempt is denied, the history is cleared and
//!    `rest_until = now + rest` is set.
//! 4. Attempts before `rest_until` are denied without being recorded.

use log::{error, info};

use crate::config::MAX_HEATER_ACTIVATIONS;

/// Outcome of asking a gate for permission to switch ON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Activation permitted (and recorded).
    Allowed,
    /// Overload limit just reached; a rest period started, ending at the instant given.
    RestStarted(u64),
    /// A rest or cooldown is running until the instant given.
    Blocked(u64),
}

impl Gate {
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

// ───────────────────────────────────────────────────────────────
// Heater overload protection
// ───────────────────────────────────────────────────────────────

/// Sliding-window activation history with a rest gate.
#[derive(Debug, Clone)]
pub struct HeaterSafety {
    window_ms: u64,
    max_activations: usize,
    rest_ms: u64,
    history: heapless::Vec<u64, MAX_HEATER_ACTIVATIONS>,
    rest_until: Option<u64>,
}

impl HeaterSafety {
    /// `max_activations` is clamped to the history capacity; the config
    /// validator rejects larger values before they get here.
    pub fn new(window_secs: u32, max_activations: u8, rest_secs: u32) -> Self {
        Self {
            window_ms: u64::from(window_secs) * 1000,
            max_activations: usize::from(max_activations).clamp(1, MAX_HEATER_ACTIVATIONS),
            rest_ms: u64::from(rest_secs) * 1000,
            history: heapless::Vec::new(),
            rest_until: None,
        }
    }

    /// Ask to switch the heater ON at `now_ms`.
    pub fn try_activate(&mut self, now_ms: u64) -> Gate {
        if let Some(until) = self.rest_until {
            if now_ms < until {
                return Gate::Blocked(until);
            }
            self.rest_until = None;
            info!("Heater: rest period over");
        }

        self.prune(now_ms);

        if self.history.len() >= self.max_activations {
            let until = now_ms.saturating_add(self.rest_ms);
            error!(
                "Heater: {} activations in {}s, resting until {}",
                self.history.len(),
                self.window_ms / 1000,
                until
            );
            self.history.clear();
            self.rest_until = Some(until);
            return Gate::RestStarted(until);
        }

        // len < max_activations <= capacity, so push cannot fail.
        let _ = self.history.push(now_ms);
        Gate::Allowed
    }

    /// Activations recorded within the trailing window ending at `now_ms`.
    pub fn activations_in_window(&self, now_ms: u64) -> usize {
        let cutoff = now_ms.saturating_sub(self.window_ms);
        self.history.iter().filter(|t| **t > cutoff).count()
    }

    /// End of the current rest period, if one is running at `now_ms`.
    pub fn resting_until(&self, now_ms: u64) -> Option<u64> {
        self.rest_until.filter(|until| now_ms < *until)
    }

    fn prune(&mut self, now_ms: u64) {
        let cutoff = now_ms.saturating_sub(self.window_ms);
        self.history.retain(|t| *t > cutoff);
    }
}

// ───────────────────────────────────────────────────────────────
// Pump cooldown
// ───────────────────────────────────────────────────────────────

/// Next-eligible instant for the water pump.
#[derive(Debug, Clone)]
pub struct PumpCooldown {
    cooldown_ms: u64,
    next_eligible: Option<u64>,
}

impl PumpCooldown {
    pub fn new(cooldown_secs: u32) -> Self {
        Self {
            cooldown_ms: u64::from(cooldown_secs) * 1000,
            next_eligible: None,
        }
    }

    /// Ask to switch the pump ON at `now_ms`. On success the cooldown
    /// restarts from `now_ms`.
    pub fn try_activate(&mut self, now_ms: u64) -> Gate {
        if let Some(until) = self.next_eligible {
            if now_ms < until {
                return Gate::Blocked(until);
            }
        }
        let until = now_ms.saturating_add(self.cooldown_ms);
        self.next_eligible = Some(until);
        info!("Pump: activation allowed, next eligible at {}", until);
        Gate::Allowed
    }

    /// Record an activation that did not ask the gate (operator command).
    /// The cooldown restarts from `now_ms` even if one was running.
    /// Returns the next eligible instant.
    pub fn record_activation(&mut self, now_ms: u64) -> u64 {
        let until = now_ms.saturating_add(self.cooldown_ms);
        self.next_eligible = Some(until);
        info!("Pump: operator activation, next eligible at {}", until);
        until
    }

    /// End of the running cooldown, if any.
    pub fn cooling_until(&self, now_ms: u64) -> Option<u64> {
        self.next_eligible.filter(|until| now_ms < *until)
    }
}
