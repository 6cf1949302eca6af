//! Time-bounded suspensions of automatic control.
//!
//! Two kinds of override share one mechanism, an expiry instant per slot:
//!
//! - **Manual**: an operator took a module over from the dashboard.
//!   Automatic logic leaves that module alone until the expiry passes or
//!   the override is released.
//! - **Photo**: a capture is in progress. The LED is forced ON so the
//!   accumulated-light controller cannot switch it off mid-shot.
//!
//! LED precedence is manual > photo > automatic.
//!
//! The registry is pure state: callers pass `now_ms` in and do any I/O
//! (logging aside) themselves.

use log::info;

use crate::model::Module;

const MS_PER_MINUTE: u64 = 60_000;

/// In-memory override table.
#[derive(Debug, Default, Clone)]
pub struct OverrideRegistry {
    manual: [Option<u64>; Module::COUNT],
    photo_until: Option<u64>,
}

impl OverrideRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend automatic control of `module` for `minutes`.
    /// Replaces any earlier expiry. Returns the new expiry.
    pub fn enable(&mut self, module: Module, minutes: u32, now_ms: u64) -> u64 {
        let until = now_ms.saturating_add(u64::from(minutes) * MS_PER_MINUTE);
        self.manual[module.index()] = Some(until);
        until
    }

    /// True while `now_ms` is before the stored expiry.
    pub fn is_active(&self, module: Module, now_ms: u64) -> bool {
        self.manual[module.index()].is_some_and(|until| now_ms < until)
    }

    /// Remove the override. Returns `false` if there was none.
    pub fn disable(&mut self, module: Module) -> bool {
        self.manual[module.index()].take().is_some()
    }

    /// Stored expiry for `module`, active or not.
    pub fn expiry(&self, module: Module) -> Option<u64> {
        self.manual[module.index()]
    }

    /// Force the LED on for `minutes`. Returns the new expiry.
    pub fn enable_photo(&mut self, minutes: u32, now_ms: u64) -> u64 {
        let until = now_ms.saturating_add(u64::from(minutes) * MS_PER_MINUTE);
        self.photo_until = Some(until);
        until
    }

    pub fn photo_active(&self, now_ms: u64) -> bool {
        self.photo_until.is_some_and(|until| now_ms < until)
    }

    /// Drop expired entries. Returns the modules whose manual override lapsed.
    pub fn prune(&mut self, now_ms: u64) -> heapless::Vec<Module, { Module::COUNT }> {
        let mut lapsed = heapless::Vec::new();
        for module in Module::ALL {
            let slot = &mut self.manual[module.index()];
            if slot.is_some_and(|until| now_ms >= until) {
                *slot = None;
                info!("Override: {} expired, automatic control resumes", module);
                // Capacity equals Module::COUNT, so this never overflows.
                let _ = lapsed.push(module);
            }
        }
        if self.photo_until.is_some_and(|until| now_ms >= until) {
            self.photo_until = None;
            info!("Override: photo window closed");
        }
        lapsed
    }
}
