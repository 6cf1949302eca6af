//! Wall-clock scheduler.
//!
//! Drives every periodic job of the controller. The scheduler notifies a
//! [`SchedulerDelegate`] when schedules fire; the host loop implements the
//! delegate and forwards each [`Job`] to the control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      Trigger Sources                       │
//! │                                                            │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐    │
//! │  │ Control tick │   │ Photo capture│   │ Light reset  │    │
//! │  │  (interval)  │   │  (interval)  │   │  (daily at)  │    │
//! │  └──────┬───────┘   └──────┬───────┘   └──────┬───────┘    │
//! │         ▼                  ▼                  ▼            │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │                 SchedulerDelegate                    │  │
//! │  └─────────────────────────┬────────────────────────────┘  │
//! │                            ▼                               │
//! │                  ControlLoop::run_job()                    │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Poll it as often as you like; each schedule fires at most once per poll
//! and a late poll never replays a backlog.

use chrono::{DateTime, Duration, FixedOffset, Offset, TimeZone, Utc};
use log::{debug, info};

use crate::app::ports::{Job, SchedulerDelegate};
use crate::config::ControlConfig;

// ═══════════════════════════════════════════════════════════════
//  Schedule types
// ═══════════════════════════════════════════════════════════════

/// A single schedule entry.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Human-readable label (e.g., "control-tick").
    pub label: &'static str,
    pub kind: ScheduleKind,
    /// What to run when it fires.
    pub job: Job,
    pub enabled: bool,
}

/// When a schedule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    /// Every `every_secs` seconds. The first run is on the first poll when
    /// `fire_at_start` is set, one full period later otherwise.
    Interval { every_secs: u32, fire_at_start: bool },
    /// Once a day at `hour:minute` local time.
    DailyAt { hour: u8, minute: u8 },
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Maximum number of concurrent schedules (stack-allocated).
const MAX_SCHEDULES: usize = 4;

const MS_PER_SEC: u64 = 1_000;

/// The scheduler engine.
///
/// Knows nothing about sensors or actuators: firing means calling the
/// delegate, and the delegate decides what that does.
pub struct Scheduler {
    schedules: [Option<ScheduleEntry>; MAX_SCHEDULES],
    /// Offset used to place daily schedules on the local clock.
    offset: FixedOffset,
    enabled: bool,
}

#[derive(Debug, Clone)]
struct ScheduleEntry {
    schedule: Schedule,
    /// `None` until the first poll.
    next_due_ms: Option<u64>,
}

impl Scheduler {
    /// Empty scheduler. Out-of-range offsets fall back to UTC.
    pub fn new(utc_offset_minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix());
        Self {
            schedules: [None, None, None, None],
            offset,
            enabled: true,
        }
    }

    /// The standard job set for a controller configuration.
    pub fn from_config(config: &ControlConfig) -> Self {
        let mut sched = Self::new(config.utc_offset_minutes);
        sched.add(Schedule {
            label: "control-tick",
            kind: ScheduleKind::Interval {
                every_secs: config.tick_interval_secs,
                fire_at_start: true,
            },
            job: Job::ControlTick,
            enabled: true,
        });
        sched.add(Schedule {
            label: "daily-light-reset",
            kind: ScheduleKind::DailyAt {
                hour: config.light_reset_hour,
                minute: config.light_reset_minute,
            },
            job: Job::DailyLightReset,
            enabled: true,
        });
        sched.add(Schedule {
            label: "photo-capture",
            kind: ScheduleKind::Interval {
                every_secs: config.photo_capture_interval_secs,
                fire_at_start: false,
            },
            job: Job::PhotoCapture,
            enabled: config.photo_capture_interval_secs > 0,
        });
        sched
    }

    /// Add a schedule.  Returns the slot index, or `None` if full.
    pub fn add(&mut self, schedule: Schedule) -> Option<usize> {
        let (i, slot) = self
            .schedules
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())?;
        info!("Scheduler: added '{}' ({:?}) at slot {}", schedule.label, schedule.kind, i);
        *slot = Some(ScheduleEntry {
            schedule,
            next_due_ms: None,
        });
        Some(i)
    }

    /// Remove a schedule by slot index.
    pub fn remove(&mut self, slot: usize) {
        if let Some(entry) = self.schedules.get_mut(slot).and_then(Option::take) {
            info!("Scheduler: removed '{}' from slot {}", entry.schedule.label, slot);
        }
    }

    /// Enable or disable the entire scheduler.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Fire every schedule that is due at `now_ms`.
    pub fn poll(&mut self, now_ms: u64, delegate: &mut dyn SchedulerDelegate) {
        if !self.enabled {
            return;
        }

        for entry in self.schedules.iter_mut().flatten() {
            if !entry.schedule.enabled {
                continue;
            }

            let due = match entry.next_due_ms {
                Some(due) => due,
                None => {
                    let first = match entry.schedule.kind {
                        ScheduleKind::Interval {
                            fire_at_start: true, ..
                        } => now_ms,
                        ScheduleKind::Interval { every_secs, .. } => {
                            now_ms + u64::from(every_secs).max(1) * MS_PER_SEC
                        }
                        ScheduleKind::DailyAt { hour, minute } => {
                            next_daily(now_ms, hour, minute, self.offset)
                        }
                    };
                    entry.next_due_ms = Some(first);
                    first
                }
            };

            if now_ms < due {
                continue;
            }

            debug!("Scheduler: '{}' fired at {}", entry.schedule.label, now_ms);
            delegate.on_schedule_fired(entry.schedule.label, entry.schedule.job);

            // Rebased on now, so a late poll does not replay missed slots.
            entry.next_due_ms = Some(match entry.schedule.kind {
                ScheduleKind::Interval { every_secs, .. } => {
                    now_ms + u64::from(every_secs).max(1) * MS_PER_SEC
                }
                ScheduleKind::DailyAt { hour, minute } => {
                    next_daily(now_ms + 1, hour, minute, self.offset)
                }
            });
        }
    }

    /// When the schedule in `slot` fires next, once it has been polled.
    pub fn next_due(&self, slot: usize) -> Option<u64> {
        self.schedules.get(slot)?.as_ref()?.next_due_ms
    }

    /// Number of active (enabled) schedules.
    pub fn active_count(&self) -> usize {
        self.schedules
            .iter()
            .flatten()
            .filter(|e| e.schedule.enabled)
            .count()
    }
}

/// First instant at or after `now_ms` whose local time is `hour:minute`.
fn next_daily(now_ms: u64, hour: u8, minute: u8, offset: FixedOffset) -> u64 {
    let Some(now) = DateTime::<Utc>::from_timestamp_millis(now_ms as i64) else {
        return now_ms;
    };
    let local = now.with_timezone(&offset);
    let Some(at) = local
        .date_naive()
        .and_hms_opt(u32::from(hour), u32::from(minute), 0)
        .and_then(|naive| offset.from_local_datetime(&naive).single())
    else {
        return now_ms;
    };
    let at = if at < local { at + Duration::days(1) } else { at };
    at.timestamp_millis().max(0) as u64
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
