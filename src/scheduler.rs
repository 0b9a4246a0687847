//! Periodic reminder scheduler.
//!
//! Runs alongside verification sessions.  The scheduler notifies a
//! [`SchedulerDelegate`] when schedules fire; the runtime loop
//! implements the delegate to push events into the [`EventQueue`].
//!
//! [`EventQueue`]: crate::events::EventQueue
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Schedules (4 slots)                      │
//! │                                                              │
//! │  ┌─────────────────────┐          ┌─────────────────────┐    │
//! │  │ water_reminder_work │          │ period_check_work   │    │
//! │  │ 30 min, quiet-aware │          │ 6 h                 │    │
//! │  └──────────┬──────────┘          └──────────┬──────────┘    │
//! │             │                                │               │
//! │             ▼                                ▼               │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              SchedulerDelegate                         │  │
//! │  │       (runtime loop pushes into Event Queue)           │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::app::ports::{ScheduleFiredKind, SchedulerDelegate};
use crate::config::AppConfig;
use log::{debug, info};

/// Unique name of the hydration reminder schedule.
pub const HYDRATION_WORK: &str = "water_reminder_work";
/// Unique name of the cycle check schedule.
pub const PERIOD_CHECK_WORK: &str = "period_check_work";

// ═══════════════════════════════════════════════════════════════
//  Schedule types
// ═══════════════════════════════════════════════════════════════

/// A single named periodic schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Unique name; a second schedule with the same name is resolved
    /// by [`ExistingPolicy`].
    pub name: &'static str,
    /// Seconds between fires.
    pub interval_secs: u32,
    /// Seconds before the first fire.
    pub initial_delay_secs: u32,
    /// Fires inside quiet hours are swallowed.
    pub respect_quiet_hours: bool,
    /// Whether this schedule is currently enabled.
    pub enabled: bool,
}

impl Schedule {
    /// Hydration reminder: every `hydration_interval_secs` after an
    /// initial delay, silent overnight.
    pub fn hydration(config: &AppConfig) -> Self {
        Self {
            name: HYDRATION_WORK,
            interval_secs: config.hydration_interval_secs,
            initial_delay_secs: config.hydration_initial_delay_secs,
            respect_quiet_hours: true,
            enabled: true,
        }
    }

    /// Cycle check: first run straight away, then every
    /// `period_check_interval_secs`, around the clock.
    pub fn period_check(config: &AppConfig) -> Self {
        Self {
            name: PERIOD_CHECK_WORK,
            interval_secs: config.period_check_interval_secs,
            initial_delay_secs: 0,
            respect_quiet_hours: false,
            enabled: true,
        }
    }
}

/// What to do when a schedule with the same name already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingPolicy {
    /// Drop the running schedule and start the new one from zero.
    Replace,
    /// Leave the running schedule alone.
    Keep,
}

/// Time-of-day restriction (quiet hours).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    /// Start hour (0-23 inclusive).  E.g. 22 = 10 PM.
    pub start_hour: u8,
    /// End hour (0-23, exclusive).  E.g. 10 = 10 AM.
    pub end_hour: u8,
}

impl QuietHours {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            start_hour: config.quiet_start_hour,
            end_hour: config.quiet_end_hour,
        }
    }

    /// Check if the given hour is within quiet hours.
    pub fn is_quiet(&self, hour: u8) -> bool {
        if self.start_hour <= self.end_hour {
            // e.g., 9..17 (daytime quiet)
            hour >= self.start_hour && hour < self.end_hour
        } else {
            // e.g., 22..10 (overnight quiet, wraps around midnight)
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Maximum number of concurrent schedules (stack-allocated).
const MAX_SCHEDULES: usize = 4;

/// The scheduler engine.
///
/// Decoupled from the event system: fires go to the
/// [`SchedulerDelegate`] callback rather than straight into a queue.
pub struct Scheduler {
    schedules: [Option<ScheduleEntry>; MAX_SCHEDULES],
    /// Applies to schedules with `respect_quiet_hours`.
    quiet_hours: Option<QuietHours>,
    /// Global enable flag.
    enabled: bool,
}

/// Internal bookkeeping for a live schedule.
#[derive(Debug, Clone)]
struct ScheduleEntry {
    schedule: Schedule,
    /// Seconds since added or since the last fire.
    elapsed_secs: u64,
    /// Whether the initial delay has been served.
    started: bool,
}

impl ScheduleEntry {
    fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            elapsed_secs: 0,
            started: false,
        }
    }

    fn due_after_secs(&self) -> u64 {
        if self.started {
            u64::from(self.schedule.interval_secs)
        } else {
            u64::from(self.schedule.initial_delay_secs)
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            schedules: [None, None, None, None],
            quiet_hours: None,
            enabled: true,
        }
    }

    /// Add a schedule.  Returns the slot index, or `None` if full.
    pub fn add(&mut self, schedule: Schedule, policy: ExistingPolicy) -> Option<usize> {
        if let Some(slot) = self.slot_of(schedule.name) {
            match policy {
                ExistingPolicy::Keep => {
                    debug!("Scheduler: '{}' already scheduled, keeping", schedule.name);
                }
                ExistingPolicy::Replace => {
                    info!("Scheduler: replaced '{}' at slot {}", schedule.name, slot);
                    self.schedules[slot] = Some(ScheduleEntry::new(schedule));
                }
            }
            return Some(slot);
        }

        for (i, slot) in self.schedules.iter_mut().enumerate() {
            if slot.is_none() {
                info!("Scheduler: added '{}' at slot {}", schedule.name, i);
                *slot = Some(ScheduleEntry::new(schedule));
                return Some(i);
            }
        }
        None // All slots full.
    }

    /// Remove a schedule by name.  Returns whether it existed.
    pub fn cancel(&mut self, name: &str) -> bool {
        match self.slot_of(name) {
            Some(slot) => {
                info!("Scheduler: cancelled '{}' at slot {}", name, slot);
                self.schedules[slot] = None;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slot_of(name).is_some()
    }

    /// Set quiet hours.
    pub fn set_quiet_hours(&mut self, quiet: QuietHours) {
        self.quiet_hours = Some(quiet);
        info!(
            "Scheduler: quiet hours {}:00–{}:00",
            quiet.start_hour, quiet.end_hour
        );
    }

    /// Clear quiet hours.
    pub fn clear_quiet_hours(&mut self) {
        self.quiet_hours = None;
    }

    /// Enable or disable the entire scheduler.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Advance every schedule by `elapsed_secs`.
    ///
    /// * `current_hour`: local hour-of-day (0-23), or `None` if the
    ///   wall clock is unknown.  An unknown hour never suppresses.
    /// * `delegate`: receives fire notifications.  A fire inside quiet
    ///   hours is reported as [`ScheduleFiredKind::Suppressed`] and
    ///   still consumes the interval.
    pub fn tick(
        &mut self,
        current_hour: Option<u8>,
        elapsed_secs: u32,
        delegate: &mut dyn SchedulerDelegate,
    ) {
        if !self.enabled {
            return;
        }

        let is_quiet = current_hour
            .and_then(|h| self.quiet_hours.map(|q| q.is_quiet(h)))
            .unwrap_or(false);

        for slot in self.schedules.iter_mut() {
            let entry = match slot {
                Some(e) if e.schedule.enabled => e,
                _ => continue,
            };

            entry.elapsed_secs += u64::from(elapsed_secs);
            let due = entry.due_after_secs();
            if entry.elapsed_secs < due {
                continue;
            }
            // Overshoot counts toward the next fire, at most one interval's worth.
            let interval = u64::from(entry.schedule.interval_secs).max(1);
            entry.elapsed_secs = (entry.elapsed_secs - due) % interval;
            entry.started = true;

            if is_quiet && entry.schedule.respect_quiet_hours {
                debug!("Scheduler: '{}' due in quiet hours, skipped", entry.schedule.name);
                delegate.on_schedule_fired(entry.schedule.name, ScheduleFiredKind::Suppressed);
            } else {
                info!(
                    "Scheduler: '{}' periodic fire (every {}s)",
                    entry.schedule.name, entry.schedule.interval_secs
                );
                delegate.on_schedule_fired(entry.schedule.name, ScheduleFiredKind::Periodic);
            }
        }
    }

    /// Number of active (enabled) schedules.
    pub fn active_count(&self) -> usize {
        self.schedules
            .iter()
            .filter(|s| s.as_ref().is_some_and(|e| e.schedule.enabled))
            .count()
    }

    fn slot_of(&self, name: &str) -> Option<usize> {
        self.schedules
            .iter()
            .position(|s| s.as_ref().is_some_and(|e| e.schedule.name == name))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
