//! Scheduler → event queue → notifications, with cycle checks against
//! the period ledger.

use hydrocycle::adapters::file_store::MemoryStore;
use hydrocycle::app::ports::NotifierPort;
use hydrocycle::config::AppConfig;
use hydrocycle::cycle;
use hydrocycle::events::{Event, EventQueue};
use hydrocycle::notify::{CYCLE_NOTIFICATION_ID, HYDRATION_NOTIFICATION_ID, Notification};
use hydrocycle::prefs;
use hydrocycle::records::RecordBook;
use hydrocycle::scheduler::{
    ExistingPolicy, HYDRATION_WORK, PERIOD_CHECK_WORK, QuietHours, Schedule, Scheduler,
};

use crate::mocks::RecordingNotifier;

const DAY_MS: u64 = 86_400_000;
const MAR_10: u64 = 1_710_028_800_000;

struct Runtime {
    sched: Scheduler,
    queue: EventQueue,
    notifier: RecordingNotifier,
    book: RecordBook<MemoryStore>,
    config: AppConfig,
}

impl Runtime {
    fn new() -> Self {
        let config = AppConfig::default();
        let mut sched = Scheduler::new();
        sched.set_quiet_hours(QuietHours::from_config(&config));
        sched.add(Schedule::period_check(&config), ExistingPolicy::Keep);
        Self {
            sched,
            queue: EventQueue::new(),
            notifier: RecordingNotifier::default(),
            book: RecordBook::new(MemoryStore::new()),
            config,
        }
    }

    /// One loop iteration: follow the preference, tick, drain.
    fn step(&mut self, hour: u8, elapsed_secs: u32, now_ms: u64) {
        let wanted = prefs::reminder_enabled(self.book.storage()).unwrap();
        match (wanted, self.sched.contains(HYDRATION_WORK)) {
            (true, false) => {
                self.sched
                    .add(Schedule::hydration(&self.config), ExistingPolicy::Replace);
            }
            (false, true) => {
                self.sched.cancel(HYDRATION_WORK);
            }
            _ => {}
        }

        self.sched.tick(Some(hour), elapsed_secs, &mut self.queue);
        while let Some(event) = self.queue.pop() {
            match event {
                Event::HydrationReminder => self.notifier.notify(&Notification::hydration_reminder()),
                Event::PeriodCheck => {
                    let cycle_days = u32::from(self.config.cycle_length_days);
                    if let Some(last) = self.book.last_period().unwrap() {
                        if cycle::period_check_due(last.timestamp_ms, now_ms, cycle_days) {
                            self.notifier.notify(&Notification::cycle_reminder());
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

#[test]
fn hydration_reminders_follow_preference_and_quiet_hours() {
    let mut rt = Runtime::new();
    rt.step(12, 0, MAR_10);
    assert!(!rt.sched.contains(HYDRATION_WORK));

    prefs::set_reminder_enabled(rt.book.storage_mut(), true).unwrap();
    rt.step(12, 0, MAR_10);
    assert!(rt.sched.contains(HYDRATION_WORK));

    // 30 min initial delay, then every 30 min.
    rt.step(12, 1799, MAR_10);
    assert!(rt.notifier.posted.is_empty());
    rt.step(12, 1, MAR_10);
    rt.step(13, 1800, MAR_10);
    assert_eq!(rt.notifier.ids(), vec![HYDRATION_NOTIFICATION_ID; 2]);

    // 23:00 is quiet.
    rt.step(23, 1800, MAR_10);
    assert_eq!(rt.notifier.posted.len(), 2);

    prefs::set_reminder_enabled(rt.book.storage_mut(), false).unwrap();
    rt.step(12, 1800, MAR_10);
    assert!(!rt.sched.contains(HYDRATION_WORK));
    assert_eq!(rt.notifier.posted.len(), 2);
}

#[test]
fn cycle_reminder_posts_once_cycle_has_elapsed() {
    let mut rt = Runtime::new();
    rt.book.log_period_start(MAR_10).unwrap();

    // First check runs immediately; 27 days in, not yet due.
    rt.step(3, 0, MAR_10 + 27 * DAY_MS);
    assert!(rt.notifier.posted.is_empty());

    // Six hours later, a day past the cycle length, even at night.
    rt.step(3, 6 * 3600, MAR_10 + 29 * DAY_MS);
    assert_eq!(rt.notifier.ids(), vec![CYCLE_NOTIFICATION_ID]);
}

#[test]
fn no_period_records_means_no_cycle_reminder() {
    let mut rt = Runtime::new();
    for _ in 0..8 {
        rt.step(12, 6 * 3600, MAR_10 + 60 * DAY_MS);
    }
    assert!(rt.notifier.posted.is_empty());
}

#[test]
fn keep_policy_does_not_restart_period_check() {
    let mut rt = Runtime::new();
    rt.step(12, 0, MAR_10);
    rt.step(12, 5 * 3600, MAR_10);
    let config = rt.config.clone();
    rt.sched
        .add(Schedule::period_check(&config), ExistingPolicy::Keep);
    assert!(rt.sched.contains(PERIOD_CHECK_WORK));

    rt.book.log_period_start(MAR_10).unwrap();
    rt.step(12, 3600, MAR_10 + 40 * DAY_MS);
    assert_eq!(rt.notifier.ids(), vec![CYCLE_NOTIFICATION_ID]);
}
