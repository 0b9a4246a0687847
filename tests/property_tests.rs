//! Property tests for scheduling, cycle arithmetic, the record ledger and
//! the trace parser.

use chrono::{Days, FixedOffset, NaiveDate};
use proptest::prelude::*;

use hydrocycle::adapters::file_store::MemoryStore;
use hydrocycle::adapters::trace::{TraceLine, parse_line};
use hydrocycle::app::ports::{ScheduleFiredKind, SchedulerDelegate};
use hydrocycle::config::AppConfig;
use hydrocycle::cycle::{self, CycleStatus};
use hydrocycle::frame::FrameObservation;
use hydrocycle::pose::{self, ValidityTimer};
use hydrocycle::records::{self, RecordBook};
use hydrocycle::scheduler::{ExistingPolicy, QuietHours, Schedule, Scheduler};

const DAY_MS: u64 = 86_400_000;
/// 2020-01-01 .. 2040-01-01
const EPOCH_RANGE: std::ops::Range<u64> = 1_577_836_800_000..2_208_988_800_000;

#[derive(Default)]
struct Fires {
    periodic: u32,
    suppressed: u32,
}

impl SchedulerDelegate for Fires {
    fn on_schedule_fired(&mut self, _name: &str, kind: ScheduleFiredKind) {
        match kind {
            ScheduleFiredKind::Periodic => self.periodic += 1,
            ScheduleFiredKind::Suppressed => self.suppressed += 1,
        }
    }
}

fn tz() -> FixedOffset {
    FixedOffset::east_opt(5 * 3600 + 1800).unwrap()
}

// ── Scheduling ────────────────────────────────────────────────

proptest! {
    #[test]
    fn quiet_window_covers_expected_hours(start in 0u8..24, end in 0u8..24) {
        prop_assume!(start != end);
        let quiet = QuietHours { start_hour: start, end_hour: end };
        let quiet_count = (0u8..24).filter(|h| quiet.is_quiet(*h)).count();
        let expected = (i32::from(end) - i32::from(start)).rem_euclid(24) as usize;
        prop_assert_eq!(quiet_count, expected);
        prop_assert!(quiet.is_quiet(start));
        prop_assert!(!quiet.is_quiet(end));
    }

    /// One-second ticks: fires land at D, D+I, D+2I, ...
    #[test]
    fn fire_count_matches_delay_and_interval(
        delay in 1u32..200,
        interval in 1u32..200,
        seconds in 0u32..2000,
    ) {
        let mut sched = Scheduler::new();
        let schedule = Schedule {
            name: "water_reminder_work",
            interval_secs: interval,
            initial_delay_secs: delay,
            respect_quiet_hours: true,
            enabled: true,
        };
        sched.add(schedule, ExistingPolicy::Replace);

        let mut fires = Fires::default();
        for _ in 0..seconds {
            sched.tick(None, 1, &mut fires);
        }
        let expected = if seconds >= delay { 1 + (seconds - delay) / interval } else { 0 };
        prop_assert_eq!(fires.periodic, expected);
        prop_assert_eq!(fires.suppressed, 0);
    }

    /// Inside quiet hours every fire is suppressed, none delivered.
    #[test]
    fn quiet_hours_suppress_every_fire(hour in 0u8..24, ticks in 1usize..50) {
        let mut sched = Scheduler::new();
        sched.set_quiet_hours(QuietHours { start_hour: 22, end_hour: 10 });
        let config = AppConfig::default();
        sched.add(Schedule::hydration(&config), ExistingPolicy::Replace);

        let mut fires = Fires::default();
        for _ in 0..ticks {
            sched.tick(Some(hour), 1800, &mut fires);
        }
        let total = fires.periodic + fires.suppressed;
        prop_assert_eq!(total as usize, ticks);
        if (10..22).contains(&hour) {
            prop_assert_eq!(fires.suppressed, 0);
        } else {
            prop_assert_eq!(fires.periodic, 0);
        }
    }
}

// ── Cycle arithmetic ──────────────────────────────────────────

proptest! {
    #[test]
    fn status_agrees_with_prediction(
        last in EPOCH_RANGE,
        offset_days in -90i64..90,
        cycle_days in 21u32..=45,
    ) {
        let tz = tz();
        let next = cycle::next_expected(last, &tz, cycle_days).unwrap();
        let today = if offset_days >= 0 {
            next.checked_sub_days(Days::new(offset_days as u64)).unwrap()
        } else {
            next.checked_add_days(Days::new(offset_days.unsigned_abs())).unwrap()
        };

        let status = cycle::cycle_status(Some(last), today, &tz, cycle_days);
        match offset_days {
            0 => prop_assert_eq!(status, CycleStatus::ExpectedToday),
            d if d > 0 => prop_assert_eq!(status, CycleStatus::DaysUntil(d as u32)),
            d => prop_assert_eq!(status, CycleStatus::DaysLate(d.unsigned_abs() as u32)),
        }
    }

    #[test]
    fn check_due_exactly_one_cycle_after_start(
        last in EPOCH_RANGE,
        elapsed in 0u64..(60 * DAY_MS),
        cycle_days in 21u32..=45,
    ) {
        let due = cycle::period_check_due(last, last + elapsed, cycle_days);
        prop_assert_eq!(due, elapsed >= u64::from(cycle_days) * DAY_MS);
    }

    #[test]
    fn local_midnight_maps_back_to_same_date(days in 0u64..7300) {
        let tz = tz();
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Days::new(days);
        let ms = records::start_of_day_ms(date, &tz).unwrap();
        prop_assert_eq!(records::local_date(ms, &tz), Some(date));
        prop_assert_eq!(records::local_date(ms + DAY_MS - 1, &tz), Some(date));
    }
}

// ── Ledger ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn ledger_ids_unique_and_listing_newest_first(
        stamps in proptest::collection::vec(EPOCH_RANGE, 1..30),
    ) {
        let mut book = RecordBook::new(MemoryStore::new());
        for ts in &stamps {
            book.log_intake(*ts).unwrap();
        }
        let listed = book.intake_records().unwrap();
        prop_assert_eq!(listed.len(), stamps.len());
        prop_assert!(listed.windows(2).all(|w| w[0].timestamp_ms >= w[1].timestamp_ms));

        let mut ids: Vec<u64> = listed.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), stamps.len());
    }
}

// ── Debounce ──────────────────────────────────────────────────

proptest! {
    /// The held duration never exceeds the time since the first frame
    /// and is only reported while accumulating.
    #[test]
    fn held_time_is_bounded(
        verdicts in proptest::collection::vec(any::<bool>(), 1..100),
        grace in 0u32..1000,
    ) {
        let mut timer = ValidityTimer::new(grace);
        for (i, valid) in verdicts.iter().enumerate() {
            let now = i as u64 * 100;
            timer.observe(*valid, now);
            match timer.held_ms(now) {
                Some(held) => {
                    prop_assert!(timer.is_accumulating());
                    prop_assert!(held <= now);
                }
                None => prop_assert!(!timer.is_accumulating()),
            }
            if *valid {
                prop_assert!(timer.is_accumulating());
            }
        }
    }
}

// ── Trace parser ──────────────────────────────────────────────

fn frame_of(line: TraceLine) -> FrameObservation {
    FrameObservation {
        timestamp_ms: line.timestamp_ms,
        faces: line.faces,
        objects: line.objects,
        image: None,
    }
}

proptest! {
    #[test]
    fn parser_never_panics(line in ".{0,200}") {
        if let Ok(Some(parsed)) = parse_line(&line) {
            let _ = pose::assess(&frame_of(parsed), &AppConfig::default());
        }
    }

    /// Any box the parser accepts can be assessed, whatever its extent.
    #[test]
    fn assess_accepts_any_box_coordinates(
        left in any::<i32>(),
        top in any::<i32>(),
        right in any::<i32>(),
        bottom in any::<i32>(),
    ) {
        let line = format!(
            r#"{{"t":0,"faces":[{{"mouth_bottom":{{"x":0,"y":0}},"head_euler_x":20}}],"objects":[{{"bounding_box":{{"left":{left},"top":{top},"right":{right},"bottom":{bottom}}}}}]}}"#
        );
        let parsed = parse_line(&line).unwrap().unwrap();
        let assessment = pose::assess(&frame_of(parsed), &AppConfig::default());
        prop_assert_eq!(assessment.proximities.len(), 1);
    }

    #[test]
    fn timestamp_survives_parsing(t in any::<u64>(), tilt in -90.0f32..90.0) {
        let line = format!(
            r#"{{"t":{t},"faces":[{{"mouth_bottom":{{"x":1,"y":2}},"head_euler_x":{tilt}}}]}}"#
        );
        let parsed = parse_line(&line).unwrap().unwrap();
        prop_assert_eq!(parsed.timestamp_ms, t);
        prop_assert_eq!(parsed.faces.len(), 1);
    }
}
