//! Period prediction.
//!
//! The next start is the local date of the last logged start plus the
//! configured cycle length.  Status is counted in whole local days from
//! today; the background check uses plain millisecond arithmetic.

use core::fmt;

use chrono::{Days, NaiveDate, TimeZone};

use crate::records::local_date;

const DAY_MS: u64 = 86_400_000;

/// Where today sits relative to the predicted start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    /// Nothing logged yet.
    NoData,
    DaysUntil(u32),
    ExpectedToday,
    DaysLate(u32),
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "Track your first period"),
            Self::DaysUntil(n) => write!(f, "{} days until next period", n),
            Self::ExpectedToday => write!(f, "Period expected today"),
            Self::DaysLate(n) => write!(f, "{} days late", n),
        }
    }
}

/// Predicted local date of the next start.
pub fn next_expected<Tz: TimeZone>(
    last_start_ms: u64,
    tz: &Tz,
    cycle_length_days: u32,
) -> Option<NaiveDate> {
    local_date(last_start_ms, tz)?.checked_add_days(Days::new(u64::from(cycle_length_days)))
}

/// "Mar 05" style, or "No Data".
pub fn format_next(next: Option<NaiveDate>) -> String {
    match next {
        Some(date) => date.format("%b %d").to_string(),
        None => "No Data".to_string(),
    }
}

pub fn cycle_status<Tz: TimeZone>(
    last_start_ms: Option<u64>,
    today: NaiveDate,
    tz: &Tz,
    cycle_length_days: u32,
) -> CycleStatus {
    let Some(next) = last_start_ms.and_then(|ts| next_expected(ts, tz, cycle_length_days)) else {
        return CycleStatus::NoData;
    };
    let days = (next - today).num_days();
    match days {
        0 => CycleStatus::ExpectedToday,
        d if d > 0 => CycleStatus::DaysUntil(u32::try_from(d).unwrap_or(u32::MAX)),
        d => CycleStatus::DaysLate(u32::try_from(d.unsigned_abs()).unwrap_or(u32::MAX)),
    }
}

/// Whether the background check should post the cycle reminder.
pub fn period_check_due(last_start_ms: u64, now_ms: u64, cycle_length_days: u32) -> bool {
    let cycle_ms = u64::from(cycle_length_days) * DAY_MS;
    now_ms >= last_start_ms.saturating_add(cycle_ms)
}
