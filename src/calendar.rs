//! Month grid and per-day detail.
//!
//! [`CalendarData`] snapshots both ledgers grouped by local date once;
//! the month view and day detail are then pure lookups.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate, TimeZone};

use crate::app::ports::StoragePort;
use crate::cycle::next_expected;
use crate::error::Result;
use crate::records::{IntakeRecord, RecordBook};

/// Ledger contents keyed by local date.
#[derive(Debug, Clone, Default)]
pub struct CalendarData {
    intake: BTreeMap<NaiveDate, Vec<IntakeRecord>>,
    period_dates: BTreeSet<NaiveDate>,
    predicted: Option<NaiveDate>,
}

/// One cell of the month grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub intake_count: usize,
    pub period_start: bool,
    pub predicted_start: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    /// Blank cells before the 1st; Sunday = 0.
    pub leading_blanks: u32,
    pub days: Vec<DayCell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayDetail {
    pub date: NaiveDate,
    pub period_started: bool,
    pub predicted_start: bool,
    /// Intake times as "hh:mm AM", newest first.
    pub intake_times: Vec<String>,
}

impl DayDetail {
    pub fn is_empty(&self) -> bool {
        self.intake_times.is_empty() && !self.period_started && !self.predicted_start
    }

    /// Text lines as shown under the calendar.
    pub fn lines(&self) -> Vec<String> {
        if self.is_empty() {
            return vec!["No records for this day.".to_string()];
        }
        let mut out = Vec::new();
        if self.period_started {
            out.push("Period Started".to_string());
        }
        if self.predicted_start {
            out.push("Predicted Period Start".to_string());
        }
        out.extend(self.intake_times.iter().map(|t| format!("Water at {t}")));
        out
    }
}

impl CalendarData {
    pub fn load<S: StoragePort, Tz: TimeZone>(
        book: &RecordBook<S>,
        tz: &Tz,
        cycle_length_days: u32,
    ) -> Result<Self> {
        let predicted = book
            .last_period()?
            .and_then(|p| next_expected(p.timestamp_ms, tz, cycle_length_days));
        Ok(Self {
            intake: book.intake_by_date(tz)?,
            period_dates: book.period_dates(tz)?,
            predicted,
        })
    }

    pub fn predicted_start(&self) -> Option<NaiveDate> {
        self.predicted
    }

    /// The grid for one month.  `None` for an invalid year/month.
    pub fn month_view(&self, year: i32, month: u32) -> Option<MonthView> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let days = first
            .iter_days()
            .take_while(|d| d.month() == month)
            .map(|date| DayCell {
                date,
                intake_count: self.intake.get(&date).map_or(0, Vec::len),
                period_start: self.period_dates.contains(&date),
                predicted_start: self.predicted == Some(date),
            })
            .collect();
        Some(MonthView {
            year,
            month,
            leading_blanks: first.weekday().num_days_from_sunday(),
            days,
        })
    }

    /// Time-formatting needs the zone; records are already grouped.
    pub fn day_detail<Tz: TimeZone>(&self, date: NaiveDate, tz: &Tz) -> DayDetail
    where
        Tz::Offset: core::fmt::Display,
    {
        let intake_times = self
            .intake
            .get(&date)
            .map(|records| {
                records
                    .iter()
                    .filter_map(|r| {
                        let ms = i64::try_from(r.timestamp_ms).ok()?;
                        let dt = tz.timestamp_millis_opt(ms).earliest()?;
                        Some(dt.format("%I:%M %p").to_string())
                    })
                    .collect()
            })
            .unwrap_or_default();
        DayDetail {
            date,
            period_started: self.period_dates.contains(&date),
            predicted_start: self.predicted == Some(date),
            intake_times,
        }
    }
}
