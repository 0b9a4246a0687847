//! Intake and period ledgers.
//!
//! Each ledger is a single postcard blob in the `records` namespace of a
//! [`StoragePort`].  Every append rewrites the blob; the storage layer
//! makes that write atomic.
//!
//! Day boundaries are local time.  Callers pass the time zone so the
//! same book can be queried under `chrono::Local` at runtime and a
//! fixed offset in tests.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, TimeZone};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::app::ports::{StorageError, StoragePort};
use crate::error::{Error, Result};

const RECORDS_NAMESPACE: &str = "records";
const INTAKE_KEY: &str = "intake";
const PERIOD_KEY: &str = "period";

// ═══════════════════════════════════════════════════════════════
//  Record types
// ═══════════════════════════════════════════════════════════════

/// One verified glass of water.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub id: u64,
    /// Unix epoch milliseconds.
    pub timestamp_ms: u64,
}

/// One logged cycle start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRecord {
    pub id: u64,
    /// Unix epoch milliseconds.
    pub timestamp_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Ledger<T> {
    next_id: u64,
    records: Vec<T>,
}

// ═══════════════════════════════════════════════════════════════
//  Time helpers
// ═══════════════════════════════════════════════════════════════

/// Local calendar date of an epoch-millisecond timestamp.
pub fn local_date<Tz: TimeZone>(timestamp_ms: u64, tz: &Tz) -> Option<NaiveDate> {
    let ms = i64::try_from(timestamp_ms).ok()?;
    tz.timestamp_millis_opt(ms)
        .earliest()
        .map(|dt| dt.date_naive())
}

/// Epoch milliseconds of local midnight starting `date`.
pub fn start_of_day_ms<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<u64> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    let local = tz.from_local_datetime(&midnight).earliest()?;
    u64::try_from(local.timestamp_millis()).ok()
}

// ═══════════════════════════════════════════════════════════════
//  RecordBook
// ═══════════════════════════════════════════════════════════════

/// Both ledgers over one storage backend.
pub struct RecordBook<S: StoragePort> {
    storage: S,
}

impl<S: StoragePort> RecordBook<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    // ── Intake ────────────────────────────────────────────────

    /// Append an intake record and return it.
    pub fn log_intake(&mut self, timestamp_ms: u64) -> Result<IntakeRecord> {
        let mut ledger: Ledger<IntakeRecord> = self.load(INTAKE_KEY, "intake ledger")?;
        let record = IntakeRecord {
            id: next_id(&mut ledger),
            timestamp_ms,
        };
        ledger.records.push(record);
        self.store(INTAKE_KEY, &ledger)?;
        info!("Records: intake #{} at {}", record.id, timestamp_ms);
        Ok(record)
    }

    /// All intake records, newest first.
    pub fn intake_records(&self) -> Result<Vec<IntakeRecord>> {
        let ledger: Ledger<IntakeRecord> = self.load(INTAKE_KEY, "intake ledger")?;
        let mut records = ledger.records;
        records.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    /// Number of intakes at or after `start_ms`.
    pub fn intake_count_since(&self, start_ms: u64) -> Result<usize> {
        let ledger: Ledger<IntakeRecord> = self.load(INTAKE_KEY, "intake ledger")?;
        Ok(ledger
            .records
            .iter()
            .filter(|r| r.timestamp_ms >= start_ms)
            .count())
    }

    /// Number of intakes since local midnight of `today`.
    pub fn intake_today<Tz: TimeZone>(&self, today: NaiveDate, tz: &Tz) -> Result<usize> {
        match start_of_day_ms(today, tz) {
            Some(start) => self.intake_count_since(start),
            None => Ok(0),
        }
    }

    /// Intake records grouped by local date; each day newest first.
    pub fn intake_by_date<Tz: TimeZone>(
        &self,
        tz: &Tz,
    ) -> Result<BTreeMap<NaiveDate, Vec<IntakeRecord>>> {
        let mut by_date: BTreeMap<NaiveDate, Vec<IntakeRecord>> = BTreeMap::new();
        for record in self.intake_records()? {
            if let Some(date) = local_date(record.timestamp_ms, tz) {
                by_date.entry(date).or_default().push(record);
            }
        }
        Ok(by_date)
    }

    // ── Period ────────────────────────────────────────────────

    /// Append a period-start record and return it.
    pub fn log_period_start(&mut self, timestamp_ms: u64) -> Result<PeriodRecord> {
        let mut ledger: Ledger<PeriodRecord> = self.load(PERIOD_KEY, "period ledger")?;
        let record = PeriodRecord {
            id: next_id(&mut ledger),
            timestamp_ms,
        };
        ledger.records.push(record);
        self.store(PERIOD_KEY, &ledger)?;
        info!("Records: period start #{} at {}", record.id, timestamp_ms);
        Ok(record)
    }

    /// All period records, newest first.
    pub fn period_records(&self) -> Result<Vec<PeriodRecord>> {
        let ledger: Ledger<PeriodRecord> = self.load(PERIOD_KEY, "period ledger")?;
        let mut records = ledger.records;
        records.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    /// The most recent period start, if any.
    pub fn last_period(&self) -> Result<Option<PeriodRecord>> {
        Ok(self.period_records()?.into_iter().next())
    }

    /// Local dates that have a logged period start.
    pub fn period_dates<Tz: TimeZone>(&self, tz: &Tz) -> Result<BTreeSet<NaiveDate>> {
        Ok(self
            .period_records()?
            .iter()
            .filter_map(|r| local_date(r.timestamp_ms, tz))
            .collect())
    }

    // ── Internal ──────────────────────────────────────────────

    fn load<T>(&self, key: &str, what: &'static str) -> Result<Ledger<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        match self.storage.read(RECORDS_NAMESPACE, key) {
            Ok(bytes) => postcard::from_bytes(&bytes).map_err(|_| Error::Corrupted(what)),
            Err(StorageError::NotFound) => {
                debug!("Records: no {} yet", what);
                Ok(Ledger {
                    next_id: 1,
                    records: Vec::new(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn store<T: Serialize>(&mut self, key: &str, ledger: &Ledger<T>) -> Result<()> {
        let bytes = postcard::to_allocvec(ledger).map_err(|_| Error::Corrupted("ledger encode"))?;
        self.storage.write(RECORDS_NAMESPACE, key, &bytes)?;
        Ok(())
    }
}

fn next_id<T>(ledger: &mut Ledger<T>) -> u64 {
    let id = ledger.next_id.max(1);
    ledger.next_id = id + 1;
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_store::MemoryStore;
    use chrono::FixedOffset;

    const HOUR: u64 = 3_600_000;
    // 2024-03-10T00:00:00Z
    const MAR_10: u64 = 1_710_028_800_000;

    fn book() -> RecordBook<MemoryStore> {
        RecordBook::new(MemoryStore::new())
    }

    #[test]
    fn ids_start_at_one_and_increment() {
        let mut b = book();
        assert_eq!(b.log_intake(10).unwrap().id, 1);
        assert_eq!(b.log_intake(20).unwrap().id, 2);
        assert_eq!(b.log_period_start(30).unwrap().id, 1);
    }

    #[test]
    fn records_are_newest_first() {
        let mut b = book();
        b.log_intake(300).unwrap();
        b.log_intake(100).unwrap();
        b.log_intake(200).unwrap();
        let ts: Vec<u64> = b.intake_records().unwrap().iter().map(|r| r.timestamp_ms).collect();
        assert_eq!(ts, vec![300, 200, 100]);
    }

    #[test]
    fn empty_book_has_no_last_period() {
        let b = book();
        assert_eq!(b.last_period().unwrap(), None);
        assert!(b.intake_records().unwrap().is_empty());
    }

    #[test]
    fn last_period_is_latest_timestamp() {
        let mut b = book();
        b.log_period_start(MAR_10).unwrap();
        b.log_period_start(MAR_10 - 28 * 24 * HOUR).unwrap();
        assert_eq!(b.last_period().unwrap().unwrap().timestamp_ms, MAR_10);
    }

    #[test]
    fn today_counts_from_local_midnight() {
        let mut b = book();
        let utc = FixedOffset::east_opt(0).unwrap();
        b.log_intake(MAR_10 - 1).unwrap();
        b.log_intake(MAR_10).unwrap();
        b.log_intake(MAR_10 + 5 * HOUR).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(b.intake_today(today, &utc).unwrap(), 2);
    }

    #[test]
    fn grouping_respects_time_zone() {
        let mut b = book();
        // 23:00Z on Mar 9 is Mar 10 in UTC+2.
        b.log_intake(MAR_10 - HOUR).unwrap();
        let plus2 = FixedOffset::east_opt(2 * 3600).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();

        let local = b.intake_by_date(&plus2).unwrap();
        assert!(local.contains_key(&NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()));
        let zulu = b.intake_by_date(&utc).unwrap();
        assert!(zulu.contains_key(&NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()));
    }

    #[test]
    fn period_dates_collects_local_days() {
        let mut b = book();
        let utc = FixedOffset::east_opt(0).unwrap();
        b.log_period_start(MAR_10 + HOUR).unwrap();
        b.log_period_start(MAR_10 + 2 * HOUR).unwrap();
        let dates = b.period_dates(&utc).unwrap();
        assert_eq!(dates.len(), 1);
    }

    #[test]
    fn ledgers_persist_across_books() {
        let mut b = book();
        b.log_intake(1).unwrap();
        let store = b.into_inner();
        let mut b2 = RecordBook::new(store);
        assert_eq!(b2.log_intake(2).unwrap().id, 2);
        assert_eq!(b2.intake_records().unwrap().len(), 2);
    }

    #[test]
    fn garbage_blob_is_reported_as_corrupted() {
        let mut store = MemoryStore::new();
        store.write("records", "intake", &[0xFF, 0xFF, 0xFF]).unwrap();
        let b = RecordBook::new(store);
        assert_eq!(
            b.intake_records().unwrap_err(),
            Error::Corrupted("intake ledger")
        );
    }
}
