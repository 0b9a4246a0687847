//! Fuzz target: record ledger decoding
//!
//! Stores arbitrary bytes as the intake and period blobs and asserts the
//! record book reports corruption instead of panicking, and that a fresh
//! append after a reset always succeeds.
//!
//! cargo fuzz run fuzz_record_ledger

#![no_main]

use hydrocycle::adapters::file_store::MemoryStore;
use hydrocycle::app::ports::StoragePort;
use hydrocycle::records::RecordBook;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut store = MemoryStore::new();
    let _ = store.write("records", "intake", data);
    let _ = store.write("records", "period", data);

    let mut book = RecordBook::new(store);
    let _ = book.intake_records();
    let _ = book.period_records();
    let _ = book.last_period();

    let _ = book.storage_mut().delete("records", "intake");
    assert!(book.log_intake(1_700_000_000_000).is_ok());
});
