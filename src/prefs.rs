//! Persisted user preferences.
//!
//! Stored as single-byte flags in the `prefs` namespace.  A missing key
//! reads as the default.

use crate::app::ports::{StorageError, StoragePort};

const PREFS_NAMESPACE: &str = "prefs";
const REMINDER_ENABLED_KEY: &str = "reminder_enabled";

/// Whether periodic hydration reminders are switched on.  Defaults to off.
pub fn reminder_enabled<S: StoragePort>(storage: &S) -> Result<bool, StorageError> {
    match storage.read(PREFS_NAMESPACE, REMINDER_ENABLED_KEY) {
        Ok(bytes) => Ok(bytes.first().copied().unwrap_or(0) != 0),
        Err(StorageError::NotFound) => Ok(false),
        Err(e) => Err(e),
    }
}

pub fn set_reminder_enabled<S: StoragePort>(
    storage: &mut S,
    enabled: bool,
) -> Result<(), StorageError> {
    storage.write(PREFS_NAMESPACE, REMINDER_ENABLED_KEY, &[u8::from(enabled)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_store::{FileStore, MemoryStore};

    #[test]
    fn reminders_default_off() {
        let store = MemoryStore::new();
        assert!(!reminder_enabled(&store).unwrap());
    }

    #[test]
    fn toggle_persists() {
        let mut store = MemoryStore::new();
        set_reminder_enabled(&mut store, true).unwrap();
        assert!(reminder_enabled(&store).unwrap());
        set_reminder_enabled(&mut store, false).unwrap();
        assert!(!reminder_enabled(&store).unwrap());
    }

    #[test]
    fn unreadable_preference_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        std::fs::create_dir_all(dir.path().join(PREFS_NAMESPACE).join("reminder_enabled.bin"))
            .unwrap();
        assert_eq!(reminder_enabled(&store), Err(StorageError::IoError));
    }
}
