//! Persistent storage adapters.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`].
//!
//! - [`FileStore`]: one file per `namespace/key` under a data directory.
//!   Writes go to a temporary sibling first and are then renamed over
//!   the target, so a crash leaves either the old or the new blob.
//! - [`MemoryStore`]: in-memory simulation backend for tests and dry runs.
//!
//! Config validation: every field is range-checked before persistence.
//! Namespace isolation: each subsystem uses its own namespace.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::AppConfig;

const CONFIG_NAMESPACE: &str = "hydrocycle";
const CONFIG_KEY: &str = "appcfg";

fn valid_segment(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 64
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn decode_config(bytes: &[u8]) -> Result<AppConfig, ConfigError> {
    let cfg: AppConfig = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
    // A blob that decodes but no longer validates is as good as corrupt.
    cfg.validate().map_err(|_| ConfigError::Corrupted)?;
    Ok(cfg)
}

fn encode_config(config: &AppConfig) -> Result<Vec<u8>, ConfigError> {
    config.validate().map_err(ConfigError::ValidationFailed)?;
    postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)
}

// ═══════════════════════════════════════════════════════════════
//  FileStore
// ═══════════════════════════════════════════════════════════════

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            warn!("FileStore: cannot create {}: {}", root.display(), e);
            StorageError::IoError
        })?;
        info!("FileStore: data directory {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, namespace: &str, key: &str) -> Result<PathBuf, StorageError> {
        if !valid_segment(namespace) || !valid_segment(key) {
            return Err(StorageError::InvalidKey);
        }
        Ok(self.root.join(namespace).join(format!("{key}.bin")))
    }

    fn read_file(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(namespace, key)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound,
            _ => {
                warn!("FileStore: read {} failed: {}", path.display(), e);
                StorageError::IoError
            }
        })
    }

    fn write_file(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(namespace, key)?;
        let dir = self.root.join(namespace);
        let tmp = dir.join(format!(".{key}.bin.tmp"));

        let result = (|| -> std::io::Result<()> {
            fs::create_dir_all(&dir)?;
            let mut f = fs::File::create(&tmp)?;
            f.write_all(data)?;
            f.sync_all()?;
            fs::rename(&tmp, &path)
        })();

        result.map_err(|e| {
            warn!("FileStore: write {} failed: {}", path.display(), e);
            let _ = fs::remove_file(&tmp);
            StorageError::IoError
        })?;
        debug!("FileStore: wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }
}

impl ConfigPort for FileStore {
    fn load(&self) -> Result<AppConfig, ConfigError> {
        match self.read_file(CONFIG_NAMESPACE, CONFIG_KEY) {
            Ok(bytes) => {
                let cfg = decode_config(&bytes)?;
                info!("FileStore: loaded config");
                Ok(cfg)
            }
            Err(StorageError::NotFound) => {
                info!("FileStore: no stored config, using defaults");
                Ok(AppConfig::default())
            }
            Err(_) => Err(ConfigError::IoError),
        }
    }

    fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let bytes = encode_config(config)?;
        self.write_file(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)
            .map_err(|_| ConfigError::IoError)?;
        info!("FileStore: config saved");
        Ok(())
    }
}

impl StoragePort for FileStore {
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.read_file(namespace, key)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.write_file(namespace, key, data)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(namespace, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("FileStore: delete {} failed: {}", path.display(), e);
                Err(StorageError::IoError)
            }
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.path_for(namespace, key)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryStore
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct MemoryStore {
    store: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn composite_key(namespace: &str, key: &str) -> Result<String, StorageError> {
        if !valid_segment(namespace) || !valid_segment(key) {
            return Err(StorageError::InvalidKey);
        }
        Ok(format!("{}::{}", namespace, key))
    }
}

impl ConfigPort for MemoryStore {
    fn load(&self) -> Result<AppConfig, ConfigError> {
        match self.read(CONFIG_NAMESPACE, CONFIG_KEY) {
            Ok(bytes) => decode_config(&bytes),
            Err(StorageError::NotFound) => Ok(AppConfig::default()),
            Err(_) => Err(ConfigError::IoError),
        }
    }

    fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let bytes = encode_config(config)?;
        let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY).map_err(|_| ConfigError::IoError)?;
        self.store.borrow_mut().insert(key, bytes);
        debug!("MemoryStore: config saved (simulation)");
        Ok(())
    }
}

impl StoragePort for MemoryStore {
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let composite = Self::composite_key(namespace, key)?;
        self.store
            .borrow()
            .get(&composite)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let composite = Self::composite_key(namespace, key)?;
        self.store.borrow_mut().insert(composite, data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let composite = Self::composite_key(namespace, key)?;
        self.store.borrow_mut().remove(&composite);
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        Self::composite_key(namespace, key)
            .map(|k| self.store.borrow().contains_key(&k))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.load().unwrap(), AppConfig::default());
    }

    #[test]
    fn config_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let cfg = AppConfig {
            required_duration_ms: 3000,
            cycle_length_days: 30,
            ..AppConfig::default()
        };
        store.save(&cfg).unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.load().unwrap(), cfg);
    }

    #[test]
    fn save_rejects_invalid_config() {
        let store = MemoryStore::new();
        let cfg = AppConfig {
            cycle_length_days: 90,
            ..AppConfig::default()
        };
        assert!(matches!(store.save(&cfg), Err(ConfigError::ValidationFailed(_))));
        assert_eq!(store.load().unwrap(), AppConfig::default());
    }

    #[test]
    fn garbage_config_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.write(CONFIG_NAMESPACE, CONFIG_KEY, &[0xFF; 3]).unwrap();
        assert_eq!(store.load(), Err(ConfigError::Corrupted));
    }

    #[test]
    fn storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.write("test_ns", "greeting", b"hello").unwrap();
        assert!(store.exists("test_ns", "greeting"));
        assert_eq!(store.read("test_ns", "greeting").unwrap(), b"hello");

        store.write("test_ns", "greeting", b"bye").unwrap();
        assert_eq!(store.read("test_ns", "greeting").unwrap(), b"bye");
        assert!(!dir.path().join("test_ns").join(".greeting.bin.tmp").exists());

        store.delete("test_ns", "greeting").unwrap();
        assert!(!store.exists("test_ns", "greeting"));
        store.delete("test_ns", "greeting").unwrap();
    }

    #[test]
    fn storage_read_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.read("ns", "nope"), Err(StorageError::NotFound));
    }

    #[test]
    fn path_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        assert_eq!(
            store.write("..", "escape", b"x"),
            Err(StorageError::InvalidKey)
        );
        assert_eq!(
            store.read("ns", "a/b"),
            Err(StorageError::InvalidKey)
        );
    }

    #[test]
    fn namespace_isolation() {
        let mut mem = MemoryStore::new();
        mem.write("ns_a", "key", b"alpha").unwrap();
        mem.write("ns_b", "key", b"bravo").unwrap();
        assert_eq!(mem.read("ns_a", "key").unwrap(), b"alpha");
        assert_eq!(mem.read("ns_b", "key").unwrap(), b"bravo");
    }
}
