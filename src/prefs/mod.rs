// src/prefs/mod.rs
//! Durable key/value preferences.
//!
//! Keys are namespaced under `healthsync:`. Writes are independent; there is
//! no transaction across keys.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::metric::{MetricCatalog, MetricDescriptor, MetricKind};
use crate::scheduler::{SyncCadence, SyncTime};

pub const KEY_PREFIX: &str = "healthsync:";
pub const SYNC_CADENCE_KEY: &str = "syncInterval";
pub const SYNC_TIME_KEY: &str = "syncTime";
pub const LAST_SYNCED_KEY: &str = "lastSyncedTime";
pub const LAST_ATTEMPT_KEY: &str = "lastSyncAttemptTime";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("preference file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no configuration directory available on this system")]
    NoConfigDir,
    #[error("preference store lock poisoned")]
    Poisoned,
}

pub fn namespaced(key: &str) -> String {
    format!("{}{}", KEY_PREFIX, key)
}

/// Key/value store for JSON values and raw strings.
pub trait PreferenceStore: Send + Sync {
    fn save_value(&self, key: &str, value: Value) -> Result<(), PreferenceError>;

    fn load_value(&self, key: &str) -> Result<Option<Value>, PreferenceError>;

    fn remove(&self, key: &str) -> Result<(), PreferenceError>;

    fn save_string(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.save_value(key, Value::String(value.to_string()))
    }

    fn load_string(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self
            .load_value(key)?
            .and_then(|v| v.as_str().map(str::to_string)))
    }
}

impl<T: PreferenceStore + ?Sized> PreferenceStore for std::sync::Arc<T> {
    fn save_value(&self, key: &str, value: Value) -> Result<(), PreferenceError> {
        (**self).save_value(key, value)
    }

    fn load_value(&self, key: &str) -> Result<Option<Value>, PreferenceError> {
        (**self).load_value(key)
    }

    fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        (**self).remove(key)
    }
}

/// In-process store, used by tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn save_value(&self, key: &str, value: Value) -> Result<(), PreferenceError> {
        let mut values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        values.insert(namespaced(key), value);
        Ok(())
    }

    fn load_value(&self, key: &str) -> Result<Option<Value>, PreferenceError> {
        let values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        Ok(values.get(&namespaced(key)).cloned())
    }

    fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        let mut values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        values.remove(&namespaced(key));
        Ok(())
    }
}

/// JSON object persisted to a single file, rewritten on every save.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FilePreferences {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `<config dir>/healthsync/preferences.json`
    pub fn default_path() -> Result<PathBuf, PreferenceError> {
        dirs::config_dir()
            .map(|dir| dir.join("healthsync").join("preferences.json"))
            .ok_or(PreferenceError::NoConfigDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, PreferenceError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(Map::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(source) => Err(PreferenceError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_all(&self, values: &Map<String, Value>) -> Result<(), PreferenceError> {
        let io_err = |source| PreferenceError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, content).map_err(io_err)?;
        debug!(path = %self.path.display(), keys = values.len(), "preferences written");
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut Map<String, Value>)) -> Result<(), PreferenceError> {
        let _guard = self.lock.lock().map_err(|_| PreferenceError::Poisoned)?;
        let mut values = self.read_all()?;
        f(&mut values);
        self.write_all(&values)
    }
}

impl PreferenceStore for FilePreferences {
    fn save_value(&self, key: &str, value: Value) -> Result<(), PreferenceError> {
        self.update(|values| {
            values.insert(namespaced(key), value);
        })
    }

    fn load_value(&self, key: &str) -> Result<Option<Value>, PreferenceError> {
        let _guard = self.lock.lock().map_err(|_| PreferenceError::Poisoned)?;
        Ok(self.read_all()?.remove(&namespaced(key)))
    }

    fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        self.update(|values| {
            values.remove(&namespaced(key));
        })
    }
}

fn load_timestamp<P: PreferenceStore + ?Sized>(prefs: &P, key: &str) -> Option<DateTime<FixedOffset>> {
    match prefs.load_string(key) {
        Ok(raw) => raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()),
        Err(e) => {
            warn!(%key, error = %e, "failed to load timestamp");
            None
        }
    }
}

fn save_timestamp<P: PreferenceStore + ?Sized>(prefs: &P, key: &str, at: DateTime<FixedOffset>) {
    if let Err(e) = prefs.save_string(key, &at.to_rfc3339()) {
        warn!(%key, error = %e, "failed to save timestamp");
    }
}

/// Typed accessors for the settings the engine reads. Loads fall back to
/// defaults and saves log failures instead of returning them.
pub trait SyncPreferences: PreferenceStore {
    fn load_sync_cadence(&self) -> SyncCadence {
        match self.load_string(SYNC_CADENCE_KEY) {
            Ok(Some(token)) => token.parse().unwrap_or_else(|_| {
                warn!(%token, "unknown sync cadence, using default");
                SyncCadence::default()
            }),
            Ok(None) => SyncCadence::default(),
            Err(e) => {
                warn!(error = %e, "failed to load sync cadence");
                SyncCadence::default()
            }
        }
    }

    fn save_sync_cadence(&self, cadence: SyncCadence) {
        if let Err(e) = self.save_string(SYNC_CADENCE_KEY, cadence.token()) {
            warn!(error = %e, "failed to save sync cadence");
        }
    }

    fn load_sync_time(&self) -> SyncTime {
        match self.load_string(SYNC_TIME_KEY) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|_| {
                warn!(%raw, "invalid sync time, using midnight");
                SyncTime::default()
            }),
            Ok(None) => SyncTime::default(),
            Err(e) => {
                warn!(error = %e, "failed to load sync time");
                SyncTime::default()
            }
        }
    }

    fn save_sync_time(&self, time: SyncTime) {
        if let Err(e) = self.save_string(SYNC_TIME_KEY, &time.to_string()) {
            warn!(error = %e, "failed to save sync time");
        }
    }

    /// Time of the last background sync that submitted data.
    fn load_last_synced(&self) -> Option<DateTime<FixedOffset>> {
        load_timestamp(self, LAST_SYNCED_KEY)
    }

    fn save_last_synced(&self, at: DateTime<FixedOffset>) {
        save_timestamp(self, LAST_SYNCED_KEY, at)
    }

    /// Time of the last background sync that read the health store,
    /// whatever its outcome.
    fn load_last_attempt(&self) -> Option<DateTime<FixedOffset>> {
        load_timestamp(self, LAST_ATTEMPT_KEY)
    }

    fn save_last_attempt(&self, at: DateTime<FixedOffset>) {
        save_timestamp(self, LAST_ATTEMPT_KEY, at)
    }

    /// Metrics are disabled until explicitly enabled.
    fn is_metric_enabled(&self, descriptor: &MetricDescriptor) -> bool {
        match self.load_value(descriptor.state_key) {
            Ok(Some(Value::Bool(enabled))) => enabled,
            Ok(Some(Value::String(s))) => s == "true",
            Ok(_) => false,
            Err(e) => {
                warn!(metric = %descriptor.kind, error = %e, "failed to load metric flag");
                false
            }
        }
    }

    fn set_metric_enabled(&self, descriptor: &MetricDescriptor, enabled: bool) {
        if let Err(e) = self.save_value(descriptor.state_key, Value::Bool(enabled)) {
            warn!(metric = %descriptor.kind, error = %e, "failed to save metric flag");
        }
    }

    fn enabled_metrics(&self, catalog: &MetricCatalog) -> Vec<MetricKind> {
        catalog
            .iter()
            .filter(|d| self.is_metric_enabled(d))
            .map(|d| d.kind)
            .collect()
    }
}

impl<T: PreferenceStore + ?Sized> SyncPreferences for T {}
