//! Settings persistence port and the shared settings store.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::settings::{Settings, SettingsPatch, TimerSettings};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settings i/o failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("settings blob is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("settings backend lock poisoned")]
    Poisoned,
}

/// Where the settings blob lives.
pub trait SettingsPersistence: Send + Sync + 'static {
    /// `Ok(None)` means nothing has been saved yet.
    fn load(&self) -> Result<Option<Settings>, StoreError>;
    fn save(&self, settings: &Settings) -> Result<(), StoreError>;
}

/// One JSON file, replaced whole on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SettingsPersistence for JsonFileStore {
    fn load(&self) -> Result<Option<Settings>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_err(err)),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        let blob = serde_json::to_string_pretty(settings)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, blob).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// Keeps the raw blob in memory, mirroring browser local storage.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    blob: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Arc::new(Mutex::new(Some(blob.into()))),
        }
    }

    pub fn blob(&self) -> Option<String> {
        self.blob.lock().ok().and_then(|b| b.clone())
    }
}

impl SettingsPersistence for MemoryStore {
    fn load(&self) -> Result<Option<Settings>, StoreError> {
        let guard = self.blob.lock().map_err(|_| StoreError::Poisoned)?;
        match guard.as_deref() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        let blob = serde_json::to_string(settings)?;
        let mut guard = self.blob.lock().map_err(|_| StoreError::Poisoned)?;
        *guard = Some(blob);
        Ok(())
    }
}

/// Single writer, many readers. Engines subscribe instead of reading globals.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<SettingsStoreInner>,
}

struct SettingsStoreInner {
    persistence: Box<dyn SettingsPersistence>,
    tx: watch::Sender<Settings>,
    // Serializes read-modify-write so concurrent updates cannot drop each other.
    write: Mutex<()>,
}

fn load_or_default(persistence: &dyn SettingsPersistence) -> Settings {
    match persistence.load() {
        Ok(Some(settings)) => settings.sanitized(),
        Ok(None) => {
            info!("no saved settings; using defaults");
            Settings::default()
        }
        Err(err) => {
            error!(error = %err, "failed to load saved settings; falling back to defaults");
            Settings::default()
        }
    }
}

impl SettingsStore {
    pub fn open(persistence: impl SettingsPersistence) -> Self {
        let initial = load_or_default(&persistence);
        let (tx, _rx) = watch::channel(initial);
        Self {
            inner: Arc::new(SettingsStoreInner {
                persistence: Box::new(persistence),
                tx,
                write: Mutex::new(()),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.inner.tx.subscribe()
    }

    pub fn current(&self) -> Settings {
        self.inner.tx.borrow().clone()
    }

    pub fn timer(&self) -> TimerSettings {
        self.inner.tx.borrow().timer.clone()
    }

    pub fn rotation_interval_secs(&self) -> u32 {
        self.inner.tx.borrow().slideshow.rotation_interval_secs
    }

    /// Apply `patch`, publish, then persist the whole blob.
    ///
    /// The in-memory update stands even when saving fails; the error is
    /// returned so the caller can surface it.
    pub fn update(&self, patch: SettingsPatch) -> Result<Settings, StoreError> {
        if patch.is_empty() {
            return Ok(self.current());
        }
        let _guard = self.inner.write.lock().map_err(|_| StoreError::Poisoned)?;
        let mut next = self.current();
        patch.apply(&mut next);
        self.publish_and_save(next.sanitized())
    }

    /// Swap in a complete settings value.
    pub fn replace(&self, settings: Settings) -> Result<Settings, StoreError> {
        let _guard = self.inner.write.lock().map_err(|_| StoreError::Poisoned)?;
        self.publish_and_save(settings.sanitized())
    }

    fn publish_and_save(&self, next: Settings) -> Result<Settings, StoreError> {
        let changed = self.inner.tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next.clone();
            true
        });
        if !changed {
            debug!("settings update was a no-op");
            return Ok(next);
        }
        if let Err(err) = self.inner.persistence.save(&next) {
            warn!(error = %err, "settings changed in memory but could not be saved");
            return Err(err);
        }
        Ok(next)
    }

    /// Re-read the persisted blob, e.g. after an external edit.
    ///
    /// Returns whether subscribers saw a change. A malformed blob is reported
    /// and the current settings are kept.
    pub fn reload(&self) -> Result<bool, StoreError> {
        let _guard = self.inner.write.lock().map_err(|_| StoreError::Poisoned)?;
        let Some(loaded) = self.inner.persistence.load()? else {
            return Ok(false);
        };
        let loaded = loaded.sanitized();
        let changed = self.inner.tx.send_if_modified(|current| {
            if *current == loaded {
                return false;
            }
            *current = loaded;
            true
        });
        if changed {
            info!("settings reloaded from storage");
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hms::Hms;

    #[test]
    fn malformed_blob_falls_back_to_defaults() {
        let store = SettingsStore::open(MemoryStore::with_blob("{not json"));
        assert_eq!(store.current(), Settings::default());
    }

    #[test]
    fn update_persists_whole_blob() {
        let backend = MemoryStore::new();
        let store = SettingsStore::open(backend.clone());
        store
            .update(SettingsPatch {
                timer_duration: Some(Hms::new(0, 0, 90)),
                ..SettingsPatch::default()
            })
            .unwrap();
        let saved: Settings = serde_json::from_str(&backend.blob().unwrap()).unwrap();
        assert_eq!(saved.timer.duration, Hms::new(0, 1, 30));
        assert_eq!(store.timer().duration, Hms::new(0, 1, 30));
    }

    #[test]
    fn noop_update_does_not_notify() {
        let store = SettingsStore::open(MemoryStore::new());
        let mut rx = store.subscribe();
        rx.mark_unchanged();
        store.update(SettingsPatch::default()).unwrap();
        assert!(!rx.has_changed().unwrap());
        store
            .update(SettingsPatch {
                rotation_interval_secs: Some(60),
                ..SettingsPatch::default()
            })
            .unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().slideshow.rotation_interval_secs, 60);
    }
}
