use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

use super::AppConfig;
use crate::error::{Result, TimecodeError};

/// Configuration store backed by a JSON file
///
/// Uses `ArcSwap` for lock-free reads, so the frame loop can look at the
/// configuration on every iteration without contention.
#[derive(Clone)]
pub struct ConfigStore {
    path: PathBuf,
    /// Lock-free cache using ArcSwap for zero-cost reads
    cache: Arc<ArcSwap<AppConfig>>,
    /// Modification time of the file as last read or written
    modified: Arc<Mutex<Option<SystemTime>>>,
}

impl ConfigStore {
    /// Open the store at `path`
    ///
    /// A missing file yields the default configuration; the file is created
    /// on the first `set` or `update`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (config, modified) = match Self::load(&path)? {
            Some(loaded) => loaded,
            None => {
                debug!("No config file at {}, using defaults", path.display());
                (AppConfig::default(), None)
            }
        };

        Ok(Self {
            path,
            cache: Arc::new(ArcSwap::from_pointee(config)),
            modified: Arc::new(Mutex::new(modified)),
        })
    }

    /// Read and parse the file, `None` if it does not exist
    fn load(path: &Path) -> Result<Option<(AppConfig, Option<SystemTime>)>> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let config = serde_json::from_str(&json)
            .map_err(|e| TimecodeError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(Some((config, Self::mtime(path))))
    }

    fn mtime(path: &Path) -> Option<SystemTime> {
        fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    /// Save configuration to the file
    fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, json)?;
        *self.modified.lock() = Self::mtime(&self.path);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get current configuration (lock-free, zero-copy)
    pub fn get(&self) -> Arc<AppConfig> {
        self.cache.load_full()
    }

    /// Set entire configuration
    pub fn set(&self, config: AppConfig) -> Result<()> {
        self.save(&config)?;
        self.cache.store(Arc::new(config));
        Ok(())
    }

    /// Update configuration with a closure
    ///
    /// Read-modify-write; with concurrent updates the last write wins.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut AppConfig),
    {
        let current = self.cache.load();
        let mut config = (**current).clone();
        f(&mut config);

        // Persist first, then swap the cache
        self.save(&config)?;
        self.cache.store(Arc::new(config));
        Ok(())
    }

    /// Re-read the file if it changed since it was last read or written
    ///
    /// Returns the new configuration when it was reloaded. A file that
    /// disappeared leaves the cached configuration in place.
    pub fn reload_if_changed(&self) -> Result<Option<Arc<AppConfig>>> {
        let current = Self::mtime(&self.path);
        {
            let mut modified = self.modified.lock();
            if current.is_none() || current == *modified {
                return Ok(None);
            }
            *modified = current;
        }

        let Some((config, _)) = Self::load(&self.path)? else {
            return Ok(None);
        };
        info!("Reloaded configuration from {}", self.path.display());
        let config = Arc::new(config);
        self.cache.store(config.clone());
        Ok(Some(config))
    }
}
