//! Cache backends for normalized schedules.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::model::{CacheEntry, NormalizedSchedule, ZoneId};
use crate::ports::{CacheError, CachePort};

/// Durable cache keeping one JSON document per zone.
///
/// Writes go to a sibling temp file which is then renamed over the entry, so
/// readers see either the previous entry or the new one. Unreadable files are
/// reported as absent and get replaced by the next successful `put`.
pub struct FileCache {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileCache {
    /// Open (and create if needed) a cache rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] when the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, clock })
    }

    fn path_for(&self, zone: &ZoneId) -> PathBuf {
        self.dir.join(format!("collections_{}.json", file_key(zone)))
    }
}

/// Reversible file-name form of a zone id: ASCII alphanumerics and `-` are
/// kept, every other byte becomes `%XX`.
fn file_key(zone: &ZoneId) -> String {
    zone.0
        .bytes()
        .map(|byte| {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                char::from(byte).to_string()
            } else {
                format!("%{byte:02X}")
            }
        })
        .collect()
}

impl CachePort for FileCache {
    fn get(&self, zone: &ZoneId) -> Option<CacheEntry> {
        let path = self.path_for(zone);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("Could not read cache file {}: {err}", path.display());
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&contents) {
            Ok(entry) if &entry.zone == zone => Some(entry),
            Ok(entry) => {
                warn!(
                    "Cache file {} belongs to zone {}, ignoring",
                    path.display(),
                    entry.zone
                );
                None
            }
            Err(err) => {
                warn!("Could not load cached data from {}: {err}", path.display());
                None
            }
        }
    }

    fn put(&self, zone: &ZoneId, schedule: NormalizedSchedule) -> Result<CacheEntry, CacheError> {
        let entry = CacheEntry {
            zone: zone.clone(),
            schedule,
            stored_at: self.clock.now(),
        };

        let path = self.path_for(zone);
        let tmp_path = path.with_extension("json.tmp");
        let encoded = serde_json::to_vec_pretty(&entry)?;

        fs::write(&tmp_path, encoded)?;
        if let Err(err) = fs::rename(&tmp_path, &path) {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                debug!("Could not remove {}: {cleanup}", tmp_path.display());
            }
            return Err(err.into());
        }

        debug!(zone = %zone, "Data cached successfully");
        Ok(entry)
    }
}

/// Process-local cache, for tests and hosts without a data directory.
pub struct MemoryCache {
    entries: RwLock<HashMap<ZoneId, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    /// Create an empty cache stamping entries with `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Insert an entry as-is, keeping its `stored_at`.
    pub fn seed(&self, entry: CacheEntry) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry.zone.clone(), entry);
    }
}

impl CachePort for MemoryCache {
    fn get(&self, zone: &ZoneId) -> Option<CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(zone)
            .cloned()
    }

    fn put(&self, zone: &ZoneId, schedule: NormalizedSchedule) -> Result<CacheEntry, CacheError> {
        let entry = CacheEntry {
            zone: zone.clone(),
            schedule,
            stored_at: self.clock.now(),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(zone.clone(), entry.clone());
        Ok(entry)
    }
}
