//! Schedule service combining the fetcher, the cache, and the parser.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::model::{CacheEntry, FreshnessWindow, NormalizedSchedule, ZoneId};
use crate::parser;
use crate::plugin::ProviderPlugin;
use crate::ports::{CacheError, CachePort, FetchError, FetchPort, ParseError};

#[derive(thiserror::Error, Debug)]
/// Underlying reason no schedule could be produced.
pub enum UnavailableCause {
    /// The fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The fetched payload was unusable.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(thiserror::Error, Debug)]
#[error("No schedule available for zone {zone}: {cause}")]
/// Neither fresh data nor any cached entry exists for the zone.
pub struct ScheduleUnavailableError {
    /// Zone that was requested.
    pub zone: ZoneId,
    /// Why the live fetch failed.
    #[source]
    pub cause: UnavailableCause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where a returned schedule came from.
pub enum SnapshotSource {
    /// Cache entry within the freshness window; no request was made.
    Cache,
    /// Fetched and parsed during this call.
    Fetched,
    /// The fetch failed and an older cache entry was served instead.
    Fallback,
}

#[derive(Debug, Clone)]
/// Schedule returned by [`ScheduleService::get_schedule`].
pub struct ScheduleSnapshot {
    /// The schedule itself.
    pub schedule: NormalizedSchedule,
    /// `stored_at` of the cache entry used, or fetch time if it could not be stored.
    pub last_update: DateTime<Utc>,
    /// How the schedule was obtained.
    pub source: SnapshotSource,
}

impl ScheduleSnapshot {
    fn from_entry(entry: CacheEntry, source: SnapshotSource) -> Self {
        Self {
            schedule: entry.schedule,
            last_update: entry.stored_at,
            source,
        }
    }

    /// Whether this is stale data served after a failed fetch.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.source == SnapshotSource::Fallback
    }
}

/// Entry point used by hosts to obtain zone schedules.
///
/// Calls for the same zone are serialized; distinct zones run independently.
/// Cache reads and writes run on tokio's blocking pool.
pub struct ScheduleService {
    fetcher: Arc<dyn FetchPort>,
    cache: Arc<dyn CachePort>,
    clock: Arc<dyn Clock>,
    slots: Mutex<HashMap<ZoneId, Arc<AsyncMutex<()>>>>,
}

impl ScheduleService {
    /// Create a service from its collaborators.
    #[must_use]
    pub fn new(fetcher: Arc<dyn FetchPort>, cache: Arc<dyn CachePort>, clock: Arc<dyn Clock>) -> Self {
        Self {
            fetcher,
            cache,
            clock,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Create a service fetching through the plugin's schedule port.
    #[must_use]
    pub fn from_plugin(plugin: &ProviderPlugin, cache: Arc<dyn CachePort>, clock: Arc<dyn Clock>) -> Self {
        Self::new(Arc::clone(&plugin.fetch_port), cache, clock)
    }

    /// Clock the service stamps and filters with.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Return a schedule for `zone`, preferring a fresh cache entry.
    ///
    /// A cache entry younger than `window` is returned without any request.
    /// Otherwise the zone is fetched, parsed and cached. If that fails, any
    /// cached entry is served regardless of age. [`FreshnessWindow::ZERO`]
    /// always goes to the network first.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleUnavailableError`] when the fetch or parse fails and
    /// the zone has never been cached.
    pub async fn get_schedule(
        &self,
        zone: &ZoneId,
        window: FreshnessWindow,
    ) -> Result<ScheduleSnapshot, ScheduleUnavailableError> {
        let slot = self.slot(zone);
        let _guard = slot.lock().await;

        let cached = self.cached(zone).await;

        if let Some(entry) = &cached
            && !window.is_zero()
            && entry.is_fresh(window, self.clock.now())
        {
            debug!(zone = %zone, "Using cached data");
            return Ok(ScheduleSnapshot::from_entry(entry.clone(), SnapshotSource::Cache));
        }

        let cause = match self.refresh(zone).await {
            Ok(snapshot) => return Ok(snapshot),
            Err(cause) => cause,
        };
        error!(zone = %zone, "Error getting data: {cause}");

        match cached {
            Some(entry) => {
                warn!(
                    zone = %zone,
                    stored_at = %entry.stored_at,
                    "Using expired cached data as fallback"
                );
                Ok(ScheduleSnapshot::from_entry(entry, SnapshotSource::Fallback))
            }
            None => Err(ScheduleUnavailableError {
                zone: zone.clone(),
                cause,
            }),
        }
    }

    /// Bypass the freshness check and go to the network, still falling back
    /// to the cache on failure.
    ///
    /// # Errors
    ///
    /// Same as [`ScheduleService::get_schedule`].
    pub async fn force_refresh(
        &self,
        zone: &ZoneId,
    ) -> Result<ScheduleSnapshot, ScheduleUnavailableError> {
        self.get_schedule(zone, FreshnessWindow::ZERO).await
    }

    async fn refresh(&self, zone: &ZoneId) -> Result<ScheduleSnapshot, UnavailableCause> {
        info!(
            zone = %zone,
            provider = %self.fetcher.provider().name,
            "Fetching schedule"
        );
        let raw = self.fetcher.fetch(zone).await?;

        let fetched_at = self.clock.now();
        let schedule = parser::parse(zone, &raw, self.clock.today(), fetched_at)?;
        info!(
            zone = %zone,
            "Successfully fetched {} collections",
            schedule.len()
        );

        match self.store(zone, schedule.clone()).await {
            Ok(entry) => Ok(ScheduleSnapshot::from_entry(entry, SnapshotSource::Fetched)),
            Err(err) => {
                warn!(zone = %zone, "Could not cache data: {err}");
                Ok(ScheduleSnapshot {
                    schedule,
                    last_update: fetched_at,
                    source: SnapshotSource::Fetched,
                })
            }
        }
    }

    /// Cache read on the blocking pool; a failed task counts as a miss.
    async fn cached(&self, zone: &ZoneId) -> Option<CacheEntry> {
        let cache = Arc::clone(&self.cache);
        let key = zone.clone();
        match task::spawn_blocking(move || cache.get(&key)).await {
            Ok(entry) => entry,
            Err(err) => {
                warn!(zone = %zone, "Cache read task failed: {err}");
                None
            }
        }
    }

    async fn store(&self, zone: &ZoneId, schedule: NormalizedSchedule) -> Result<CacheEntry, CacheError> {
        let cache = Arc::clone(&self.cache);
        let key = zone.clone();
        match task::spawn_blocking(move || cache.put(&key, schedule)).await {
            Ok(result) => result,
            Err(err) => Err(CacheError::Io(io::Error::other(err))),
        }
    }

    fn slot(&self, zone: &ZoneId) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(zone.clone()).or_default())
    }
}
