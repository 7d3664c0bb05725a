//! Domain data structures for zones, waste types, and collection schedules.

use std::fmt;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Identifier for a municipal collection zone.
pub struct ZoneId(pub String);

impl fmt::Display for ZoneId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(id: &str) -> Self {
        ZoneId(id.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Zone returned by a provider's zone listing.
pub struct Zone {
    /// Unique identifier used when requesting schedules.
    pub id: ZoneId,
    /// Human-friendly zone name.
    pub title: String,
}

impl Zone {
    /// Fallback label used when a zone title cannot be resolved.
    #[must_use]
    pub fn fallback_title(id: &ZoneId) -> String {
        format!("Zone {id}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Identifier for a waste category such as organic or paper.
pub struct WasteTypeCode(pub String);

impl fmt::Display for WasteTypeCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for WasteTypeCode {
    fn from(code: &str) -> Self {
        WasteTypeCode(code.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A single pickup of one waste type on one day.
pub struct CollectionEvent {
    /// Waste type collected.
    pub waste_type: WasteTypeCode,
    /// Display title reported by the provider.
    pub title: String,
    /// Zone-local pickup date.
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Forward-looking pickup schedule for one zone.
///
/// Events are ordered by date, then by waste type. For any waste type the
/// dates are strictly ascending and its title is the same on every event.
pub struct NormalizedSchedule {
    /// Zone the schedule belongs to.
    pub zone: ZoneId,
    /// When the underlying payload was fetched.
    pub fetched_at: DateTime<Utc>,
    /// Pickups in ascending date order.
    pub events: Vec<CollectionEvent>,
}

impl NormalizedSchedule {
    /// All events for a waste type, in ascending date order.
    pub fn events_for<'schedule, 'code>(
        &'schedule self,
        waste_type: &'code WasteTypeCode,
    ) -> impl Iterator<Item = &'schedule CollectionEvent> + use<'schedule, 'code> {
        self.events
            .iter()
            .filter(move |event| &event.waste_type == waste_type)
    }

    /// Title reported for a waste type, if it appears in the schedule.
    #[must_use]
    pub fn title_for(&self, waste_type: &WasteTypeCode) -> Option<&str> {
        self.events_for(waste_type)
            .next()
            .map(|event| event.title.as_str())
    }

    /// Number of pickups in the schedule.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the schedule has no pickups at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Last successfully parsed schedule stored for a zone.
pub struct CacheEntry {
    /// Zone key.
    pub zone: ZoneId,
    /// Stored schedule, replaced wholesale on every successful fetch.
    pub schedule: NormalizedSchedule,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Age of the entry relative to `now`.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.stored_at
    }

    /// Whether the entry is still within `window` at `now`.
    #[must_use]
    pub fn is_fresh(&self, window: FreshnessWindow, now: DateTime<Utc>) -> bool {
        is_fresh(self, window, now)
    }
}

/// True iff `now - entry.stored_at <= window`.
#[must_use]
pub fn is_fresh(entry: &CacheEntry, window: FreshnessWindow, now: DateTime<Utc>) -> bool {
    entry.age(now) <= window.as_delta()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Maximum age at which a cached schedule is served without refetching.
pub struct FreshnessWindow {
    hours: u32,
}

impl FreshnessWindow {
    /// Window that always goes to the network; used for forced refreshes.
    pub const ZERO: Self = Self { hours: 0 };

    /// Smallest configurable window.
    pub const MIN_HOURS: u32 = 1;

    /// Largest configurable window (one week).
    pub const MAX_HOURS: u32 = 168;

    /// Window used when nothing is configured.
    pub const DEFAULT_HOURS: u32 = 24;

    /// Build a window from hours; range checks belong to configuration.
    #[must_use]
    pub const fn from_hours(hours: u32) -> Self {
        Self { hours }
    }

    /// Whether this is the forced-refresh window.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.hours == 0
    }

    /// Window as a chrono duration.
    #[must_use]
    pub fn as_delta(self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.hours))
    }
}

impl Default for FreshnessWindow {
    fn default() -> Self {
        Self::from_hours(Self::DEFAULT_HOURS)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Metadata describing a schedule provider.
pub struct ProviderMeta {
    /// Short identifier.
    pub id: String,
    /// Display name of the operator.
    pub name: String,
}
