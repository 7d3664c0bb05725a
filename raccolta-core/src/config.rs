//! Per-zone configuration supplied by the host.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{FreshnessWindow, WasteTypeCode, ZoneId};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
/// Rejected configuration values.
pub enum ConfigError {
    /// Zone identifier is blank.
    #[error("Zone must not be empty")]
    EmptyZone,
    /// Freshness window outside 1..=168 hours.
    #[error("Cache hours must be between 1 and 168, got {0}")]
    WindowOutOfRange(u32),
    /// No waste type selected.
    #[error("At least one waste type must be tracked")]
    NoWasteTypes,
}

fn default_cache_hours() -> u32 {
    FreshnessWindow::DEFAULT_HOURS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Settings for one configured zone.
pub struct ZoneConfig {
    /// Zone to poll.
    pub zone: ZoneId,
    /// Hours a cached schedule is served without refetching.
    #[serde(default = "default_cache_hours", alias = "cache_hours")]
    pub freshness_window_hours: u32,
    /// Waste types exposed as individual views.
    #[serde(alias = "waste_codes")]
    pub tracked_waste_types: BTreeSet<WasteTypeCode>,
    /// Maximum number of upcoming dates per waste type.
    #[serde(default)]
    pub next_dates_limit: Option<usize>,
}

impl ZoneConfig {
    /// Build and validate a configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a value is out of range.
    pub fn new(
        zone: ZoneId,
        freshness_window_hours: u32,
        tracked_waste_types: impl IntoIterator<Item = WasteTypeCode>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            zone,
            freshness_window_hours,
            tracked_waste_types: tracked_waste_types.into_iter().collect(),
            next_dates_limit: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the core relies on.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zone.0.trim().is_empty() {
            return Err(ConfigError::EmptyZone);
        }
        if !(FreshnessWindow::MIN_HOURS..=FreshnessWindow::MAX_HOURS)
            .contains(&self.freshness_window_hours)
        {
            return Err(ConfigError::WindowOutOfRange(self.freshness_window_hours));
        }
        if self.tracked_waste_types.is_empty() {
            return Err(ConfigError::NoWasteTypes);
        }
        Ok(())
    }

    /// Configured freshness window.
    #[must_use]
    pub fn window(&self) -> FreshnessWindow {
        FreshnessWindow::from_hours(self.freshness_window_hours)
    }
}

/// Split a comma-separated code list, ignoring blanks.
#[must_use]
pub fn parse_waste_codes(list: &str) -> BTreeSet<WasteTypeCode> {
    list.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(WasteTypeCode::from)
        .collect()
}
