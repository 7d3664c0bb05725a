use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use raccolta_core::{
    ConfigError, FreshnessWindow, WasteTypeCode, ZoneConfig, ZoneId, catalog, parse_waste_codes,
};
use serde::Deserialize;

const DEFAULT_REFRESH_SECS: u64 = 3600;

// Host settings sourced from environment variables, optionally overridden by TOML.
#[derive(Debug, Clone)]
pub(crate) struct HostConfig {
    pub zone: Option<ZoneId>,
    pub cache_hours: u32,
    pub waste_codes: BTreeSet<WasteTypeCode>,
    pub next_dates_limit: Option<usize>,
    pub cache_dir: PathBuf,
    pub refresh_interval: Duration,
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HostConfigOverride {
    zone: Option<String>,
    cache_hours: Option<u32>,
    waste_codes: Option<Vec<String>>,
    next_dates_limit: Option<usize>,
    cache_dir: Option<PathBuf>,
    refresh_secs: Option<u64>,
    base_url: Option<String>,
}

impl HostConfig {
    fn from_env() -> Result<Self> {
        let zone = env_var("RACCOLTA_ZONE").map(ZoneId);
        let cache_hours = match env_var("RACCOLTA_CACHE_HOURS") {
            Some(value) => value.parse().with_context(|| "parse RACCOLTA_CACHE_HOURS")?,
            None => FreshnessWindow::DEFAULT_HOURS,
        };
        let waste_codes = env_var("RACCOLTA_WASTE_CODES")
            .map(|list| parse_waste_codes(&list))
            .filter(|codes| !codes.is_empty())
            .unwrap_or_else(|| catalog::known_codes().collect());
        let next_dates_limit = env_var("RACCOLTA_NEXT_DATES")
            .map(|value| value.parse())
            .transpose()
            .with_context(|| "parse RACCOLTA_NEXT_DATES")?;
        let cache_dir = env_var("RACCOLTA_CACHE_DIR")
            .map_or_else(|| PathBuf::from(".raccolta-cache"), PathBuf::from);
        let refresh_secs = match env_var("RACCOLTA_REFRESH_SECS") {
            Some(value) => value.parse().with_context(|| "parse RACCOLTA_REFRESH_SECS")?,
            None => DEFAULT_REFRESH_SECS,
        };
        let base_url = env_var("RACCOLTA_BASE_URL");

        Ok(Self {
            zone,
            cache_hours,
            waste_codes,
            next_dates_limit,
            cache_dir,
            refresh_interval: Duration::from_secs(refresh_secs),
            base_url,
        })
    }

    pub(crate) fn from_env_or_toml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Some(path) = env_var("RACCOLTA_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read RACCOLTA_CONFIG: {path}"))?;
            let override_cfg: HostConfigOverride =
                toml::from_str(&contents).with_context(|| "parse raccolta config toml")?;
            config.apply(override_cfg);
        }
        // Fail fast on values the core would reject once a zone is chosen.
        if let Some(zone) = config.zone.clone() {
            config.zone_config(zone)?;
        }
        Ok(config)
    }

    fn apply(&mut self, override_cfg: HostConfigOverride) {
        if let Some(value) = override_cfg.zone {
            self.zone = Some(ZoneId(value));
        }
        if let Some(value) = override_cfg.cache_hours {
            self.cache_hours = value;
        }
        if let Some(codes) = override_cfg.waste_codes {
            self.waste_codes = codes.iter().map(|code| WasteTypeCode::from(code.as_str())).collect();
        }
        if override_cfg.next_dates_limit.is_some() {
            self.next_dates_limit = override_cfg.next_dates_limit;
        }
        if let Some(value) = override_cfg.cache_dir {
            self.cache_dir = value;
        }
        if let Some(value) = override_cfg.refresh_secs {
            self.refresh_interval = Duration::from_secs(value);
        }
        if override_cfg.base_url.is_some() {
            self.base_url = override_cfg.base_url;
        }
    }

    pub(crate) fn zone_config(&self, zone: ZoneId) -> Result<ZoneConfig, ConfigError> {
        let mut config = ZoneConfig::new(zone, self.cache_hours, self.waste_codes.iter().cloned())?;
        config.next_dates_limit = self.next_dates_limit;
        Ok(config)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
