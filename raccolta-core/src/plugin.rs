//! Bundling of the ports a schedule provider implements.

use std::sync::Arc;

use tracing::warn;

use crate::model::{ProviderMeta, Zone, ZoneId};
use crate::ports::{FetchPort, ZonePort};

/// Collection of ports implementing a single schedule provider.
pub struct ProviderPlugin {
    /// Static metadata describing the provider.
    pub meta: ProviderMeta,
    /// Implementation for fetching raw schedules.
    pub fetch_port: Arc<dyn FetchPort>,
    /// Implementation for listing zones.
    pub zone_port: Arc<dyn ZonePort>,
}

impl ProviderPlugin {
    /// Display title for a zone, or `Zone <id>` when the listing is unavailable.
    pub async fn zone_title(&self, zone: &ZoneId) -> String {
        match self.zone_port.zones().await {
            Ok(zones) => zones
                .into_iter()
                .find(|candidate| &candidate.id == zone)
                .map_or_else(|| Zone::fallback_title(zone), |found| found.title),
            Err(err) => {
                warn!(zone = %zone, "Could not fetch zone title: {err}");
                Zone::fallback_title(zone)
            }
        }
    }
}
