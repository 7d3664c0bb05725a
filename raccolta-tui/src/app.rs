use std::sync::Arc;
use std::time::Instant;

use raccolta_core::{
    ProviderPlugin, ScheduleService, ScheduleUnavailableError, Zone, ZoneConfig, ZoneReport,
};

use crate::config::HostConfig;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Screen {
    ZoneSelect,
    Schedule,
}

pub(crate) struct App {
    pub service: Arc<ScheduleService>,
    pub plugin: Arc<ProviderPlugin>,
    pub settings: HostConfig,

    pub screen: Screen,
    pub zones: Vec<Zone>,
    pub zone_list_index: usize,

    pub zone: Option<ZoneConfig>,
    pub zone_title: String,
    pub report: Option<ZoneReport>,
    pub last_poll: Option<Instant>,

    pub is_loading: bool,
    pub error_message: Option<String>,
}

impl App {
    pub(crate) fn new(
        service: Arc<ScheduleService>,
        plugin: Arc<ProviderPlugin>,
        settings: HostConfig,
    ) -> Self {
        Self {
            service,
            plugin,
            settings,
            screen: Screen::ZoneSelect,
            zones: Vec::new(),
            zone_list_index: 0,
            zone: None,
            zone_title: String::new(),
            report: None,
            last_poll: None,
            is_loading: false,
            error_message: None,
        }
    }

    pub(crate) fn select_current_zone(&mut self) -> Option<Zone> {
        self.zones.get(self.zone_list_index).cloned()
    }

    pub(crate) fn enter_zone(&mut self, zone: ZoneConfig, title: String) {
        self.zone = Some(zone);
        self.zone_title = title;
        self.report = None;
        self.last_poll = None;
        self.screen = Screen::Schedule;
    }

    pub(crate) fn poll_due(&self) -> bool {
        self.zone.is_some()
            && self
                .last_poll
                .is_none_or(|polled| polled.elapsed() >= self.settings.refresh_interval)
    }

    pub(crate) fn apply_result(&mut self, zone: &ZoneConfig, result: Result<ZoneReport, ScheduleUnavailableError>) {
        self.last_poll = Some(Instant::now());
        match result {
            Ok(report) => {
                self.error_message = None;
                self.report = Some(report);
            }
            Err(err) => {
                self.report = None;
                self.error_message = Some(format!("No data for zone {}: {}", zone.zone, err.cause));
            }
        }
    }
}
