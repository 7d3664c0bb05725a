//! Combined per-zone state handed to hosts.

use chrono::{DateTime, NaiveDate, Utc};

use crate::derive::{TomorrowView, WasteTypeView, tomorrow_view, waste_type_view};
use crate::model::{WasteTypeCode, ZoneId};
use crate::service::{ScheduleSnapshot, SnapshotSource};

#[derive(Debug, Clone)]
/// Tomorrow view plus one view per tracked waste type, stamped with `last_update`.
pub struct ZoneReport {
    /// Zone described.
    pub zone: ZoneId,
    /// Collections due tomorrow.
    pub tomorrow: TomorrowView,
    /// Views for the tracked waste types, in the order given.
    pub waste_types: Vec<WasteTypeView>,
    /// When the data backing the views was stored.
    pub last_update: DateTime<Utc>,
    /// How the data was obtained.
    pub source: SnapshotSource,
}

impl ZoneReport {
    /// Derive all views from `snapshot` for `today`.
    ///
    /// `next_dates_limit` caps each waste type's upcoming dates.
    #[must_use]
    pub fn build<'code>(
        snapshot: &ScheduleSnapshot,
        tracked: impl IntoIterator<Item = &'code WasteTypeCode>,
        today: NaiveDate,
        next_dates_limit: Option<usize>,
    ) -> Self {
        let schedule = &snapshot.schedule;
        let waste_types = tracked
            .into_iter()
            .map(|code| {
                let mut view = waste_type_view(schedule, code, today);
                if let Some(limit) = next_dates_limit {
                    view.truncate_dates(limit);
                }
                view
            })
            .collect();

        Self {
            zone: schedule.zone.clone(),
            tomorrow: tomorrow_view(schedule, today),
            waste_types,
            last_update: snapshot.last_update,
            source: snapshot.source,
        }
    }
}
