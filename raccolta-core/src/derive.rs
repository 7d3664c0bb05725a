//! Sensor-style views computed from a schedule and a reference date.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::model::{CollectionEvent, NormalizedSchedule, WasteTypeCode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Everything collected on the day after `today`.
pub struct TomorrowView {
    /// The day the view describes.
    pub date: Option<NaiveDate>,
    /// Waste types collected that day.
    pub waste_types: BTreeSet<WasteTypeCode>,
    /// Number of distinct waste types collected that day.
    pub count: usize,
    /// Matching events in schedule order.
    pub detail: Vec<CollectionEvent>,
}

impl TomorrowView {
    /// Whether nothing is collected tomorrow.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Sensor state: `none`, or the collected titles joined with `, `.
    #[must_use]
    pub fn state(&self) -> String {
        if self.is_empty() {
            return String::from("none");
        }
        self.detail
            .iter()
            .map(|event| event.title.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Select every event dated `today + 1`.
#[must_use]
pub fn tomorrow_view(schedule: &NormalizedSchedule, today: NaiveDate) -> TomorrowView {
    let tomorrow = today.checked_add_days(Days::new(1));

    let detail: Vec<CollectionEvent> = schedule
        .events
        .iter()
        .filter(|event| Some(event.date) == tomorrow)
        .cloned()
        .collect();

    let waste_types: BTreeSet<WasteTypeCode> = detail
        .iter()
        .map(|event| event.waste_type.clone())
        .collect();

    TomorrowView {
        date: tomorrow,
        count: waste_types.len(),
        waste_types,
        detail,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Per-waste-type flag plus upcoming dates.
pub struct WasteTypeView {
    /// Waste type described.
    pub waste_type: WasteTypeCode,
    /// Whether the type is collected tomorrow.
    pub is_tomorrow: bool,
    /// Title from the schedule; absent when the type does not appear.
    pub title: Option<String>,
    /// Dates on or after `today`, ascending.
    pub next_dates: Vec<NaiveDate>,
}

impl WasteTypeView {
    /// Earliest upcoming pickup.
    #[must_use]
    pub fn next_date(&self) -> Option<NaiveDate> {
        self.next_dates.first().copied()
    }

    /// Keep at most `limit` upcoming dates.
    pub fn truncate_dates(&mut self, limit: usize) {
        self.next_dates.truncate(limit);
    }
}

/// Describe `waste_type` relative to `today`. Unknown types yield an empty view.
#[must_use]
pub fn waste_type_view(
    schedule: &NormalizedSchedule,
    waste_type: &WasteTypeCode,
    today: NaiveDate,
) -> WasteTypeView {
    let tomorrow = today.checked_add_days(Days::new(1));

    let next_dates: Vec<NaiveDate> = schedule
        .events_for(waste_type)
        .map(|event| event.date)
        .filter(|date| *date >= today)
        .collect();

    WasteTypeView {
        waste_type: waste_type.clone(),
        is_tomorrow: tomorrow.is_some_and(|day| next_dates.contains(&day)),
        title: schedule.title_for(waste_type).map(str::to_owned),
        next_dates,
    }
}
