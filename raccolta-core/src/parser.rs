//! Decoding of raw schedule payloads into a [`NormalizedSchedule`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::catalog;
use crate::model::{CollectionEvent, NormalizedSchedule, WasteTypeCode, ZoneId};
use crate::ports::{ParseError, RawPayload};

/// Container shapes the API has been seen to return.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope {
    Wrapped { data: Vec<Value> },
    Bare(Vec<Value>),
}

/// One waste type record. Every field is optional so a single odd record
/// never takes down the whole payload.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    id: Option<RawCode>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    collections: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCode {
    Text(String),
    Number(i64),
}

impl RawCode {
    fn into_code(self) -> Option<WasteTypeCode> {
        let code = match self {
            RawCode::Text(text) => text.trim().to_owned(),
            RawCode::Number(number) => number.to_string(),
        };
        (!code.is_empty()).then_some(WasteTypeCode(code))
    }
}

#[derive(Default)]
struct Accumulated {
    title: Option<String>,
    dates: BTreeSet<NaiveDate>,
}

/// Parse a schedule payload for `zone`, keeping only dates on or after `today`.
///
/// Records without a waste-type code or without any usable date are dropped.
/// Records sharing a code are merged; the first non-empty title wins.
///
/// # Errors
///
/// Returns [`ParseError::MalformedPayload`] when the body is not JSON or is
/// neither a `{"data": [...]}` object nor a bare array.
pub fn parse(
    zone: &ZoneId,
    raw: &RawPayload,
    today: NaiveDate,
    fetched_at: DateTime<Utc>,
) -> Result<NormalizedSchedule, ParseError> {
    let envelope: Envelope = serde_json::from_str(raw.as_str())
        .map_err(|err| ParseError::MalformedPayload(err.to_string()))?;

    let records = match envelope {
        Envelope::Wrapped { data } => data,
        Envelope::Bare(items) => items,
    };

    let mut by_type: BTreeMap<WasteTypeCode, Accumulated> = BTreeMap::new();

    for item in records {
        let Some((code, title, dates)) = decode_record(item) else {
            continue;
        };

        let slot = by_type.entry(code).or_default();
        if slot.title.is_none() {
            slot.title = title;
        }
        slot.dates
            .extend(dates.into_iter().filter(|date| *date >= today));
    }

    let mut events: Vec<CollectionEvent> = by_type
        .into_iter()
        .flat_map(|(code, slot)| {
            let title = slot
                .title
                .unwrap_or_else(|| catalog::display_title(&code));
            slot.dates.into_iter().map(move |date| CollectionEvent {
                waste_type: code.clone(),
                title: title.clone(),
                date,
            })
        })
        .collect();

    events.sort_by(|left, right| {
        left.date
            .cmp(&right.date)
            .then_with(|| left.waste_type.cmp(&right.waste_type))
    });

    Ok(NormalizedSchedule {
        zone: zone.clone(),
        fetched_at,
        events,
    })
}

fn decode_record(item: Value) -> Option<(WasteTypeCode, Option<String>, Vec<NaiveDate>)> {
    let record: RawRecord = match serde_json::from_value(item) {
        Ok(record) => record,
        Err(err) => {
            debug!("Skipping unreadable collection record: {err}");
            return None;
        }
    };

    let code = record.id.and_then(RawCode::into_code)?;

    let dates: Vec<NaiveDate> = record
        .collections
        .unwrap_or_default()
        .iter()
        .filter_map(|value| {
            let parsed = value.as_str().and_then(parse_date);
            if parsed.is_none() {
                debug!(waste_type = %code, "Could not parse date {value}");
            }
            parsed
        })
        .collect();

    if dates.is_empty() {
        return None;
    }

    let title = record
        .title
        .map(|title| title.trim().to_owned())
        .filter(|title| !title.is_empty());

    Some((code, title, dates))
}

/// Accepts `YYYY-MM-DD HH:MM:SS` (the API's format), RFC 3339, and bare dates.
fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .map(|stamp| stamp.date())
        .or_else(|_| DateTime::parse_from_rfc3339(text).map(|stamp| stamp.date_naive()))
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
        .ok()
}
