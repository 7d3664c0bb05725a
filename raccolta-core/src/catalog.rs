//! Waste types known to the Mantova Ambiente service.

use crate::model::WasteTypeCode;

/// Known waste type codes and their Italian display titles.
pub const WASTE_TYPES: &[(&str, &str)] = &[
    ("6256", "Abiti"),
    ("3705", "Pannolini e pannoloni"),
    ("3581", "Carta"),
    ("3701", "Indifferenziato"),
    ("3704", "Organico"),
    ("3707", "Plastica"),
    ("3708", "Sfalci"),
    ("3710", "Vetro"),
    ("3702", "Ingombranti"),
];

/// Catalogue title for a code, if the code is known.
#[must_use]
pub fn known_title(code: &WasteTypeCode) -> Option<&'static str> {
    WASTE_TYPES
        .iter()
        .find(|(known, _)| *known == code.0)
        .map(|(_, title)| *title)
}

/// Catalogue title, or `Waste <code>` for unknown codes.
#[must_use]
pub fn display_title(code: &WasteTypeCode) -> String {
    known_title(code).map_or_else(|| format!("Waste {code}"), str::to_owned)
}

/// Every catalogued code.
pub fn known_codes() -> impl Iterator<Item = WasteTypeCode> {
    WASTE_TYPES
        .iter()
        .map(|(code, _)| WasteTypeCode::from(*code))
}
