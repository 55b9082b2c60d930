//! Attribute name routing: descriptor properties first, then market-data aliases.

use crate::domain::{FieldMap, FieldValue};
use crate::error::{SecurityError, ValidationError};

/// Canonical alias key and the ISS `marketdata` column it reads.
pub const MARKET_ALIASES: [(&str, &str); 12] = [
    ("LAST_PRICE", "LAST"),
    ("OPENING_PRICE", "OPEN"),
    ("DAILY_LOW", "LOW"),
    ("DAILY_HIGH", "HIGH"),
    ("VOLUME", "VALTODAY"),
    ("DAILY_CHANGE", "CHANGE"),
    ("DAILY_PERCENTAGE_CHANGE", "LASTTOPREVPRICE"),
    ("BID", "BID"),
    ("OFFER", "OFFER"),
    ("NUMBER_OF_TRADES", "NUMTRADES"),
    ("MARKET_CAPITALIZATION", "ISSUECAPITALIZATION"),
    ("UPDATE_TIME", "UPDATETIME"),
];

pub fn supported_aliases() -> &'static [(&'static str, &'static str)] {
    &MARKET_ALIASES
}

/// Where a normalized attribute name is answered from.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Descriptor(FieldValue),
    MarketField(&'static str),
}

/// Canonical key for a user-supplied attribute name.
///
/// `"get last price"`, `"Last-Price"` and `"LAST_PRICE"` all map to `LAST_PRICE`.
pub fn normalize(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    let stripped = strip_getter_prefix(trimmed);

    let mut key = String::with_capacity(stripped.len());
    for ch in stripped.chars() {
        let ch = if ch == ' ' || ch == '-' { '_' } else { ch };
        if ch == '_' && (key.is_empty() || key.ends_with('_')) {
            continue;
        }
        key.extend(ch.to_uppercase());
    }
    while key.ends_with('_') {
        key.pop();
    }

    if key.is_empty() {
        return Err(ValidationError::EmptyAttributeName);
    }
    Ok(key)
}

fn strip_getter_prefix(name: &str) -> &str {
    match name.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("get_") || prefix.eq_ignore_ascii_case("get ") => {
            &name[4..]
        }
        _ => name,
    }
}

pub fn market_field(key: &str) -> Option<&'static str> {
    MARKET_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, field)| *field)
}

/// Resolves `key` against the descriptor, then the alias table.
pub fn resolve(key: &str, descriptor: &FieldMap) -> Result<Resolution, SecurityError> {
    if let Some(value) = descriptor.get(key) {
        return Ok(Resolution::Descriptor(value.clone()));
    }
    market_field(key)
        .map(Resolution::MarketField)
        .ok_or_else(|| SecurityError::unsupported(key))
}
