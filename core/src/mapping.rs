//! Typed mapping from the bridge's JSON wire format into domain records.
//!
//! # Design
//! Records derive `Deserialize` and are decoded from an already-parsed
//! `serde_json::Value`, so a body that is not JSON at all and a body that is
//! JSON of the wrong shape fail at different points. Optional fields use
//! `#[serde(default)]`; a missing key, an explicit `null` and (for dates) an
//! empty string all become `None`.
//!
//! Every date lands in `DateTime<Utc>` whichever of the three wire forms the
//! server used: with a zone (`Z` or `±HH:MM`), with fractional seconds, or
//! bare. A bare timestamp is read as UTC.

use std::any::type_name;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::MappingError;

const BARE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Parse an ISO-8601 timestamp of the form
/// `YYYY-MM-DDTHH:MM:SS[.ffffff][Z|±HH:MM]`.
///
/// Returns `None` when the text matches none of the accepted forms.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(zoned) = DateTime::parse_from_rfc3339(text) {
        return Some(zoned.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, BARE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a timestamp for outbound requests as `YYYY-MM-DDTHH:MM:SSZ`.
///
/// This is lossy: sub-second precision is dropped and the instant is always
/// written in UTC. Formatting then parsing is exact; parsing then formatting
/// is not.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(WIRE_FORMAT).to_string()
}

/// Map one JSON value into a record.
pub fn map_record<T: DeserializeOwned>(value: Value) -> Result<T, MappingError> {
    serde_json::from_value(value).map_err(|source| MappingError {
        record: record_name::<T>(),
        source,
    })
}

/// Map a JSON array into records, preserving server order.
pub fn map_records<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, MappingError> {
    serde_json::from_value(value).map_err(|source| MappingError {
        record: record_name::<T>(),
        source,
    })
}

fn record_name<T>() -> &'static str {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Serde adapter for required date fields.
pub mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_date(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 date: {text:?}")))
    }
}

/// Serde adapter for optional date fields. Pair with `#[serde(default)]` so
/// a missing key maps to `None`.
pub mod iso8601_opt {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_str(&super::format_date(date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(text) if text.is_empty() => Ok(None),
            Some(text) => super::parse_date(&text)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 date: {text:?}"))),
        }
    }
}
