//! Decoding rules for the `verifyReceipt` JSON vocabulary.
//!
//! Apple sends most numbers and booleans as strings (`"1"`, `"true"`) and
//! formats dates as `yyyy-MM-dd HH:mm:ss VV`, e.g. `2024-03-01 08:15:00 Etc/GMT`
//! or `2024-03-01 00:15:00 America/Los_Angeles`.

use serde::{de, Deserialize, Deserializer, Serializer};
use time::{macros::format_description, OffsetDateTime, PrimitiveDateTime, UtcOffset};
use time_tz::{timezones, OffsetResult, PrimitiveDateTimeExt};

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

fn scalar_to_i64<E: de::Error>(value: Scalar) -> std::result::Result<i64, E> {
    match value {
        Scalar::Int(n) => Ok(n),
        Scalar::Float(f) if f.fract() == 0.0 => Ok(f as i64),
        Scalar::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| E::custom(format!("expected integer, got {:?}", s))),
        Scalar::Bool(b) => Ok(b as i64),
        Scalar::Float(f) => Err(E::custom(format!("expected integer, got {}", f))),
    }
}

/// Integer that may arrive as a JSON number or a numeric string
pub fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_to_i64(Scalar::deserialize(deserializer)?)
}

/// Optional integer, number or numeric string
pub fn opt_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Scalar>::deserialize(deserializer)?
        .map(scalar_to_i64::<D::Error>)
        .transpose()
}

/// Optional string that Apple sometimes encodes as a number (ids, quantities)
pub fn opt_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|value| match value {
        Scalar::Text(s) => s,
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}

/// Optional boolean: `true`, `"true"`, `1` or `"1"`
pub fn opt_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<Scalar>::deserialize(deserializer)? else {
        return Ok(None);
    };

    match value {
        Scalar::Bool(b) => Ok(Some(b)),
        Scalar::Int(n) => Ok(Some(n != 0)),
        Scalar::Float(f) => Ok(Some(f != 0.0)),
        Scalar::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            "" => Ok(None),
            other => Err(de::Error::custom(format!("expected boolean, got {:?}", other))),
        },
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DateError {
    #[error("missing time zone in {0:?}")]
    MissingZone(String),

    #[error("unsupported time zone {0:?}")]
    UnsupportedZone(String),

    #[error("invalid date {0:?}")]
    InvalidDate(String),
}

/// UTC aliases and the POSIX style `Etc/GMT±N` zones
fn fixed_offset(zone: &str) -> Option<UtcOffset> {
    match zone {
        "Etc/GMT" | "GMT" | "UTC" | "Etc/UTC" | "Etc/Universal" | "Z" => return Some(UtcOffset::UTC),
        _ => {}
    }

    // Etc/GMT+5 is five hours *behind* UTC
    let rest = zone.strip_prefix("Etc/GMT")?;
    let (sign, hours) = match rest.split_at_checked(1)? {
        ("+", hours) => (-1, hours),
        ("-", hours) => (1, hours),
        _ => return None,
    };
    let hours: i8 = hours.parse().ok()?;
    if !(0..=14).contains(&hours) {
        return None;
    }

    UtcOffset::from_hms(sign * hours, 0, 0).ok()
}

/// Attach the wall-clock time to `zone`, any IANA zone id.
/// Overlaps resolve to the earlier offset; times inside a gap move forward
/// by the length of the gap.
fn assume_zone(datetime: PrimitiveDateTime, zone: &str) -> std::result::Result<OffsetDateTime, DateError> {
    if let Some(offset) = fixed_offset(zone) {
        return Ok(datetime.assume_offset(offset));
    }

    let tz = timezones::get_by_name(zone)
        .ok_or_else(|| DateError::UnsupportedZone(zone.to_string()))?;

    Ok(match datetime.assume_timezone(tz) {
        OffsetResult::Some(resolved) | OffsetResult::Ambiguous(resolved, _) => resolved,
        OffsetResult::None => datetime.assume_timezone_utc(tz),
    })
}

/// Parse a date in the `yyyy-MM-dd HH:mm:ss VV` format
pub fn parse_apple_date(value: &str) -> std::result::Result<OffsetDateTime, DateError> {
    let value = value.trim();
    let (datetime, zone) = value
        .rsplit_once(' ')
        .ok_or_else(|| DateError::MissingZone(value.to_string()))?;

    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let datetime = PrimitiveDateTime::parse(datetime, format)
        .map_err(|_| DateError::InvalidDate(value.to_string()))?;

    assume_zone(datetime, zone)
}

/// Format a date the way the verification service does, normalized to UTC
pub fn format_apple_date(value: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let utc = value.to_offset(UtcOffset::UTC);
    // The format only has numeric components, formatting cannot fail
    match utc.format(format) {
        Ok(text) => format!("{} Etc/GMT", text),
        Err(_) => utc.to_string(),
    }
}

/// `#[serde(with = "apple_date")]` for required dates
pub mod apple_date {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        parse_apple_date(&text).map_err(de::Error::custom)
    }

    pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_apple_date(*value))
    }

    /// `#[serde(default, with = "apple_date::option")]` for optional dates
    pub mod option {
        use super::*;

        pub fn deserialize<'de, D>(
            deserializer: D,
        ) -> std::result::Result<Option<OffsetDateTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(text) if !text.trim().is_empty() => {
                    parse_apple_date(&text).map(Some).map_err(de::Error::custom)
                }
                _ => Ok(None),
            }
        }

        pub fn serialize<S>(
            value: &Option<OffsetDateTime>,
            serializer: S,
        ) -> std::result::Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(value) => serializer.serialize_str(&format_apple_date(*value)),
                None => serializer.serialize_none(),
            }
        }
    }
}
