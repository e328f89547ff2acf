//! Lenient `serde` field decoders for occurrence payloads.
//!
//! The upstream store is loosely typed: coordinates arrive as numbers or
//! decimal-comma strings, counts arrive as strings, and text columns
//! occasionally hold numbers or arrays. Each decoder here maps whatever
//! arrives to a typed value or to "absent" and never returns an error for
//! a well-formed but unexpected value.

use serde::{Deserialize as _, Deserializer};
use serde_json::Value;

fn number_from(value: Option<Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

/// Decodes a text column. Strings pass through, numbers and booleans are
/// rendered as text, everything else is absent.
///
/// # Errors
///
/// Only fails if the underlying deserializer itself fails.
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Decodes a latitude/longitude.
///
/// # Errors
///
/// Only fails if the underlying deserializer itself fails.
pub fn coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number_from(Option::<Value>::deserialize(deserializer)?).filter(|v| v.is_finite()))
}

/// Decodes a non-negative count, defaulting to zero.
///
/// # Errors
///
/// Only fails if the underlying deserializer itself fails.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number_from(Option::<Value>::deserialize(deserializer)?)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map_or(0, |v| v.min(f64::from(u32::MAX)) as u32))
}

/// Decodes a manufacture year; zero and negative values are absent.
///
/// # Errors
///
/// Only fails if the underlying deserializer itself fails.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn year<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number_from(Option::<Value>::deserialize(deserializer)?)
        .filter(|v| v.is_finite() && *v >= 1.0 && *v < 10_000.0)
        .map(|v| v as u32))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "super::text")]
        text: Option<String>,
        #[serde(default, deserialize_with = "super::coordinate")]
        coordinate: Option<f64>,
        #[serde(default, deserialize_with = "super::count")]
        count: u32,
        #[serde(default, deserialize_with = "super::year")]
        year: Option<u32>,
    }

    fn sample(json: &str) -> Sample {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn missing_fields_are_absent() {
        let p = sample("{}");
        assert!(p.text.is_none());
        assert!(p.coordinate.is_none());
        assert_eq!(p.count, 0);
        assert!(p.year.is_none());
    }

    #[test]
    fn decimal_comma_coordinates_parse() {
        assert_eq!(sample(r#"{"coordinate": "-15,7942"}"#).coordinate, Some(-15.7942));
        assert_eq!(sample(r#"{"coordinate": "abc"}"#).coordinate, None);
    }

    #[test]
    fn counts_never_go_negative() {
        assert_eq!(sample(r#"{"count": -4}"#).count, 0);
        assert_eq!(sample(r#"{"count": "7.0"}"#).count, 7);
        assert_eq!(sample(r#"{"count": true}"#).count, 0);
    }

    #[test]
    fn years_reject_placeholders() {
        assert_eq!(sample(r#"{"year": 0}"#).year, None);
        assert_eq!(sample(r#"{"year": "1980"}"#).year, Some(1980));
    }

    #[test]
    fn non_text_values_are_dropped() {
        assert_eq!(sample(r#"{"text": {"a": 1}}"#).text, None);
        assert_eq!(sample(r#"{"text": false}"#).text.as_deref(), Some("false"));
    }
}
