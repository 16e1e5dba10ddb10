//! Normalization helpers for heterogeneous indexer payloads
//!
//! Indexers disagree on units and encodings: timestamps arrive as ISO-8601
//! strings, Unix seconds, or Unix milliseconds (sometimes as strings), and
//! counts may be JSON numbers or string-encoded integers.

use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;
use tracing::debug;

use super::SourceError;

/// Values below this are Unix seconds; at or above, milliseconds
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

fn epoch_to_millis(n: i64) -> i64 {
    if n.abs() < MILLIS_THRESHOLD {
        n.saturating_mul(1000)
    } else {
        n
    }
}

/// Normalize a timestamp of any supported shape to Unix milliseconds
pub fn timestamp_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(epoch_to_millis),
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<i64> {
    if s.is_empty() {
        return None;
    }
    if let Ok(n) = s.parse::<i64>() {
        return Some(epoch_to_millis(n));
    }
    if let Ok(f) = s.parse::<f64>() {
        return Some(epoch_to_millis(f as i64));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    // Some indexers drop the offset; treat those as UTC
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Creation time in Unix milliseconds, or 0 when absent or unparseable
pub fn created_at(value: Option<&Value>, id: &str) -> i64 {
    match value {
        Some(v) => timestamp_millis(v).unwrap_or_else(|| {
            debug!(id = %id, value = %v, "Unparseable inscription timestamp");
            0
        }),
        None => 0,
    }
}

/// Signed integer from a JSON number or a numeric string
pub fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Unsigned integer from a JSON number or a numeric string
pub fn unsigned(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Genesis transaction id embedded in an inscription id (`{txid}i{index}`)
pub fn txid_from_inscription_id(id: &str) -> Option<&str> {
    let (txid, index) = id.rsplit_once('i')?;
    let valid = txid.len() == 64
        && txid.bytes().all(|b| b.is_ascii_hexdigit())
        && !index.is_empty()
        && index.bytes().all(|b| b.is_ascii_digit());
    valid.then_some(txid)
}

/// Non-empty string, or `None`
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Check an envelope status code where `0` means success
///
/// An absent or null code passes. Anything else that is not zero,
/// including a code that is not a number at all, is an API error.
pub fn api_status(code: Option<&Value>, message: Option<String>) -> Result<(), SourceError> {
    let code = match code {
        None | Some(Value::Null) => return Ok(()),
        Some(value) => match integer(value) {
            Some(0) => return Ok(()),
            Some(n) => n.to_string(),
            None => match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        },
    };
    Err(SourceError::Api {
        code,
        message: message.unwrap_or_default(),
    })
}
