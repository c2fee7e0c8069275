//! Conversion of decoded `speedtest --json` output into [`SpeedTestResult`]

use crate::error::{AppError, Result};
use crate::models::SpeedTestResult;
use serde_json::Value;

/// Extracts the consumed fields from a decoded result document.
///
/// Only `server.id`, `server.sponsor`, `client.ip`, `client.country`,
/// `download`, `upload` and `ping` are read; everything else in the
/// document is ignored.
pub struct ResultParser;

impl ResultParser {
    /// Parse a decoded JSON document.
    ///
    /// Fails with [`AppError::MalformedResult`] when a field is missing,
    /// has the wrong type, or a numeric field is not a finite number.
    pub fn parse(raw: &Value) -> Result<SpeedTestResult> {
        Ok(SpeedTestResult {
            test_id: identifier(raw, "/server/id")?,
            client_ip: text(raw, "/client/ip")?,
            country: text(raw, "/client/country")?,
            sponsor: text(raw, "/server/sponsor")?,
            download_bytes_per_sec: number(raw, "/download")?,
            upload_bytes_per_sec: number(raw, "/upload")?,
            ping_milliseconds: number(raw, "/ping")?,
        })
    }
}

/// `/server/id` -> `server.id`
fn display_name(pointer: &str) -> String {
    pointer.trim_start_matches('/').replace('/', ".")
}

fn field<'a>(raw: &'a Value, pointer: &str) -> Result<&'a Value> {
    match raw.pointer(pointer) {
        Some(Value::Null) | None => Err(AppError::malformed_result(format!(
            "missing field `{}`",
            display_name(pointer)
        ))),
        Some(value) => Ok(value),
    }
}

fn text(raw: &Value, pointer: &str) -> Result<String> {
    match field(raw, pointer)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(AppError::malformed_result(format!(
            "field `{}` must be a string, got {}",
            display_name(pointer),
            other
        ))),
    }
}

// Speedtest versions disagree on whether the server id is a number or a string
fn identifier(raw: &Value, pointer: &str) -> Result<String> {
    match field(raw, pointer)? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(AppError::malformed_result(format!(
            "field `{}` must be a string or number, got {}",
            display_name(pointer),
            other
        ))),
    }
}

fn number(raw: &Value, pointer: &str) -> Result<f64> {
    let value = field(raw, pointer)?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(AppError::malformed_result(format!(
            "field `{}` is not a finite number: {}",
            display_name(pointer),
            value
        ))),
    }
}
