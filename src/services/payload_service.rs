use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::models::{ChartRequest, ChartType, LabelPoint, Series, StyleConfig, TimePoint};
use crate::utils::errors::ChartError;

const TIME_KEYS: [&str; 2] = ["timestamp", "x"];
const VALUE_KEYS: [&str; 3] = ["value", "sol_balance", "y"];

/// Style values set explicitly on the command line
///
/// These win over anything carried in the payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleOverrides {
    pub dark_mode: Option<bool>,
    pub compact_mode: Option<bool>,
    pub chart_type: Option<ChartType>,
}

/// Parse a raw JSON payload into a chart request
///
/// Accepts a flat array of points or an object with a `data` array plus
/// optional style fields. Malformed JSON and unusable shapes are errors;
/// malformed individual points are skipped or defaulted with a warning.
pub fn parse_payload(raw: &str, overrides: &StyleOverrides) -> Result<ChartRequest, ChartError> {
    let payload: Value = serde_json::from_str(raw.trim())?;

    let (points, options) = match payload {
        Value::Array(points) => (points, Map::new()),
        Value::Object(mut object) => match object.remove("data") {
            Some(Value::Array(points)) => (points, object),
            Some(other) => {
                return Err(ChartError::InvalidPayload(format!(
                    "'data' must be an array, got {}",
                    json_kind(&other)
                )))
            }
            None => {
                return Err(ChartError::InvalidPayload(
                    "object payload is missing a 'data' array".to_string(),
                ))
            }
        },
        other => {
            return Err(ChartError::InvalidPayload(format!(
                "expected an array or object, got {}",
                json_kind(&other)
            )))
        }
    };

    let style = build_style(read_options(options)?, overrides);
    let series = build_series(&points);

    tracing::debug!(
        "Parsed payload: {} point(s), chart_type={}, dark={}, compact={}",
        series.len(),
        style.chart_type,
        style.dark_mode,
        style.compact_mode
    );

    Ok(ChartRequest { series, style })
}

/// Style fields an object payload may carry next to `data`
///
/// Unknown keys are ignored; present keys must have the right JSON type.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PayloadOptions {
    chart_type: Option<ChartType>,
    dark_mode: Option<bool>,
    compact_mode: Option<bool>,
    x_axis_label: Option<String>,
    y_axis_label: Option<String>,
    title: Option<String>,
    show_value_labels: Option<bool>,
    is_synthetic: Option<bool>,
}

fn read_options(options: Map<String, Value>) -> Result<PayloadOptions, ChartError> {
    if options.is_empty() {
        return Ok(PayloadOptions::default());
    }
    serde_json::from_value(Value::Object(options)).map_err(|e| ChartError::InvalidPayload(e.to_string()))
}

fn build_style(options: PayloadOptions, overrides: &StyleOverrides) -> StyleConfig {
    let defaults = StyleConfig::default();

    StyleConfig {
        dark_mode: overrides
            .dark_mode
            .or(options.dark_mode)
            .unwrap_or(defaults.dark_mode),
        compact_mode: overrides
            .compact_mode
            .or(options.compact_mode)
            .unwrap_or(defaults.compact_mode),
        chart_type: overrides
            .chart_type
            .or(options.chart_type)
            .unwrap_or(defaults.chart_type),
        x_label: non_blank(options.x_axis_label),
        y_label: non_blank(options.y_axis_label),
        title: non_blank(options.title),
        show_value_labels: options.show_value_labels.unwrap_or(defaults.show_value_labels),
        is_synthetic: options.is_synthetic.unwrap_or(defaults.is_synthetic),
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|s| !s.trim().is_empty())
}

/// Timed when no point has a label and at least one has a time key
fn is_timed(points: &[Value]) -> bool {
    let objects = || points.iter().filter_map(Value::as_object);
    !objects().any(|p| p.contains_key("label"))
        && objects().any(|p| TIME_KEYS.iter().any(|k| p.contains_key(*k)))
}

fn build_series(points: &[Value]) -> Series {
    if is_timed(points) {
        Series::Timed(
            points
                .iter()
                .enumerate()
                .filter_map(|(i, p)| time_point(i, p))
                .collect(),
        )
    } else {
        Series::Labelled(
            points
                .iter()
                .enumerate()
                .filter_map(|(i, p)| label_point(i, p))
                .collect(),
        )
    }
}

fn label_point(index: usize, point: &Value) -> Option<LabelPoint> {
    let Some(object) = point.as_object() else {
        tracing::warn!("Skipping point {}: expected an object, got {}", index, json_kind(point));
        return None;
    };

    let label = match object.get("label") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let value = match find_value(object) {
        Some(raw) => coerce_f64(raw).unwrap_or_else(|| {
            tracing::warn!("Point {} has non-numeric value {}, using 0", index, raw);
            0.0
        }),
        None => {
            tracing::warn!("Point {} has no value, using 0", index);
            0.0
        }
    };

    Some(LabelPoint { label, value })
}

fn time_point(index: usize, point: &Value) -> Option<TimePoint> {
    let Some(object) = point.as_object() else {
        tracing::warn!("Skipping point {}: expected an object, got {}", index, json_kind(point));
        return None;
    };

    let Some(raw_time) = TIME_KEYS.iter().find_map(|k| object.get(*k)) else {
        tracing::warn!("Skipping point {}: no timestamp", index);
        return None;
    };
    let Some(timestamp) = parse_timestamp(raw_time) else {
        tracing::warn!("Skipping point {}: unparseable timestamp {}", index, raw_time);
        return None;
    };

    let Some(value) = find_value(object).and_then(coerce_f64) else {
        tracing::warn!("Skipping point {}: missing or non-numeric value", index);
        return None;
    };

    Some(TimePoint { timestamp, value })
}

fn find_value(object: &Map<String, Value>) -> Option<&Value> {
    VALUE_KEYS.iter().find_map(|k| object.get(*k))
}

/// Numbers pass through; numeric strings are parsed; everything else fails
fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Parse an ISO-8601 timestamp or a numeric epoch value
///
/// Naive date-times are read as UTC. Numbers above 1e12 in magnitude are
/// taken as milliseconds, anything smaller as seconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Number(n) => {
            let raw = n.as_f64()?;
            if !raw.is_finite() {
                return None;
            }
            if raw.abs() > 1e12 {
                DateTime::<Utc>::from_timestamp_millis(raw as i64)
            } else {
                DateTime::<Utc>::from_timestamp(raw as i64, 0)
            }
        }
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
