use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::models::ChartType;

/// Smallest half-height of a y-axis built around a single value
pub const MIN_AXIS_MARGIN: f64 = 1.0;

/// Most value labels drawn on one chart
pub const MAX_VALUE_LABELS: usize = 8;

/// Most tick labels on a time axis
pub const MAX_TIME_TICKS: usize = 10;

const HOUR: i64 = 3_600;
const DAY: i64 = 86_400;
const WEEK: i64 = 7 * DAY;

/// Y-axis range padded for the chart type
///
/// Balance charts keep the lower bound at or above zero when every value
/// is positive; PnL charts always keep zero strictly inside the range.
pub fn y_bounds(values: &[f64], chart_type: ChartType) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if !min.is_finite() || !max.is_finite() {
        return (-MIN_AXIS_MARGIN, MIN_AXIS_MARGIN);
    }

    let (lower, upper) = match chart_type {
        ChartType::Balance => {
            let lower = if min > 0.0 {
                min * 0.9
            } else if min < 0.0 {
                min * 1.1
            } else {
                0.0
            };
            (lower, max + max.abs() * 0.1)
        }
        ChartType::Pnl => {
            let padding = min.abs().max(max.abs()) * 0.2;
            ((min - padding).min(-padding), (max + padding).max(padding))
        }
    };

    if min == max || upper - lower <= f64::EPSILON {
        return degenerate_bounds(min, chart_type);
    }

    finite_bounds(lower, upper)
}

fn degenerate_bounds(value: f64, chart_type: ChartType) -> (f64, f64) {
    let margin = (value.abs() * 0.1).max(MIN_AXIS_MARGIN);
    let (lower, upper) = match chart_type {
        ChartType::Balance if value > 0.0 => ((value - margin).max(0.0), value + margin),
        ChartType::Balance => (value - margin, value + margin),
        ChartType::Pnl => ((value - margin).min(-margin), (value + margin).max(margin)),
    };
    finite_bounds(lower, upper)
}

/// Keep padded bounds and their span representable near `f64::MAX`
///
/// Plotters cannot lay out an infinite range, so overflowed bounds are
/// clamped and the range is halved when its width still overflows.
fn finite_bounds(lower: f64, upper: f64) -> (f64, f64) {
    let lower = lower.max(-f64::MAX);
    let upper = upper.min(f64::MAX);
    if (upper - lower).is_finite() {
        (lower, upper)
    } else {
        tracing::warn!("Y-axis range overflows f64, narrowing to {:e}..{:e}", lower / 2.0, upper / 2.0);
        (lower / 2.0, upper / 2.0)
    }
}

/// Tick spacing for a time axis, picked from the covered span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeGranularity {
    Hour,
    Day,
    Week,
    Month,
}

impl TimeGranularity {
    pub fn for_span(span_seconds: i64) -> TimeGranularity {
        if span_seconds < DAY {
            TimeGranularity::Hour
        } else if span_seconds < 14 * DAY {
            TimeGranularity::Day
        } else if span_seconds < 180 * DAY {
            TimeGranularity::Week
        } else {
            TimeGranularity::Month
        }
    }

    pub fn label_format(&self) -> &'static str {
        match self {
            TimeGranularity::Hour => "%H:%M",
            TimeGranularity::Day | TimeGranularity::Week => "%b %d",
            TimeGranularity::Month => "%b %Y",
        }
    }
}

/// Time axis ticks in epoch seconds, aligned to unit boundaries in UTC
///
/// Ticks fall inside `start..=end` and are thinned to at most
/// [`MAX_TIME_TICKS`]. When no boundary falls inside the range the start
/// itself is used as the only tick.
pub fn time_ticks(start: i64, end: i64, granularity: TimeGranularity) -> Vec<i64> {
    let mut ticks = match granularity {
        TimeGranularity::Hour => aligned_ticks(start, end, HOUR, 0),
        TimeGranularity::Day => aligned_ticks(start, end, DAY, 0),
        // 1970-01-01 was a Thursday; Mondays sit 4 days later.
        TimeGranularity::Week => aligned_ticks(start, end, WEEK, 4 * DAY),
        TimeGranularity::Month => month_ticks(start, end),
    };

    if ticks.is_empty() {
        ticks.push(start);
    }

    thin(ticks, MAX_TIME_TICKS)
}

fn aligned_ticks(start: i64, end: i64, step: i64, offset: i64) -> Vec<i64> {
    let first = (start - offset).div_euclid(step) * step + offset;
    let first = if first < start { first + step } else { first };
    let mut ticks = Vec::new();
    let mut tick = first;
    while tick <= end {
        ticks.push(tick);
        tick += step;
    }
    ticks
}

fn month_ticks(start: i64, end: i64) -> Vec<i64> {
    let Some(start_dt) = DateTime::<Utc>::from_timestamp(start, 0) else {
        return Vec::new();
    };

    let (mut year, mut month) = (start_dt.year(), start_dt.month());
    let mut ticks = Vec::new();
    loop {
        let Some(tick) = NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp())
        else {
            break;
        };
        if tick > end {
            break;
        }
        if tick >= start {
            ticks.push(tick);
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    ticks
}

fn thin(ticks: Vec<i64>, max: usize) -> Vec<i64> {
    if ticks.len() <= max || max == 0 {
        return ticks;
    }
    let stride = ticks.len().div_ceil(max);
    ticks.into_iter().step_by(stride).collect()
}

/// Format an epoch-seconds tick for the axis
pub fn format_time_tick(seconds: i64, granularity: TimeGranularity) -> String {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .map(|dt| dt.format(granularity.label_format()).to_string())
        .unwrap_or_default()
}

/// Indices of points that get a value label
///
/// Always includes the first, last, maximum and minimum points, then fills
/// the remaining budget with evenly spaced points. Series no longer than
/// `max_labels` are labelled in full.
pub fn select_annotated_indices(values: &[f64], max_labels: usize) -> Vec<usize> {
    let n = values.len();
    if n == 0 || max_labels == 0 {
        return Vec::new();
    }
    if n <= max_labels {
        return (0..n).collect();
    }

    let mut selected = vec![0, n - 1];
    for idx in [argmax(values), argmin(values)] {
        if !selected.contains(&idx) {
            selected.push(idx);
        }
    }

    let budget = max_labels.saturating_sub(selected.len());
    if budget > 0 {
        let step = n as f64 / (budget + 1) as f64;
        for k in 1..=budget {
            let idx = ((k as f64) * step).round() as usize;
            if idx < n && !selected.contains(&idx) {
                selected.push(idx);
            }
        }
    }

    selected.sort_unstable();
    selected
}

pub fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}

pub fn argmin(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, &v)| if v < best.1 { (i, v) } else { best })
        .0
}

/// Text drawn next to an annotated point
pub fn format_value_label(value: f64, chart_type: ChartType) -> String {
    match chart_type {
        ChartType::Pnl if value.abs() < 100.0 => format!("{:+.1}%", value),
        ChartType::Pnl => format!("{:+.0}%", value),
        ChartType::Balance if value < 10.0 => format!("{:.2}", value),
        ChartType::Balance if value < 100.0 => format!("{:.1}", value),
        ChartType::Balance => format!("{:.0}", value),
    }
}

/// Tick label on the y-axis
pub fn format_axis_value(value: f64, chart_type: ChartType) -> String {
    let magnitude = value.abs();
    let body = if magnitude >= 100.0 {
        format!("{:.0}", value)
    } else if magnitude >= 10.0 {
        format!("{:.1}", value)
    } else {
        format!("{:.2}", value)
    };
    match chart_type {
        ChartType::Balance => body,
        ChartType::Pnl => format!("{}%", body),
    }
}

/// Split a polyline into the parts above and below zero
///
/// Both outputs span the same x-range as the input. The first is clamped
/// to `y >= 0`, the second to `y <= 0`, and every zero crossing gets an
/// interpolated point so each fill meets the baseline exactly.
pub fn split_at_zero(points: &[(f64, f64)]) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
    let mut above = Vec::with_capacity(points.len() + 2);
    let mut below = Vec::with_capacity(points.len() + 2);

    for (i, &(x, y)) in points.iter().enumerate() {
        if i > 0 {
            let (px, py) = points[i - 1];
            if (py > 0.0 && y < 0.0) || (py < 0.0 && y > 0.0) {
                let cross_x = px + (x - px) * (py / (py - y));
                above.push((cross_x, 0.0));
                below.push((cross_x, 0.0));
            }
        }
        above.push((x, y.max(0.0)));
        below.push((x, y.min(0.0)));
    }

    (above, below)
}
