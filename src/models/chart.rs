//! Chart generation models

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A single point keyed by an opaque category label
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPoint {
    pub label: String,
    pub value: f64,
}

/// A single point keyed by a UTC timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct TimePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Ordered series of points; insertion order is chronological order.
#[derive(Debug, Clone, PartialEq)]
pub enum Series {
    Labelled(Vec<LabelPoint>),
    Timed(Vec<TimePoint>),
}

impl Series {
    pub fn len(&self) -> usize {
        match self {
            Series::Labelled(points) => points.len(),
            Series::Timed(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> Vec<f64> {
        match self {
            Series::Labelled(points) => points.iter().map(|p| p.value).collect(),
            Series::Timed(points) => points.iter().map(|p| p.value).collect(),
        }
    }

    /// Pad a series with fewer than two points into something drawable.
    ///
    /// Returns the series unchanged when it already has two or more points.
    pub fn normalized(self) -> Series {
        match self {
            Series::Labelled(points) if points.len() < 2 => {
                let mut points = points.into_iter();
                match points.next() {
                    Some(only) => Series::Labelled(vec![
                        LabelPoint {
                            label: "Start".to_string(),
                            value: only.value,
                        },
                        only,
                    ]),
                    None => Series::flat_zero(),
                }
            }
            Series::Timed(points) if points.len() < 2 => match points.first() {
                Some(only) => Series::Timed(vec![only.clone(), only.clone()]),
                None => Series::flat_zero(),
            },
            other => other,
        }
    }

    fn flat_zero() -> Series {
        Series::Labelled(vec![
            LabelPoint {
                label: "Start".to_string(),
                value: 0.0,
            },
            LabelPoint {
                label: "End".to_string(),
                value: 0.0,
            },
        ])
    }
}

/// Kind of chart to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum ChartType {
    #[default]
    Balance,
    Pnl,
}

impl ChartType {
    pub fn default_title(&self) -> &'static str {
        match self {
            ChartType::Balance => "SOL Balance Over Time",
            ChartType::Pnl => "PnL Performance",
        }
    }

    pub fn default_y_label(&self) -> &'static str {
        match self {
            ChartType::Balance => "SOL Balance",
            ChartType::Pnl => "PnL %",
        }
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "balance" => Ok(ChartType::Balance),
            "pnl" => Ok(ChartType::Pnl),
            other => Err(format!("Unknown chart type: '{}'. Use: balance, pnl", other)),
        }
    }
}

impl TryFrom<String> for ChartType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartType::Balance => write!(f, "balance"),
            ChartType::Pnl => write!(f, "pnl"),
        }
    }
}

/// Visual options for a single render call
#[derive(Debug, Clone, PartialEq)]
pub struct StyleConfig {
    pub dark_mode: bool,
    pub compact_mode: bool,
    pub chart_type: ChartType,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub title: Option<String>,
    pub show_value_labels: bool,
    pub is_synthetic: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            dark_mode: false,
            compact_mode: false,
            chart_type: ChartType::Balance,
            x_label: None,
            y_label: None,
            title: None,
            show_value_labels: true,
            is_synthetic: false,
        }
    }
}

impl StyleConfig {
    pub fn title_text(&self) -> &str {
        self.title
            .as_deref()
            .unwrap_or_else(|| self.chart_type.default_title())
    }

    pub fn y_label_text(&self) -> &str {
        self.y_label
            .as_deref()
            .unwrap_or_else(|| self.chart_type.default_y_label())
    }

    /// Canvas size in pixels: 8x4 in (or 6x3 in compact) at 100 DPI
    pub fn canvas_size(&self) -> (u32, u32) {
        if self.compact_mode {
            (600, 300)
        } else {
            (800, 400)
        }
    }
}

/// A parsed payload ready for rendering
#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub series: Series,
    pub style: StyleConfig,
}
