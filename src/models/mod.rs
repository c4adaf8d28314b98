//! Data models for the chart command and services
//!
//! Series and style types shared by the payload adapter and the renderer.

pub mod chart;
pub mod theme;

// Re-export commonly used types for convenience
pub use chart::{ChartRequest, ChartType, LabelPoint, Series, StyleConfig, TimePoint};
pub use theme::{Palette, Trend};
