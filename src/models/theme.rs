//! Color themes for light and dark charts

use plotters::style::RGBAColor;

/// Fill opacity used under the curve
pub const AREA_ALPHA: f64 = 0.2;

/// Direction of a series from its first to its last value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn of(values: &[f64]) -> Trend {
        match (values.first(), values.last()) {
            (Some(first), Some(last)) if last > first => Trend::Up,
            (Some(first), Some(last)) if last < first => Trend::Down,
            _ => Trend::Flat,
        }
    }
}

/// All colors a chart needs, as numeric RGBA (alpha in 0.0..=1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub positive: RGBAColor,
    pub negative: RGBAColor,
    pub background: RGBAColor,
    pub text: RGBAColor,
    pub grid: RGBAColor,
    pub annotation_box: RGBAColor,
}

impl Palette {
    pub fn light() -> Self {
        Self {
            positive: RGBAColor(22, 163, 74, 1.0),
            negative: RGBAColor(220, 38, 38, 1.0),
            background: RGBAColor(255, 255, 255, 1.0),
            text: RGBAColor(0, 0, 0, 1.0),
            grid: RGBAColor(0, 0, 0, 0.1),
            annotation_box: RGBAColor(255, 255, 255, 0.6),
        }
    }

    pub fn dark() -> Self {
        Self {
            positive: RGBAColor(34, 197, 94, 1.0),
            negative: RGBAColor(239, 68, 68, 1.0),
            background: RGBAColor(0, 0, 0, 1.0),
            text: RGBAColor(255, 255, 255, 1.0),
            grid: RGBAColor(255, 255, 255, 0.1),
            annotation_box: RGBAColor(0, 0, 0, 0.6),
        }
    }

    pub fn for_mode(dark_mode: bool) -> Self {
        if dark_mode {
            Self::dark()
        } else {
            Self::light()
        }
    }

    /// Line color for a trend; flat series count as gains
    pub fn trend_color(&self, trend: Trend) -> RGBAColor {
        match trend {
            Trend::Up | Trend::Flat => self.positive,
            Trend::Down => self.negative,
        }
    }
}

/// Same color with a new alpha
pub fn with_alpha(color: RGBAColor, alpha: f64) -> RGBAColor {
    RGBAColor(color.0, color.1, color.2, alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_direction() {
        assert_eq!(Trend::of(&[1.0, 2.0, 3.0]), Trend::Up);
        assert_eq!(Trend::of(&[3.0, 2.0, 1.0]), Trend::Down);
        assert_eq!(Trend::of(&[2.0, 5.0, 2.0]), Trend::Flat);
        assert_eq!(Trend::of(&[]), Trend::Flat);
    }

    #[test]
    fn test_trend_color_selection() {
        let light = Palette::light();
        assert_eq!(light.trend_color(Trend::Up), light.positive);
        assert_eq!(light.trend_color(Trend::Flat), light.positive);
        assert_eq!(light.trend_color(Trend::Down), light.negative);

        let dark = Palette::for_mode(true);
        assert_eq!(dark.trend_color(Trend::Down), RGBAColor(239, 68, 68, 1.0));
        assert_eq!(dark.background, RGBAColor(0, 0, 0, 1.0));
    }

    #[test]
    fn test_with_alpha_keeps_channels() {
        let faded = with_alpha(Palette::light().positive, AREA_ALPHA);
        assert_eq!(faded, RGBAColor(22, 163, 74, 0.2));
    }
}
