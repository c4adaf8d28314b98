use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::models::theme::{with_alpha, AREA_ALPHA};
use crate::models::{ChartType, Palette, Series, StyleConfig, Trend};
use crate::services::axis_service::{self, TimeGranularity, MAX_VALUE_LABELS};
use crate::utils::encoding;
use crate::utils::errors::{extract_clean_error, ChartError};

const FONT: &str = "sans-serif";
const WATERMARK: &str = "ESTIMATED DATA";

/// Sizes that change between the normal and compact presets
#[derive(Debug, Clone, Copy)]
struct Layout {
    margin: u32,
    line_width: u32,
    marker_size: u32,
    tick_font: f64,
    title_font: f64,
    desc_font: f64,
    annotation_font: f64,
    y_label_area: u32,
}

impl Layout {
    fn for_style(style: &StyleConfig) -> Self {
        if style.compact_mode {
            Self {
                margin: 6,
                line_width: 2,
                marker_size: 3,
                tick_font: 11.0,
                title_font: 16.0,
                desc_font: 12.0,
                annotation_font: 11.0,
                y_label_area: 48,
            }
        } else {
            Self {
                margin: 10,
                line_width: 3,
                marker_size: 4,
                tick_font: 13.0,
                title_font: 20.0,
                desc_font: 14.0,
                annotation_font: 12.0,
                y_label_area: 64,
            }
        }
    }

    /// Height reserved under the plot for tick labels and the x description
    fn x_label_area(&self, tick_texts: &[String], rotated: bool, has_desc: bool, canvas_height: u32) -> u32 {
        let text_height = (self.tick_font * 1.6) as u32;
        let ticks = if rotated {
            let widest = tick_texts.iter().map(|t| t.chars().count()).max().unwrap_or(0);
            (estimate_text_width(widest, self.tick_font) + 10).min(canvas_height / 3)
        } else {
            text_height + 8
        };
        if has_desc {
            ticks + (self.desc_font * 1.6) as u32
        } else {
            ticks
        }
    }
}

enum TickLabels {
    Categories(Vec<String>),
    Time(TimeGranularity),
}

/// Horizontal axis: plotted range, tick positions and how to label them
struct XAxis {
    lo: f64,
    hi: f64,
    ticks: Vec<f64>,
    labels: TickLabels,
}

impl XAxis {
    fn for_series(series: &Series) -> XAxis {
        match series {
            Series::Labelled(points) => {
                let last = points.len().saturating_sub(1) as f64;
                let pad = (last * 0.05).max(0.1);
                XAxis {
                    lo: -pad,
                    hi: last + pad,
                    ticks: (0..points.len()).map(|i| i as f64).collect(),
                    labels: TickLabels::Categories(points.iter().map(|p| p.label.clone()).collect()),
                }
            }
            Series::Timed(points) => {
                let first = points.iter().map(|p| p.timestamp.timestamp()).min().unwrap_or(0);
                let last = points.iter().map(|p| p.timestamp.timestamp()).max().unwrap_or(0);
                let span = last - first;
                let granularity = TimeGranularity::for_span(span);
                // A single instant still needs a visible range
                let pad = if span == 0 { 1800.0 } else { span as f64 * 0.05 };
                XAxis {
                    lo: first as f64 - pad,
                    hi: last as f64 + pad,
                    ticks: axis_service::time_ticks(first, last, granularity)
                        .into_iter()
                        .map(|t| t as f64)
                        .collect(),
                    labels: TickLabels::Time(granularity),
                }
            }
        }
    }

    fn format(&self, x: f64) -> String {
        match &self.labels {
            TickLabels::Categories(labels) => {
                let idx = x.round();
                if (x - idx).abs() > 1e-6 || idx < 0.0 {
                    return String::new();
                }
                labels.get(idx as usize).cloned().unwrap_or_default()
            }
            TickLabels::Time(granularity) => axis_service::format_time_tick(x.round() as i64, *granularity),
        }
    }

    fn tick_texts(&self) -> Vec<String> {
        self.ticks.iter().map(|t| self.format(*t)).collect()
    }
}

/// Render a series as PNG bytes
///
/// Never fails: short series are padded, and drawing errors produce an
/// image carrying the error message instead of the chart.
pub fn render(series: Series, style: &StyleConfig) -> Vec<u8> {
    let series = if series.len() < 2 {
        tracing::warn!(
            "Not enough data points for chart ({} found), padding to two",
            series.len()
        );
        series.normalized()
    } else {
        series
    };

    match draw_chart(&series, style) {
        Ok(png) => {
            tracing::info!("✓ Chart generated successfully: {} bytes", png.len());
            png
        }
        Err(e) => {
            tracing::error!("Error generating chart: {}", e);
            render_error_image(&e.to_string(), style)
        }
    }
}

/// Render a series and encode the PNG as base64 text
pub fn render_base64(series: Series, style: &StyleConfig) -> String {
    encoding::to_base64(&render(series, style))
}

fn drawing_error<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Drawing(e.to_string())
}

fn estimate_text_width(chars: usize, font_size: f64) -> u32 {
    (chars as f64 * font_size * 0.6).ceil() as u32
}

fn plot_points(series: &Series) -> Vec<(f64, f64)> {
    match series {
        Series::Labelled(points) => points
            .iter()
            .enumerate()
            .map(|(i, p)| (i as f64, p.value))
            .collect(),
        Series::Timed(points) => points
            .iter()
            .map(|p| (p.timestamp.timestamp() as f64, p.value))
            .collect(),
    }
}

/// Whether x tick labels are drawn vertically
///
/// Compact charts always rotate; normal charts only when horizontal labels
/// would overlap.
fn labels_need_rotation(tick_texts: &[String], plot_width: u32, font_size: f64, compact: bool) -> bool {
    if tick_texts.is_empty() {
        return false;
    }
    if compact {
        return true;
    }
    let slot = plot_width as f64 / tick_texts.len() as f64;
    let widest = tick_texts.iter().map(|t| t.chars().count()).max().unwrap_or(0);
    estimate_text_width(widest, font_size) as f64 > slot * 0.9
}

fn draw_chart(series: &Series, style: &StyleConfig) -> Result<Vec<u8>, ChartError> {
    let (width, height) = style.canvas_size();
    let palette = Palette::for_mode(style.dark_mode);
    let layout = Layout::for_style(style);

    let values = series.values();
    let trend = Trend::of(&values);
    let line_color = palette.trend_color(trend);
    let x_axis = XAxis::for_series(series);
    let (y_lo, y_hi) = axis_service::y_bounds(&values, style.chart_type);
    // Only values beyond a narrowed overflow range are affected
    let points: Vec<(f64, f64)> = plot_points(series)
        .into_iter()
        .map(|(x, y)| (x, y.clamp(y_lo, y_hi)))
        .collect();

    let show_chrome = !style.compact_mode;
    let tick_texts = x_axis.tick_texts();
    let plot_width = width.saturating_sub(layout.y_label_area + 2 * layout.margin);
    let rotated = labels_need_rotation(&tick_texts, plot_width, layout.tick_font, style.compact_mode);
    let x_desc = style.x_label.as_deref().filter(|_| show_chrome);
    let x_label_area = layout.x_label_area(&tick_texts, rotated, x_desc.is_some(), height);

    tracing::debug!(
        "Drawing {} chart: {} point(s), trend {:?}, y-range {:.4}..{:.4}, {}x{}",
        style.chart_type,
        points.len(),
        trend,
        y_lo,
        y_hi,
        width,
        height
    );

    let mut buffer = vec![0u8; (width as usize) * (height as usize) * 3];

    // The drawing area borrows the buffer; it is dropped at the end of
    // this block on every path, before the pixels are encoded.
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&palette.background).map_err(drawing_error)?;

        let mut builder = ChartBuilder::on(&root);
        builder
            .margin(layout.margin)
            .margin_right(layout.margin * 2)
            .x_label_area_size(x_label_area)
            .y_label_area_size(layout.y_label_area);
        if show_chrome {
            builder.caption(
                style.title_text(),
                (FONT, layout.title_font).into_font().color(&palette.text),
            );
        }

        let mut chart = builder
            .build_cartesian_2d(x_axis.lo..x_axis.hi, y_lo..y_hi)
            .map_err(drawing_error)?;

        let x_formatter = |_: &f64| String::new();
        let y_formatter = |y: &f64| axis_service::format_axis_value(*y, style.chart_type);
        let tick_style = (FONT, layout.tick_font).into_font().color(&palette.text);

        // X ticks are placed by hand below, so the mesh only draws y labels
        let mut mesh = chart.configure_mesh();
        mesh.light_line_style(palette.grid.stroke_width(1))
            .bold_line_style(palette.grid.stroke_width(1))
            .axis_style(with_alpha(palette.text, 0.6).stroke_width(1))
            .disable_x_mesh()
            .set_tick_mark_size(LabelAreaPosition::Bottom, 0)
            .x_label_formatter(&x_formatter)
            .y_labels(6)
            .y_label_formatter(&y_formatter)
            .y_label_style(tick_style.clone())
            .axis_desc_style((FONT, layout.desc_font).into_font().color(&palette.text));
        if show_chrome {
            mesh.y_desc(style.y_label_text());
            if let Some(desc) = x_desc {
                mesh.x_desc(desc);
            }
        }
        mesh.draw().map_err(drawing_error)?;

        chart
            .draw_series(x_axis.ticks.iter().map(|&t| {
                PathElement::new(vec![(t, y_lo), (t, y_hi)], palette.grid.stroke_width(1))
            }))
            .map_err(drawing_error)?;

        let x_tick_style = if rotated {
            tick_style.transform(FontTransform::Rotate90)
        } else {
            tick_style.pos(Pos::new(HPos::Center, VPos::Top))
        };
        for (tick, text) in x_axis.ticks.iter().zip(&tick_texts) {
            let (px, py) = chart.backend_coord(&(*tick, y_lo));
            let tick_mark = with_alpha(palette.text, 0.6).stroke_width(1);
            root.draw(&PathElement::new(vec![(px, py), (px, py + 4)], tick_mark))
                .map_err(drawing_error)?;
            let anchor = if rotated {
                (px + (layout.tick_font / 2.0) as i32, py + 6)
            } else {
                (px, py + 6)
            };
            root.draw_text(text, &x_tick_style, anchor)
                .map_err(drawing_error)?;
        }

        match style.chart_type {
            ChartType::Balance => {
                let baseline = 0.0_f64.clamp(y_lo, y_hi);
                chart
                    .draw_series(AreaSeries::new(
                        points.iter().copied(),
                        baseline,
                        with_alpha(line_color, AREA_ALPHA),
                    ))
                    .map_err(drawing_error)?;
            }
            ChartType::Pnl => {
                let (above, below) = axis_service::split_at_zero(&points);
                chart
                    .draw_series(AreaSeries::new(above, 0.0, with_alpha(palette.positive, AREA_ALPHA)))
                    .map_err(drawing_error)?;
                chart
                    .draw_series(AreaSeries::new(below, 0.0, with_alpha(palette.negative, AREA_ALPHA)))
                    .map_err(drawing_error)?;
                chart
                    .draw_series(LineSeries::new(
                        vec![(x_axis.lo, 0.0), (x_axis.hi, 0.0)],
                        with_alpha(palette.text, 0.35).stroke_width(1),
                    ))
                    .map_err(drawing_error)?;
            }
        }

        chart
            .draw_series(LineSeries::new(
                points.iter().copied(),
                line_color.stroke_width(layout.line_width),
            ))
            .map_err(drawing_error)?;
        chart
            .draw_series(
                points
                    .iter()
                    .map(|&p| Circle::new(p, layout.marker_size, line_color.filled())),
            )
            .map_err(drawing_error)?;

        if style.show_value_labels && show_chrome {
            let indices = axis_service::select_annotated_indices(&values, MAX_VALUE_LABELS);
            let last = values.len().saturating_sub(1);
            let min_idx = axis_service::argmin(&values);
            let font_px = layout.annotation_font as i32;

            let labels = indices.into_iter().map(|idx| {
                let below = idx == min_idx && idx != 0 && idx != last;
                let text = axis_service::format_value_label(values[idx], style.chart_type);
                let half_w = estimate_text_width(text.chars().count(), layout.annotation_font) as i32 / 2 + 3;
                let (text_y, v_anchor, box_top) = if below {
                    (8, VPos::Top, 6)
                } else {
                    (-8, VPos::Bottom, -8 - font_px - 4)
                };
                let text_style = (FONT, layout.annotation_font)
                    .into_font()
                    .color(&palette.text)
                    .pos(Pos::new(HPos::Center, v_anchor));

                EmptyElement::at(points[idx])
                    + Rectangle::new(
                        [(-half_w, box_top), (half_w, box_top + font_px + 6)],
                        palette.annotation_box.filled(),
                    )
                    + Text::new(text, (0, text_y), text_style)
            });
            chart.draw_series(labels).map_err(drawing_error)?;
        }

        if style.is_synthetic {
            let watermark_style = (FONT, height as f64 / 8.0)
                .into_font()
                .color(&with_alpha(palette.text, 0.12))
                .pos(Pos::new(HPos::Center, VPos::Center));
            root.draw_text(
                WATERMARK,
                &watermark_style,
                (width as i32 / 2, height as i32 / 2),
            )
            .map_err(drawing_error)?;
        }

        root.present().map_err(drawing_error)?;
    }

    encoding::encode_png(buffer, width, height)
}

/// Draw an error message as the chart content
///
/// Falls back to a plain background canvas if text cannot be drawn either,
/// so callers always receive a well-formed PNG of the preset size.
pub fn render_error_image(message: &str, style: &StyleConfig) -> Vec<u8> {
    let (width, height) = style.canvas_size();
    let palette = Palette::for_mode(style.dark_mode);

    match draw_error(message, width, height, &palette) {
        Ok(png) => png,
        Err(e) => {
            tracing::error!("Could not draw error image: {}", e);
            blank_canvas(width, height, &palette)
        }
    }
}

fn draw_error(message: &str, width: u32, height: u32, palette: &Palette) -> Result<Vec<u8>, ChartError> {
    let clean = extract_clean_error(message);
    let max_chars = (width as usize / 9).max(10);
    let lines = wrap_text(&clean, max_chars);

    let mut buffer = vec![0u8; (width as usize) * (height as usize) * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&palette.background).map_err(drawing_error)?;

        let center_x = width as i32 / 2;
        let heading = (FONT, 20.0)
            .into_font()
            .color(&palette.negative)
            .pos(Pos::new(HPos::Center, VPos::Center));
        root.draw_text("Error generating chart", &heading, (center_x, height as i32 / 3))
            .map_err(drawing_error)?;

        let body = (FONT, 14.0)
            .into_font()
            .color(&palette.text)
            .pos(Pos::new(HPos::Center, VPos::Top));
        let mut y = height as i32 / 3 + 24;
        for line in lines.iter().take(6) {
            root.draw_text(line, &body, (center_x, y)).map_err(drawing_error)?;
            y += 20;
        }

        root.present().map_err(drawing_error)?;
    }

    encoding::encode_png(buffer, width, height)
}

fn blank_canvas(width: u32, height: u32, palette: &Palette) -> Vec<u8> {
    let bg = palette.background;
    encoding::encode_png(encoding::solid_canvas(width, height, (bg.0, bg.1, bg.2)), width, height)
        .unwrap_or_else(|e| {
            tracing::error!("Could not encode blank canvas: {}", e);
            Vec::new()
        })
}

/// Greedy word wrap; words longer than a line are split
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: String = word.to_string();
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let head: String = word.chars().take(max_chars).collect();
            word = word.chars().skip(max_chars).collect();
            lines.push(head);
        }
        let needed = current.chars().count() + word.chars().count() + usize::from(!current.is_empty());
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LabelPoint, TimePoint};
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use chrono::{TimeZone, Utc};

    fn labelled(values: &[f64]) -> Series {
        Series::Labelled(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| LabelPoint {
                    label: format!("Day {}", i + 1),
                    value: *v,
                })
                .collect(),
        )
    }

    fn dimensions(png: &[u8]) -> (u32, u32) {
        let decoded = image::load_from_memory(png).expect("Output is not a decodable image");
        (decoded.width(), decoded.height())
    }

    /// Draw without the error-image fallback so a failure fails the test
    fn drawn(series: &Series, style: &StyleConfig) -> Vec<u8> {
        match draw_chart(series, style) {
            Ok(png) => png,
            Err(e) => panic!("chart drawing failed: {}", e),
        }
    }

    fn has_color(png: &[u8], color: RGBAColor) -> bool {
        let rgb = image::load_from_memory(png)
            .expect("Output is not a decodable image")
            .to_rgb8();
        rgb.pixels().any(|p| p.0 == [color.0, color.1, color.2])
    }

    #[test]
    fn test_two_point_balance_chart() {
        let series = Series::Labelled(vec![
            LabelPoint { label: "Jan 1".to_string(), value: 1.2 },
            LabelPoint { label: "Jan 2".to_string(), value: 0.9 },
        ]);
        let style = StyleConfig::default();
        let png = drawn(&series, &style);

        assert!(encoding::is_png(&png));
        assert_eq!(dimensions(&png), (800, 400));
        assert_eq!(render(series, &style), png);
    }

    #[test]
    fn test_compact_chart_size() {
        let style = StyleConfig {
            compact_mode: true,
            ..Default::default()
        };
        let png = drawn(&labelled(&[1.0, 2.0, 3.0]), &style);
        assert_eq!(dimensions(&png), (600, 300));
    }

    #[test]
    fn test_line_color_follows_trend() {
        let style = StyleConfig::default();
        let palette = Palette::for_mode(false);

        let rising = drawn(&labelled(&[1.0, 1.5, 2.0, 3.0]), &style);
        assert!(has_color(&rising, palette.positive));
        assert!(!has_color(&rising, palette.negative));

        let falling = drawn(&labelled(&[3.0, 2.5, 2.0, 1.0]), &style);
        assert!(has_color(&falling, palette.negative));
        assert!(!has_color(&falling, palette.positive));
    }

    #[test]
    fn test_dark_mode_uses_dark_palette() {
        let style = StyleConfig {
            dark_mode: true,
            ..Default::default()
        };
        let png = drawn(&labelled(&[1.0, 2.0]), &style);
        let dark = Palette::for_mode(true);
        assert!(has_color(&png, dark.positive));
        assert!(has_color(&png, dark.background));
    }

    #[test]
    fn test_degenerate_series_still_render() {
        let style = StyleConfig::default();
        let single = Series::Labelled(vec![LabelPoint {
            label: String::new(),
            value: 5.0,
        }]);
        assert!(encoding::is_png(&drawn(&single.clone().normalized(), &style)));
        assert!(encoding::is_png(&render(single, &style)));
        assert!(encoding::is_png(&drawn(&Series::Labelled(Vec::new()).normalized(), &style)));
        assert!(encoding::is_png(&drawn(&Series::Timed(Vec::new()).normalized(), &style)));
        assert!(encoding::is_png(&drawn(&labelled(&[7.0, 7.0, 7.0]), &style)));
    }

    #[test]
    fn test_pnl_chart_crossing_zero() {
        let style = StyleConfig {
            chart_type: ChartType::Pnl,
            dark_mode: true,
            ..Default::default()
        };
        let png = drawn(&labelled(&[2.0, -3.5, 4.0, -1.0, 12.0]), &style);
        assert_eq!(dimensions(&png), (800, 400));
    }

    #[test]
    fn test_extreme_values_draw() {
        let pnl = StyleConfig {
            chart_type: ChartType::Pnl,
            ..Default::default()
        };
        assert!(draw_chart(&labelled(&[-1.5e308, 1.5e308]), &pnl).is_ok());
        assert!(draw_chart(&labelled(&[1e308, 1.7e308]), &StyleConfig::default()).is_ok());
    }

    #[test]
    fn test_timed_synthetic_chart() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let series = Series::Timed(
            (0..30)
                .map(|d| TimePoint {
                    timestamp: start + chrono::Duration::days(d),
                    value: 10.0 + d as f64 * 0.5,
                })
                .collect(),
        );
        let style = StyleConfig {
            is_synthetic: true,
            x_label: Some("Date".to_string()),
            ..Default::default()
        };
        let png = drawn(&series, &style);
        assert!(encoding::is_png(&png));
    }

    #[test]
    fn test_render_base64_round_trip() {
        let text = render_base64(labelled(&[3.0, 4.0]), &StyleConfig::default());
        assert!(!text.is_empty());
        let bytes = BASE64.decode(text).expect("Output is not base64");
        assert!(encoding::is_png(&bytes));
    }

    #[test]
    fn test_error_image_is_valid_png() {
        let png = render_error_image("Drawing failed: something broke", &StyleConfig::default());
        assert!(encoding::is_png(&png));
        assert_eq!(dimensions(&png), (800, 400));
    }

    #[test]
    fn test_category_axis_formatting() {
        let axis = XAxis::for_series(&labelled(&[1.0, 2.0, 3.0]));
        assert_eq!(axis.format(1.0), "Day 2");
        assert_eq!(axis.format(1.5), "");
        assert_eq!(axis.format(7.0), "");
        assert!(axis.lo < 0.0 && axis.hi > 2.0);
        assert_eq!(axis.ticks, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_single_instant_time_axis_is_widened() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let series = Series::Timed(vec![
            TimePoint { timestamp: ts, value: 1.0 },
            TimePoint { timestamp: ts, value: 1.0 },
        ]);
        let axis = XAxis::for_series(&series);
        assert!(axis.hi - axis.lo > 0.0);
        assert_eq!(axis.ticks, vec![ts.timestamp() as f64]);
        assert_eq!(axis.tick_texts(), vec!["12:00".to_string()]);
    }

    #[test]
    fn test_plot_points_use_index_or_epoch() {
        assert_eq!(plot_points(&labelled(&[4.0, 5.0])), vec![(0.0, 4.0), (1.0, 5.0)]);

        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let series = Series::Timed(vec![TimePoint { timestamp: ts, value: 2.0 }]);
        assert_eq!(plot_points(&series), vec![(1_709_251_200.0, 2.0)]);
    }

    #[test]
    fn test_label_rotation_when_crowded() {
        let few: Vec<String> = vec!["Jan 1".into(), "Jan 2".into()];
        assert!(!labels_need_rotation(&few, 700, 13.0, false));
        assert!(labels_need_rotation(&few, 500, 11.0, true));
        assert!(!labels_need_rotation(&[], 500, 11.0, true));

        let many: Vec<String> = (0..60).map(|i| format!("2024-01-{:02}", i % 28 + 1)).collect();
        assert!(labels_need_rotation(&many, 700, 13.0, false));
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert!(wrap_text("", 10).is_empty());
    }
}
