//! Plotters-powered monthly series chart widget for Ratatui.
//!
//! Why Plotters instead of Ratatui's built-in `Chart` widget?
//! - nicer axis + mesh rendering
//! - less manual work for ticks/labels
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call so `render()`
/// only draws.
pub struct SeriesPlottersChart<'a> {
    /// Line series, x = month index (oldest = 0).
    pub series: &'a [(f64, f64)],
    /// The selected month's point, drawn on top in a highlight color.
    pub highlight: Option<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
    /// Tick label formatting; the x formatter maps indices back to months.
    pub fmt_x: &'a dyn Fn(f64) -> String,
    pub fmt_y: &'a dyn Fn(f64) -> String,
}

impl<'a> Widget for SeriesPlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        // In that case, we render a small hint rather than panicking.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 10)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(6)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(WHITE)
                .bold_line_style(WHITE)
                .draw()?;

            let line_color = RGBColor(0, 255, 255); // cyan
            let highlight_color = RGBColor(255, 255, 0); // yellow

            chart.draw_series(LineSeries::new(self.series.iter().copied(), &line_color))?;
            chart.draw_series(self.series.iter().map(|&(x, y)| Pixel::new((x, y), WHITE)))?;

            // `Pixel` rather than `Circle`: the backend maps circle radii to
            // canvas units incorrectly and draws huge circles.
            if let Some((x, y)) = self.highlight {
                chart.draw_series(std::iter::once(Pixel::new((x, y), highlight_color)))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}

/// Padded y-bounds covering every value (falls back to `[0, 1]`).
pub fn y_bounds(values: impl IntoIterator<Item = f64>) -> [f64; 2] {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values.into_iter().filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return [0.0, 1.0];
    }
    if hi <= lo {
        return [lo - 1.0, hi + 1.0];
    }
    let pad = (hi - lo) * 0.05;
    [lo - pad, hi + pad]
}

/// X-bounds for `n` evenly spaced months, with half a slot of margin.
pub fn x_bounds(n: usize) -> [f64; 2] {
    [-0.5, n.saturating_sub(1) as f64 + 0.5]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn y_bounds_pads_and_handles_flat_series() {
        assert_eq!(y_bounds([0.0, 100.0]), [-5.0, 105.0]);
        assert_eq!(y_bounds([7.0, 7.0]), [6.0, 8.0]);
        assert_eq!(y_bounds(std::iter::empty()), [0.0, 1.0]);
        assert_eq!(y_bounds([f64::NAN, 2.0, 4.0]), [1.9, 4.1]);
    }

    #[test]
    fn x_bounds_surround_indices() {
        assert_eq!(x_bounds(1), [-0.5, 0.5]);
        assert_eq!(x_bounds(12), [-0.5, 11.5]);
    }
}
