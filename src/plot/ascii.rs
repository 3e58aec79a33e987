//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - monthly series: `o` points joined by a `-` line
//! - category shares: horizontal `#` bars
//! - category × month pivot: shaded cells (` ░▒▓█`)

use crate::domain::CategoryMonthPivot;
use crate::report::{fmt_amount, CategoryShare};

const SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];

/// Render an evenly spaced series (one point per label) as a line chart.
pub fn render_line_chart(labels: &[String], values: &[f64], width: usize, height: usize, y_desc: &str) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let n = labels.len().min(values.len());
    if n == 0 {
        return "Plot: no data\n".to_string();
    }

    let (y_min, y_max) = y_range(&values[..n]);
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);
    let x_max = (n - 1).max(1) as f64;

    let mut grid = vec![vec![' '; width]; height];

    let cells: Vec<(usize, usize)> = values[..n]
        .iter()
        .enumerate()
        .map(|(i, &v)| (map_x(i as f64, 0.0, x_max, width), map_y(v, y_min, y_max, height)))
        .collect();

    // Draw the line first so points can overlay.
    for pair in cells.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        draw_line(&mut grid, x0, y0, x1, y1, '-');
    }
    for &(x, y) in &cells {
        grid[y][x] = 'o';
    }

    let first = &labels[0];
    let last = &labels[n - 1];

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: months=[{first}, {last}] | {y_desc}=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    let footer = if n == 1 {
        first.clone()
    } else if first.chars().count() + last.chars().count() < width {
        let w = width - first.chars().count();
        format!("{first}{last:>w$}")
    } else {
        format!("{first} .. {last}")
    };
    out.push_str(&footer);
    out.push('\n');

    out
}

/// Render category shares as horizontal bars scaled to the largest value.
pub fn render_bar_chart(shares: &[CategoryShare], width: usize) -> String {
    if shares.is_empty() {
        return "Bars: no data\n".to_string();
    }
    let width = width.max(4);
    let label_w = shares
        .iter()
        .map(|s| s.category.chars().count())
        .max()
        .unwrap_or(0)
        .min(16);
    let max = shares.iter().map(|s| s.sales).fold(0.0, f64::max);

    let mut out = String::new();
    for s in shares {
        let len = if max > 0.0 && s.sales > 0.0 {
            ((s.sales / max) * width as f64).round() as usize
        } else {
            0
        };
        let bar = "#".repeat(len.min(width));
        let pct = s
            .percent
            .map(|p| format!("{p:.1}%"))
            .unwrap_or_else(|| "n/a".to_string());
        let label: String = s.category.chars().take(label_w).collect();
        let line = format!("{label:<label_w$} |{bar:<width$}| {} {pct}", fmt_amount(s.sales));
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Render a pivot as a shaded grid, two characters per month.
pub fn render_heatmap(pivot: &CategoryMonthPivot) -> String {
    if pivot.is_empty() {
        return "Heatmap: no data\n".to_string();
    }
    let label_w = pivot
        .categories
        .iter()
        .map(|c| c.chars().count())
        .max()
        .unwrap_or(0)
        .min(16);
    let max = pivot.max_cell();

    let mut out = String::new();
    for (category, row) in pivot.categories.iter().zip(&pivot.cells) {
        let label: String = category.chars().take(label_w).collect();
        let mut line = format!("{label:<label_w$} |");
        for &v in row {
            let ch = SHADES[shade_level(v, max)];
            line.push(ch);
            line.push(ch);
        }
        line.push('|');
        out.push_str(&line);
        out.push('\n');
    }

    let first = pivot.months[0];
    let last = pivot.months[pivot.months.len() - 1];
    out.push_str(&format!("months: {first} .. {last} | max={}\n", fmt_amount(max)));
    out
}

fn shade_level(v: f64, max: f64) -> usize {
    if !(v > 0.0 && max > 0.0) {
        return 0;
    }
    let top = (SHADES.len() - 1) as f64;
    ((v / max) * top).round().clamp(1.0, top) as usize
}

fn y_range(values: &[f64]) -> (f64, f64) {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &v in values {
        if v.is_finite() {
            min_y = min_y.min(v);
            max_y = max_y.max(v);
        }
    }
    if !(min_y.is_finite() && max_y.is_finite()) {
        return (0.0, 1.0);
    }
    if max_y <= min_y {
        return (min_y - 1.0, max_y + 1.0);
    }
    (min_y, max_y)
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
