//! Ratatui-based terminal UI.
//!
//! The dashboard shows one month at a time: a category picker on the left,
//! and a tabbed chart area (monthly trend, category share, profit margin,
//! category × month heatmap) on the right.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{BarChart, Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs},
    Terminal,
};

use crate::app::pipeline::{build_view, DashboardView};
use crate::data::DatasetCache;
use crate::domain::{DashboardConfig, ExportFormat, MonthlyPeriod, SalesDataset, Selection};
use crate::error::AppError;
use crate::report::fmt_amount;

mod plotters_chart;

use plotters_chart::SeriesPlottersChart;

/// Start the TUI.
///
/// The dataset is loaded before the terminal switches to raw mode so load
/// errors print normally.
pub fn run(config: DashboardConfig) -> Result<(), AppError> {
    let mut cache = DatasetCache::new(config.cache_ttl);
    let dataset = cache.get_or_load(&config.data_path)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(config, cache, dataset);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChartTab {
    Trend,
    Categories,
    Margin,
    Heatmap,
}

impl ChartTab {
    const ALL: [ChartTab; 4] = [ChartTab::Trend, ChartTab::Categories, ChartTab::Margin, ChartTab::Heatmap];

    fn title(self) -> &'static str {
        match self {
            ChartTab::Trend => "Trend",
            ChartTab::Categories => "Category share",
            ChartTab::Margin => "Profit margin",
            ChartTab::Heatmap => "Heatmap",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

struct App {
    config: DashboardConfig,
    cache: DatasetCache,
    dataset: Arc<SalesDataset>,
    view: DashboardView,
    month: Option<MonthlyPeriod>,
    selected: BTreeSet<String>,
    category_cursor: usize,
    tab: ChartTab,
    status: String,
}

impl App {
    fn new(config: DashboardConfig, cache: DatasetCache, dataset: Arc<SalesDataset>) -> Self {
        let view = build_view(&dataset, &config.selection);
        let selected = match &config.selection.categories {
            Some(set) => set.clone(),
            None => view.categories.iter().cloned().collect(),
        };
        let status = format!("Loaded {} rows from {}", dataset.records.len(), dataset.source.display());
        Self {
            month: view.month,
            config,
            cache,
            dataset,
            view,
            selected,
            category_cursor: 0,
            tab: ChartTab::Trend,
            status,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code)? {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply one key press. Returns `true` when the session should end.
    fn handle_key(&mut self, code: KeyCode) -> Result<bool, AppError> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Left => {
                if let Some(m) = step_month(&self.view.months, self.month, true) {
                    self.month = Some(m);
                    self.refresh()?;
                }
            }
            KeyCode::Right => {
                if let Some(m) = step_month(&self.view.months, self.month, false) {
                    self.month = Some(m);
                    self.refresh()?;
                }
            }
            KeyCode::Up => {
                self.category_cursor = self.category_cursor.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.category_cursor + 1 < self.view.categories.len() {
                    self.category_cursor += 1;
                }
            }
            KeyCode::Char(' ') => {
                if let Some(category) = self.view.categories.get(self.category_cursor).cloned() {
                    toggle_category(&mut self.selected, &category);
                    self.refresh()?;
                    self.status = format!("{} of {} categories", self.selected.len(), self.view.categories.len());
                }
            }
            KeyCode::Char('a') => {
                self.selected = self.view.categories.iter().cloned().collect();
                self.refresh()?;
                self.status = "All categories".to_string();
            }
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::BackTab => self.tab = self.tab.prev(),
            KeyCode::Char('r') => self.reload()?,
            KeyCode::Char('e') => {
                let path = format!("sales_report_{}.md", Local::now().format("%Y%m%d_%H%M%S"));
                match crate::io::export::write_export(Path::new(&path), &self.view, ExportFormat::Md, None) {
                    Ok(()) => self.status = format!("Wrote report: {path}"),
                    Err(err) => self.status = format!("Report write failed: {err}"),
                }
            }
            _ => {}
        }

        Ok(false)
    }

    fn selection(&self) -> Selection {
        selection_for(&self.view.categories, &self.selected, self.month)
    }

    /// Recompute the view; goes through the cache so an expired entry reloads.
    fn refresh(&mut self) -> Result<(), AppError> {
        let dataset = self.cache.get_or_load(&self.config.data_path)?;
        if Arc::ptr_eq(&dataset, &self.dataset) {
            self.view = build_view(&self.dataset, &self.selection());
        } else {
            tracing::debug!(path = %self.config.data_path.display(), "cache entry expired; dataset replaced");
            self.adopt(dataset);
        }
        Ok(())
    }

    /// Drop the cached dataset and read the file again.
    fn reload(&mut self) -> Result<(), AppError> {
        self.cache.invalidate(&self.config.data_path);
        let dataset = self.cache.get_or_load(&self.config.data_path)?;
        self.adopt(dataset);
        self.status = format!("Reloaded {} rows", self.dataset.records.len());
        Ok(())
    }

    /// Switch to a newly loaded dataset, keeping the selection valid for it.
    ///
    /// A full category selection stays full (new categories join it);
    /// otherwise vanished categories are dropped. A month that no longer has
    /// data falls back to the latest one.
    fn adopt(&mut self, dataset: Arc<SalesDataset>) {
        let was_all = self.view.categories.iter().all(|c| self.selected.contains(c));
        self.dataset = dataset;

        let all = crate::aggregate::categories(&self.dataset.records);
        if was_all {
            self.selected = all.iter().cloned().collect();
        } else {
            self.selected.retain(|c| all.contains(c));
        }
        let months = crate::aggregate::available_months(&self.dataset.records);
        if self.month.is_none_or(|m| !months.contains(&m)) {
            self.month = months.first().copied();
        }

        self.view = build_view(&self.dataset, &selection_for(&all, &self.selected, self.month));
        self.category_cursor = self.category_cursor.min(all.len().saturating_sub(1));
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let month = self.month.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string());
        let lines = vec![
            Line::from(vec![
                Span::styled("sales", Style::default().fg(Color::Cyan)),
                Span::raw(format!(" — {}", self.dataset.source.display())),
            ]),
            Line::from(Span::styled(
                format!(
                    "month: {month} | categories: {}/{} | records: {} | total sales: {}",
                    self.selected.len(),
                    self.view.categories.len(),
                    self.view.record_count,
                    fmt_amount(self.view.total_sales),
                ),
                Style::default().fg(Color::Gray),
            )),
        ];

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(28), Constraint::Min(0)])
            .split(area);

        self.draw_categories(frame, chunks[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(chunks[1]);

        let tabs = Tabs::new(ChartTab::ALL.iter().map(|t| t.title()).collect::<Vec<_>>())
            .select(self.tab.index())
            .block(Block::default().borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, right[0]);

        self.draw_chart(frame, right[1]);
    }

    fn draw_categories(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = self
            .view
            .categories
            .iter()
            .map(|c| {
                let mark = if self.selected.contains(c) { "[x]" } else { "[ ]" };
                ListItem::new(format!("{mark} {c}"))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Categories").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        if !self.view.categories.is_empty() {
            state.select(Some(self.category_cursor));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title(self.tab.title()).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        if self.view.record_count == 0 {
            render_notice(frame, inner, "No rows for the current selection.");
            return;
        }

        match self.tab {
            ChartTab::Trend => self.draw_trend(frame, inner),
            ChartTab::Categories => self.draw_category_bars(frame, inner),
            ChartTab::Margin => self.draw_margin(frame, inner),
            ChartTab::Heatmap => {
                let text = crate::plot::render_heatmap(&self.view.pivot);
                frame.render_widget(Paragraph::new(text), inner);
            }
        }
    }

    fn draw_trend(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let labels: Vec<MonthlyPeriod> = self.view.monthly_sales.iter().map(|r| r.month).collect();
        let series: Vec<(f64, f64)> = self
            .view
            .monthly_sales
            .iter()
            .enumerate()
            .map(|(i, r)| (i as f64, r.sales))
            .collect();

        let fmt_x = |v: f64| month_tick(&labels, v);
        let fmt_y = |v: f64| fmt_amount(v.round());
        let widget = SeriesPlottersChart {
            series: &series,
            highlight: highlight_point(&labels, &series, self.month),
            x_bounds: plotters_chart::x_bounds(series.len()),
            y_bounds: plotters_chart::y_bounds(series.iter().map(|p| p.1)),
            x_label: "month",
            y_label: "sales",
            fmt_x: &fmt_x,
            fmt_y: &fmt_y,
        };
        frame.render_widget(widget, area);
    }

    fn draw_margin(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(rows) = &self.view.monthly_margin else {
            render_notice(frame, area, "No profit column in the source file; margin unavailable.");
            return;
        };

        // Months with zero sales have no margin and are left out of the line.
        let labels: Vec<MonthlyPeriod> = rows.iter().map(|r| r.month).collect();
        let series: Vec<(f64, f64)> = rows
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.profit_margin.as_option().map(|m| (i as f64, m)))
            .collect();
        if series.is_empty() {
            render_notice(frame, area, "Margin undefined for every month (zero sales).");
            return;
        }

        let fmt_x = |v: f64| month_tick(&labels, v);
        let fmt_y = |v: f64| format!("{v:.1}%");
        let widget = SeriesPlottersChart {
            series: &series,
            highlight: highlight_point(&labels, &series, self.month),
            x_bounds: plotters_chart::x_bounds(labels.len()),
            y_bounds: plotters_chart::y_bounds(series.iter().map(|p| p.1)),
            x_label: "month",
            y_label: "margin (%)",
            fmt_x: &fmt_x,
            fmt_y: &fmt_y,
        };
        frame.render_widget(widget, area);
    }

    fn draw_category_bars(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let shares = crate::report::category_shares(&self.view.month_categories);
        if shares.is_empty() {
            render_notice(frame, area, "No sales in the selected month.");
            return;
        }

        let bars: Vec<(String, u64)> = shares
            .iter()
            .map(|s| (s.category.clone(), s.sales.max(0.0).round() as u64))
            .collect();
        let data: Vec<(&str, u64)> = bars.iter().map(|(c, v)| (c.as_str(), *v)).collect();

        let chart = BarChart::default()
            .data(data.as_slice())
            .bar_width(9)
            .bar_gap(1)
            .bar_style(Style::default().fg(Color::Cyan))
            .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
        frame.render_widget(chart, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "←/→ month  ↑/↓ category  space toggle  a all  Tab chart  r reload  e report  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn render_notice(frame: &mut ratatui::Frame<'_>, area: Rect, msg: &str) {
    let p = Paragraph::new(msg.to_string()).style(Style::default().fg(Color::Yellow));
    frame.render_widget(p, area);
}

/// Next month in `months` (most recent first) before (`older`) or after the
/// current one. `None` at either end.
fn step_month(months: &[MonthlyPeriod], current: Option<MonthlyPeriod>, older: bool) -> Option<MonthlyPeriod> {
    let Some(cur) = current else {
        return months.first().copied();
    };
    if older {
        months.iter().find(|m| **m < cur).copied()
    } else {
        months.iter().rev().find(|m| **m > cur).copied()
    }
}

fn toggle_category(selected: &mut BTreeSet<String>, category: &str) {
    if !selected.remove(category) {
        selected.insert(category.to_string());
    }
}

/// Selecting every category is the unfiltered selection.
fn selection_for(all: &[String], selected: &BTreeSet<String>, month: Option<MonthlyPeriod>) -> Selection {
    let everything = all.len() == selected.len() && all.iter().all(|c| selected.contains(c));
    Selection {
        month,
        categories: (!everything).then(|| selected.clone()),
    }
}

/// Tick label for a month index; off-grid ticks stay blank.
fn month_tick(labels: &[MonthlyPeriod], v: f64) -> String {
    let i = v.round();
    if (v - i).abs() > 0.25 || i < 0.0 {
        return String::new();
    }
    labels.get(i as usize).map(|m| m.to_string()).unwrap_or_default()
}

fn highlight_point(labels: &[MonthlyPeriod], series: &[(f64, f64)], month: Option<MonthlyPeriod>) -> Option<(f64, f64)> {
    let idx = labels.iter().position(|m| Some(*m) == month)? as f64;
    series.iter().find(|p| p.0 == idx).copied()
}
