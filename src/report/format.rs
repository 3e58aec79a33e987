//! Formatted terminal and markdown output.
//!
//! We keep formatting code in one place so:
//! - the aggregation code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use chrono::Local;

use crate::app::pipeline::DashboardView;
use crate::domain::{
    CategoryDistribution, CategoryMonthPivot, MonthlyAggregate, MonthlyTotal, SalesDataset, SalesRecord,
};
use crate::report::{category_shares, CategoryShare};

/// Format the dataset header (source, size, selection).
pub fn format_summary_header(dataset: &SalesDataset, view: &DashboardView) -> String {
    let mut out = String::new();

    out.push_str("=== sales - Monthly Sales Dashboard ===\n");
    out.push_str(&format!("Source: {}\n", dataset.source.display()));
    out.push_str(&format!(
        "Rows: {} | months: {} | categories: {}\n",
        dataset.rows_read,
        view.months.len(),
        view.categories.len()
    ));
    if let (Some(first), Some(last)) = (view.months.last(), view.months.first()) {
        out.push_str(&format!("Range: {first} .. {last}\n"));
    }
    out.push_str(&format!(
        "Selected: month={} | categories={}\n",
        view.month.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string()),
        view.selected_categories.join(", ")
    ));
    out.push_str(&format!(
        "Filtered: n={} | sales={}\n",
        view.record_count,
        fmt_amount(view.total_sales)
    ));

    out
}

/// Monthly sales totals.
pub fn format_monthly_table(rows: &[MonthlyTotal]) -> String {
    let mut out = String::new();
    push_row(&mut out, format!("{:<8} {:>14}", "month", "sales"));
    push_row(&mut out, format!("{:-<8} {:-<14}", "", ""));
    for r in rows {
        push_row(&mut out, format!("{:<8} {:>14}", r.month, fmt_amount(r.sales)));
    }
    out
}

/// Category totals with their share of the month.
pub fn format_category_table(shares: &[CategoryShare]) -> String {
    let mut out = String::new();
    push_row(&mut out, format!("{:<20} {:>14} {:>8}", "category", "sales", "share"));
    push_row(&mut out, format!("{:-<20} {:-<14} {:-<8}", "", "", ""));
    for s in shares {
        let share = s
            .percent
            .map(|p| format!("{p:.1}%"))
            .unwrap_or_else(|| "n/a".to_string());
        push_row(
            &mut out,
            format!("{:<20} {:>14} {:>8}", truncate(&s.category, 20), fmt_amount(s.sales), share),
        );
    }
    out
}

/// Monthly sales, profit and margin.
pub fn format_margin_table(rows: &[MonthlyAggregate]) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        format!("{:<8} {:>14} {:>14} {:>9}", "month", "sales", "profit", "margin"),
    );
    push_row(&mut out, format!("{:-<8} {:-<14} {:-<14} {:-<9}", "", "", "", ""));
    for r in rows {
        push_row(
            &mut out,
            format!(
                "{:<8} {:>14} {:>14} {:>9}",
                r.month,
                fmt_amount(r.sales),
                fmt_amount(r.profit),
                r.profit_margin.to_string()
            ),
        );
    }
    out
}

/// Category × month pivot, one row per category.
pub fn format_pivot_table(pivot: &CategoryMonthPivot) -> String {
    let mut out = String::new();
    let mut header = format!("{:<16}", "category");
    let mut rule = format!("{:-<16}", "");
    for m in &pivot.months {
        header.push_str(&format!(" {:>12}", m.to_string()));
        rule.push_str(&format!(" {:-<12}", ""));
    }
    push_row(&mut out, header);
    push_row(&mut out, rule);

    for (category, row) in pivot.categories.iter().zip(&pivot.cells) {
        let mut line = format!("{:<16}", truncate(category, 16));
        for v in row {
            line.push_str(&format!(" {:>12}", fmt_amount(*v)));
        }
        push_row(&mut out, line);
    }
    out
}

/// Per-category distribution of record-level sales.
pub fn format_distribution_table(rows: &[CategoryDistribution]) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        format!(
            "{:<16} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "category", "n", "min", "q1", "median", "q3", "max"
        ),
    );
    push_row(
        &mut out,
        format!(
            "{:-<16} {:-<6} {:-<10} {:-<10} {:-<10} {:-<10} {:-<10}",
            "", "", "", "", "", "", ""
        ),
    );
    for d in rows {
        push_row(
            &mut out,
            format!(
                "{:<16} {:>6} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
                truncate(&d.category, 16),
                d.count,
                d.min,
                d.q1,
                d.median,
                d.q3,
                d.max
            ),
        );
    }
    out
}

/// Raw records (the "show raw data" expander of the dashboard).
pub fn format_rows_table(rows: &[SalesRecord]) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        format!("{:<10} {:<16} {:>12} {:>12} {:>8}", "date", "category", "sales", "profit", "volume"),
    );
    push_row(&mut out, format!("{:-<10} {:-<16} {:-<12} {:-<12} {:-<8}", "", "", "", "", ""));
    for r in rows {
        push_row(
            &mut out,
            format!(
                "{:<10} {:<16} {:>12.2} {:>12} {:>8}",
                r.date,
                truncate(&r.category, 16),
                r.sales,
                r.profit.map_or_else(|| "-".to_string(), |v| format!("{v:.2}")),
                r.volume.map_or_else(|| "-".to_string(), |v| v.to_string())
            ),
        );
    }
    out
}

/// Markdown snapshot of a whole view, for sharing outside the terminal.
pub fn format_markdown_report(view: &DashboardView) -> String {
    let mut out = String::new();
    out.push_str("# Monthly sales report\n\n");
    out.push_str(&format!("- generated: {}\n", Local::now().to_rfc3339()));
    out.push_str(&format!("- source: {}\n", view.source.display()));
    out.push_str(&format!(
        "- month: {}\n",
        view.month.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string())
    ));
    out.push_str(&format!("- categories: {}\n", view.selected_categories.join(", ")));
    out.push_str(&format!("- records: {}\n", view.record_count));
    out.push_str(&format!("- total sales: {}\n", fmt_amount(view.total_sales)));

    out.push_str("\n## Monthly sales\n\n| month | sales |\n| - | - |\n");
    for r in &view.monthly_sales {
        out.push_str(&format!("| {} | {:.2} |\n", r.month, r.sales));
    }

    if let Some(month) = view.month {
        out.push_str(&format!("\n## Category share ({month})\n\n| category | sales | share |\n| - | - | - |\n"));
        for s in category_shares(&view.month_categories) {
            out.push_str(&format!(
                "| {} | {:.2} | {} |\n",
                s.category,
                s.sales,
                s.percent.map(|p| format!("{p:.1}%")).unwrap_or_else(|| "n/a".to_string())
            ));
        }
    }

    if let Some(margin) = &view.monthly_margin {
        out.push_str("\n## Profit margin\n\n| month | sales | profit | margin |\n| - | - | - | - |\n");
        for r in margin {
            out.push_str(&format!(
                "| {} | {:.2} | {:.2} | {} |\n",
                r.month, r.sales, r.profit, r.profit_margin
            ));
        }
    }

    if !view.pivot.is_empty() {
        out.push_str("\n## Category × month\n\n| category |");
        for m in &view.pivot.months {
            out.push_str(&format!(" {m} |"));
        }
        out.push_str("\n| - |");
        for _ in &view.pivot.months {
            out.push_str(" - |");
        }
        out.push('\n');
        for (category, row) in view.pivot.categories.iter().zip(&view.pivot.cells) {
            out.push_str(&format!("| {category} |"));
            for v in row {
                out.push_str(&format!(" {v:.2} |"));
            }
            out.push('\n');
        }
    }

    out
}

/// Thousands-separated amount with two decimals, e.g. `-1,234.50`.
pub fn fmt_amount(v: f64) -> String {
    if !v.is_finite() {
        return "-".to_string();
    }
    let s = format!("{:.2}", v.abs());
    let (int, frac) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if v < 0.0 && s.bytes().any(|b| b != b'0' && b != b'.') { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
