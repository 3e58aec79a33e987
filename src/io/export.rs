//! Export dashboard tables to CSV, JSON or markdown.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::app::pipeline::DashboardView;
use crate::domain::{CategoryMonthPivot, Column, ExportFormat, ExportTable, MonthlyAggregate};
use crate::error::{AppError, DataError};

/// Write one table (or the whole view) of `view` to `path`.
///
/// - `Csv`: writes `table` (default: monthly totals)
/// - `Json`: writes `table`, or the complete view when `table` is `None`
/// - `Md`: writes the markdown report; `table` is ignored
pub fn write_export(
    path: &Path,
    view: &DashboardView,
    format: ExportFormat,
    table: Option<ExportTable>,
) -> Result<(), AppError> {
    match format {
        ExportFormat::Csv => write_table_csv(path, view, table.unwrap_or(ExportTable::Monthly))?,
        ExportFormat::Json => write_json(path, view, table)?,
        ExportFormat::Md => {
            let mut file = create(path)?;
            file.write_all(crate::report::format_markdown_report(view).as_bytes())
                .map_err(|e| AppError::new(2, format!("Failed to write report: {e}")))?;
        }
    }

    tracing::info!(path = %path.display(), ?format, ?table, "export written");
    Ok(())
}

const MONTHLY_HEADERS: &[&str] = &["month", "sales"];
const CATEGORY_HEADERS: &[&str] = &["category", "sales"];
const CATEGORY_MONTHLY_HEADERS: &[&str] = &["category", "month", "sales", "profit"];
const MARGIN_HEADERS: &[&str] = &["month", "sales", "profit", "profit_margin"];
const ROWS_HEADERS: &[&str] = &["date", "category", "sales", "profit", "volume"];

/// Write one table as CSV.
///
/// The header row is always written, so an empty table still names its
/// columns. Missing profit/volume values are left blank.
pub fn write_table_csv(path: &Path, view: &DashboardView, table: ExportTable) -> Result<(), AppError> {
    match table {
        ExportTable::Monthly => write_rows_csv(path, MONTHLY_HEADERS, &view.monthly_sales),
        ExportTable::Category => write_rows_csv(path, CATEGORY_HEADERS, &view.month_categories),
        ExportTable::CategoryMonthly => write_rows_csv(path, CATEGORY_MONTHLY_HEADERS, &view.category_monthly),
        ExportTable::Margin => write_rows_csv(path, MARGIN_HEADERS, margin_rows(view)?),
        ExportTable::Rows => write_rows_csv(path, ROWS_HEADERS, &view.month_rows),
        ExportTable::Pivot => write_pivot_csv(path, &view.pivot),
    }
}

fn write_json(path: &Path, view: &DashboardView, table: Option<ExportTable>) -> Result<(), AppError> {
    let json = match table {
        None => serde_json::to_string_pretty(view),
        Some(ExportTable::Monthly) => serde_json::to_string_pretty(&view.monthly_sales),
        Some(ExportTable::Category) => serde_json::to_string_pretty(&view.month_categories),
        Some(ExportTable::CategoryMonthly) => serde_json::to_string_pretty(&view.category_monthly),
        Some(ExportTable::Margin) => serde_json::to_string_pretty(margin_rows(view)?),
        Some(ExportTable::Rows) => serde_json::to_string_pretty(&view.month_rows),
        Some(ExportTable::Pivot) => serde_json::to_string_pretty(&view.pivot),
    }
    .map_err(|e| AppError::new(2, format!("Failed to encode JSON export: {e}")))?;

    // `path` is only truncated once the payload exists.
    let mut file = create(path)?;
    file.write_all(json.as_bytes())
        .map_err(|e| AppError::new(2, format!("Failed to write JSON export: {e}")))
}

fn margin_rows(view: &DashboardView) -> Result<&[MonthlyAggregate], AppError> {
    view.monthly_margin.as_deref().ok_or_else(|| {
        DataError::Schema {
            column: Column::Profit,
        }
        .into()
    })
}

fn write_rows_csv<T: Serialize>(path: &Path, headers: &[&str], rows: &[T]) -> Result<(), AppError> {
    let mut writer = csv_writer(path)?;
    writer
        .write_record(headers)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}

fn write_pivot_csv(path: &Path, pivot: &CategoryMonthPivot) -> Result<(), AppError> {
    let mut writer = csv_writer(path)?;

    let mut header = vec!["category".to_string()];
    header.extend(pivot.months.iter().map(ToString::to_string));
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for (category, row) in pivot.categories.iter().zip(&pivot.cells) {
        let mut record = vec![category.clone()];
        record.extend(row.iter().map(|v| v.to_string()));
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}

/// Headers are written explicitly by each table writer.
fn csv_writer(path: &Path) -> Result<csv::Writer<File>, AppError> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))
}

fn create(path: &Path) -> Result<File, AppError> {
    File::create(path).map_err(|e| AppError::new(2, format!("Failed to create export '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use chrono::NaiveDate;

    use crate::domain::{ColumnSet, SalesDataset, SalesRecord, Selection};

    fn view(profit: bool) -> DashboardView {
        view_for(profit, &Selection::default())
    }

    fn view_for(profit: bool, selection: &Selection) -> DashboardView {
        let rec = |d: &str, c: &str, s: f64, p: f64| SalesRecord {
            date: NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(),
            category: c.to_string(),
            sales: s,
            profit: profit.then_some(p),
            volume: Some(1.0),
        };
        let ds = SalesDataset {
            source: PathBuf::from("data.csv"),
            records: vec![
                rec("2024-01-05", "A", 100.0, 20.0),
                rec("2024-01-20", "B", 50.0, 10.0),
                rec("2024-02-02", "A", 80.0, -5.0),
            ],
            columns: ColumnSet { profit, volume: true },
            rows_read: 3,
        };
        crate::app::pipeline::build_view(&ds, selection)
    }

    #[test]
    fn monthly_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monthly.csv");
        write_export(&path, &view(true), ExportFormat::Csv, None).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "month,sales\n2024-01,150.0\n2024-02,80.0\n");
    }

    #[test]
    fn pivot_csv_is_zero_filled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pivot.csv");
        write_table_csv(&path, &view(true), ExportTable::Pivot).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "category,2024-01,2024-02\nA,100,80\nB,50,0\n");
    }

    #[test]
    fn margin_export_without_profit_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("margin.csv");
        let err = write_table_csv(&path, &view(false), ExportTable::Margin).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("profit"));
    }

    #[test]
    fn json_export_of_whole_view() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view.json");
        write_export(&path, &view(true), ExportFormat::Json, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["month"], "2024-02");
        assert_eq!(value["monthly_sales"][0]["sales"], 150.0);
        assert_eq!(value["pivot"]["cells"][1][1], 0.0);
    }

    #[test]
    fn markdown_export_contains_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        write_export(&path, &view(true), ExportFormat::Md, None).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# Monthly sales report"));
        assert!(text.contains("## Profit margin"));
        assert!(text.contains("| 2024-02 | 80.00 |"));
    }

    #[test]
    fn failed_margin_export_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        for format in [ExportFormat::Json, ExportFormat::Csv] {
            let path = dir.path().join("prev.out");
            std::fs::write(&path, "{\"kept\": true}\n").unwrap();
            let err = write_export(&path, &view(false), format, Some(ExportTable::Margin)).unwrap_err();
            assert!(err.to_string().contains("profit"));
            assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"kept\": true}\n");
        }
    }

    #[test]
    fn missing_profit_exports_blank_not_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cm.csv");
        write_table_csv(&path, &view(false), ExportTable::CategoryMonthly).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "category,month,sales,profit\nA,2024-01,100.0,\nA,2024-02,80.0,\nB,2024-01,50.0,\n"
        );

        let path = dir.path().join("rows.csv");
        write_table_csv(&path, &view(false), ExportTable::Rows).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "date,category,sales,profit,volume\n2024-02-02,A,80.0,,1.0\n"
        );

        let path = dir.path().join("view.json");
        write_export(&path, &view(false), ExportFormat::Json, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value["category_monthly"][0]["profit"].is_null());
        assert!(value["month_rows"][0]["profit"].is_null());
        assert!(value["monthly_margin"].is_null());
    }

    #[test]
    fn empty_tables_still_have_headers() {
        let selection = Selection {
            month: Some("2023-06".parse().unwrap()),
            categories: None,
        };
        let view = view_for(true, &selection);
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("rows.csv");
        write_table_csv(&path, &view, ExportTable::Rows).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "date,category,sales,profit,volume\n");

        let path = dir.path().join("category.csv");
        write_table_csv(&path, &view, ExportTable::Category).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "category,sales\n");
    }
}
