//! CSV ingest and normalization.
//!
//! This module turns a sales export into a typed `SalesDataset`.
//!
//! Design goals:
//! - **Strict schema** for required columns (`SchemaError`, exit code 2)
//! - **All-or-nothing**: the first bad row aborts the load with its line number
//! - **Deterministic behavior** (no hidden randomness, no locale guessing)
//! - **Separation of concerns**: no aggregation logic here

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::domain::{Column, ColumnSet, SalesDataset, SalesRecord};
use crate::error::{DataError, LoadError};

/// Load a sales CSV into memory.
///
/// Required columns are `date`, `category` and `sales` (or their Japanese
/// spellings). `profit` and `volume` are optional and read as `None` when the
/// column is absent; `SalesDataset::columns` records which were present.
pub fn load(path: &Path) -> Result<SalesDataset, DataError> {
    let started = Instant::now();
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers().map_err(LoadError::from)?.clone();
    let header_map = build_header_map(&headers);

    for column in Column::ALL {
        if column.is_required() && !header_map.contains_key(&column) {
            return Err(DataError::Schema { column });
        }
    }

    let columns = ColumnSet {
        profit: header_map.contains_key(&Column::Profit),
        volume: header_map.contains_key(&Column::Volume),
    };

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2 because:
        // - records() starts at line 1 after headers
        // - CSV is 1-based line numbers
        let line = idx + 2;
        let record = result.map_err(LoadError::from)?;
        records.push(parse_row(&record, &header_map, line)?);
    }

    let rows_read = records.len();
    tracing::info!(
        path = %path.display(),
        rows = rows_read,
        profit = columns.profit,
        volume = columns.volume,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "loaded sales data"
    );

    Ok(SalesDataset {
        source: path.to_path_buf(),
        records,
        columns,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<Column, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        let name = normalize_header_name(name);
        for column in Column::ALL {
            if column.aliases().contains(&name.as_str()) {
                // First matching header wins.
                map.entry(column).or_insert(idx);
            }
        }
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header (e.g. "﻿date"). If we don't strip it, schema validation will
    // incorrectly report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_lowercase()
}

fn parse_row(record: &StringRecord, header_map: &HashMap<Column, usize>, line: usize) -> Result<SalesRecord, LoadError> {
    let date_raw = get_required(record, header_map, Column::Date, line)?;
    let date = parse_date(date_raw).ok_or_else(|| LoadError::InvalidDate {
        line,
        value: date_raw.to_string(),
    })?;

    let category = get_required(record, header_map, Column::Category, line)?.to_string();
    let sales = parse_number(get_required(record, header_map, Column::Sales, line)?, Column::Sales, line)?;

    let profit = match get_optional(record, header_map, Column::Profit) {
        Some(s) => Some(parse_number(s, Column::Profit, line)?),
        None if header_map.contains_key(&Column::Profit) => {
            return Err(LoadError::MissingValue {
                line,
                column: Column::Profit,
            });
        }
        None => None,
    };

    // A blank volume cell counts as zero units.
    let volume = match get_optional(record, header_map, Column::Volume) {
        Some(s) => Some(parse_number(s, Column::Volume, line)?),
        None if header_map.contains_key(&Column::Volume) => Some(0.0),
        None => None,
    };

    Ok(SalesRecord {
        date,
        category,
        sales,
        profit,
        volume,
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<Column, usize>,
    column: Column,
    line: usize,
) -> Result<&'a str, LoadError> {
    get_optional(record, header_map, column).ok_or(LoadError::MissingValue { line, column })
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<Column, usize>, column: Column) -> Option<&'a str> {
    let idx = header_map.get(&column)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a day-granularity date.
///
/// Timestamps are accepted and truncated to their date as written; no
/// timezone conversion is applied.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    const DATE_FMTS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
    const DATETIME_FMTS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];

    let s = s.trim();
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

fn parse_number(s: &str, column: Column, line: usize) -> Result<f64, LoadError> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(LoadError::InvalidNumber {
            line,
            column,
            value: s.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn load_reads_all_columns() {
        let file = write_csv(
            "date,category,sales,profit,volume\n\
             2024-01-05,A,100,20,5\n\
             2024-01-20,B,50,10,2\n\
             2024-02-02,A,80,-5,3\n",
        );
        let ds = load(file.path()).unwrap();
        assert_eq!(ds.rows_read, 3);
        assert!(ds.columns.profit && ds.columns.volume);
        assert_eq!(ds.records[2].profit, Some(-5.0));
        assert_eq!(ds.records[2].volume, Some(3.0));
        assert_eq!(ds.records[1].category, "B");
        assert_eq!(ds.records[0].date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn load_accepts_japanese_headers_and_bom() {
        let file = write_csv("\u{feff}日付,カテゴリ,売上\n2024/03/01,食品,1200\n");
        let ds = load(file.path()).unwrap();
        assert_eq!(ds.records.len(), 1);
        assert_eq!(ds.records[0].category, "食品");
        assert_eq!(ds.records[0].profit, None);
        assert_eq!(ds.records[0].volume, None);
        assert!(!ds.columns.profit);
        assert!(!ds.columns.volume);
    }

    #[test]
    fn load_fails_on_missing_required_column() {
        let file = write_csv("date,sales\n2024-01-01,10\n");
        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, DataError::Schema { column: Column::Category }));
    }

    #[test]
    fn load_fails_whole_file_on_bad_date() {
        let file = write_csv(
            "date,category,sales\n\
             2024-01-01,A,10\n\
             not-a-date,A,10\n\
             2024-01-03,A,10\n",
        );
        let err = load(file.path()).unwrap_err();
        match err {
            DataError::Load(LoadError::InvalidDate { line, value }) => {
                assert_eq!(line, 3);
                assert_eq!(value, "not-a-date");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn load_fails_on_non_numeric_sales() {
        let file = write_csv("date,category,sales\n2024-01-01,A,lots\n");
        let err = load(file.path()).unwrap_err();
        assert!(matches!(
            err,
            DataError::Load(LoadError::InvalidNumber {
                line: 2,
                column: Column::Sales,
                ..
            })
        ));
    }

    #[test]
    fn load_fails_on_blank_profit_when_column_present() {
        let file = write_csv("date,category,sales,profit\n2024-01-01,A,10,\n");
        let err = load(file.path()).unwrap_err();
        assert!(matches!(
            err,
            DataError::Load(LoadError::MissingValue {
                column: Column::Profit,
                ..
            })
        ));
    }

    #[test]
    fn load_missing_file_is_load_error() {
        let err = load(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, DataError::Load(LoadError::Open { .. })));
    }

    #[test]
    fn header_only_file_is_an_empty_dataset() {
        let file = write_csv("date,category,sales\n");
        let ds = load(file.path()).unwrap();
        assert!(ds.records.is_empty());
    }

    #[test]
    fn load_is_idempotent() {
        let file = write_csv("date,category,sales,profit\n2024-01-01,A,10,1\n2024-02-01,B,5,2\n");
        let a = load(file.path()).unwrap();
        let b = load(file.path()).unwrap();
        assert_eq!(a.records, b.records);
    }

    #[test]
    fn parse_date_truncates_timestamps() {
        let d = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        assert_eq!(parse_date("2024-05-31 23:59:59"), Some(d));
        assert_eq!(parse_date("2024-05-31T08:00:00.250"), Some(d));
        assert_eq!(parse_date("2024-05-31T23:30:00+09:00"), Some(d));
        assert_eq!(parse_date("31/05/2024"), None);
    }
}
