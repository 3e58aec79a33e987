//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory while aggregating
//! - exported to JSON/CSV
//! - handed to the terminal front-ends without further conversion

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DataError;

/// One transaction row of the input CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub category: String,
    pub sales: f64,
    /// Signed; may be negative. `None` when the source has no profit column.
    pub profit: Option<f64>,
    /// Units sold, shown with the raw rows. `None` when the source has no
    /// volume column.
    pub volume: Option<f64>,
}

impl SalesRecord {
    pub fn month(&self) -> MonthlyPeriod {
        MonthlyPeriod::from_date(self.date)
    }
}

/// Logical CSV columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Date,
    Category,
    Sales,
    Profit,
    Volume,
}

impl Column {
    pub const ALL: [Column; 5] = [
        Column::Date,
        Column::Category,
        Column::Sales,
        Column::Profit,
        Column::Volume,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Category => "category",
            Column::Sales => "sales",
            Column::Profit => "profit",
            Column::Volume => "volume",
        }
    }

    /// Header spellings accepted for this column (compared after lowercasing).
    ///
    /// Japanese spellings cover exports from JP-locale spreadsheet tools.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Column::Date => &["date", "日付"],
            Column::Category => &["category", "カテゴリ"],
            Column::Sales => &["sales", "売上"],
            Column::Profit => &["profit", "利益"],
            Column::Volume => &["volume", "数量"],
        }
    }

    pub fn is_required(self) -> bool {
        matches!(self, Column::Date | Column::Category | Column::Sales)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Which optional columns were present in the loaded file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSet {
    pub profit: bool,
    pub volume: bool,
}

impl ColumnSet {
    pub fn contains(&self, column: Column) -> bool {
        match column {
            Column::Profit => self.profit,
            Column::Volume => self.volume,
            _ => true,
        }
    }
}

/// A loaded, immutable record set plus load metadata.
#[derive(Debug, Clone)]
pub struct SalesDataset {
    pub source: PathBuf,
    pub records: Vec<SalesRecord>,
    pub columns: ColumnSet,
    pub rows_read: usize,
}

impl SalesDataset {
    /// Fail with a schema error if `column` was absent from the source file.
    pub fn require(&self, column: Column) -> Result<(), DataError> {
        if self.columns.contains(column) {
            Ok(())
        } else {
            Err(DataError::Schema { column })
        }
    }
}

/// A calendar month. Ordering is calendar order; text form is `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthlyPeriod {
    year: i32,
    month: u32,
}

impl MonthlyPeriod {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for MonthlyPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` so width/alignment flags work in table formatting.
        f.pad(&format!("{:04}-{:02}", self.year, self.month))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid month '{0}' (expected YYYY-MM)")]
pub struct ParsePeriodError(String);

impl FromStr for MonthlyPeriod {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePeriodError(s.to_string());
        let (year, month) = s.trim().split_once(['-', '/']).ok_or_else(err)?;
        if year.len() != 4 {
            return Err(err());
        }
        let year = year.parse::<i32>().map_err(|_| err())?;
        let month = month.parse::<u32>().map_err(|_| err())?;
        MonthlyPeriod::new(year, month).ok_or_else(err)
    }
}

impl Serialize for MonthlyPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthlyPeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Record filters supported by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    All,
    /// Keep records whose category is in the set.
    Categories(BTreeSet<String>),
    /// Keep records whose month equals the period.
    Month(MonthlyPeriod),
}

impl RecordFilter {
    pub fn matches(&self, record: &SalesRecord) -> bool {
        match self {
            RecordFilter::All => true,
            RecordFilter::Categories(set) => set.contains(&record.category),
            RecordFilter::Month(month) => record.month() == *month,
        }
    }
}

/// Summed sales for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    pub month: MonthlyPeriod,
    pub sales: f64,
}

/// Summed sales for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub sales: f64,
}

/// Sales and profit summed by (category, month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMonthlyAggregate {
    pub category: String,
    pub month: MonthlyPeriod,
    pub sales: f64,
    /// `None` when the records carry no profit values.
    pub profit: Option<f64>,
}

/// `100 * profit / sales`, or `Undefined` when the sales sum is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfitMargin {
    Defined(f64),
    Undefined,
}

impl ProfitMargin {
    pub fn compute(profit: f64, sales: f64) -> Self {
        if sales == 0.0 {
            ProfitMargin::Undefined
        } else {
            ProfitMargin::Defined(100.0 * profit / sales)
        }
    }

    pub fn as_option(&self) -> Option<f64> {
        match self {
            ProfitMargin::Defined(v) => Some(*v),
            ProfitMargin::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, ProfitMargin::Defined(_))
    }
}

impl fmt::Display for ProfitMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfitMargin::Defined(v) => f.pad(&format!("{v:.2}%")),
            ProfitMargin::Undefined => f.pad("n/a"),
        }
    }
}

impl Serialize for ProfitMargin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_option().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProfitMargin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<f64>::deserialize(deserializer)? {
            Some(v) => ProfitMargin::Defined(v),
            None => ProfitMargin::Undefined,
        })
    }
}

/// Sales and profit summed by month, with the derived margin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub month: MonthlyPeriod,
    pub sales: f64,
    pub profit: f64,
    pub profit_margin: ProfitMargin,
}

impl MonthlyAggregate {
    /// Numeric margin, or `DivisionUndefined` for a zero-sales month.
    pub fn margin_value(&self) -> Result<f64, DataError> {
        self.profit_margin
            .as_option()
            .ok_or(DataError::DivisionUndefined { month: self.month })
    }
}

/// Category × month matrix of summed sales, zero-filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryMonthPivot {
    pub categories: Vec<String>,
    pub months: Vec<MonthlyPeriod>,
    /// `cells[row][col]` for `categories[row]` × `months[col]`.
    pub cells: Vec<Vec<f64>>,
}

impl CategoryMonthPivot {
    /// Summed sales at `(category, month)`; unknown keys read as `0.0`.
    pub fn get(&self, category: &str, month: MonthlyPeriod) -> f64 {
        let row = self.categories.iter().position(|c| c == category);
        let col = self.months.binary_search(&month).ok();
        match (row, col) {
            (Some(r), Some(c)) => self.cells[r][c],
            _ => 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() || self.months.is_empty()
    }

    pub fn max_cell(&self) -> f64 {
        self.cells
            .iter()
            .flatten()
            .copied()
            .fold(0.0, f64::max)
    }
}

/// Five-number summary of per-record sales within one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDistribution {
    pub category: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// The user's current month / category choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// `None` means "latest month in the data".
    pub month: Option<MonthlyPeriod>,
    /// `None` means "all categories".
    pub categories: Option<BTreeSet<String>>,
}

impl Selection {
    pub fn category_filter(&self) -> RecordFilter {
        match &self.categories {
            Some(set) => RecordFilter::Categories(set.clone()),
            None => RecordFilter::All,
        }
    }
}

/// Which table an export writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportTable {
    /// Monthly sales totals.
    Monthly,
    /// Category totals for the selected month.
    Category,
    /// Sales and profit by category and month.
    CategoryMonthly,
    /// Monthly sales, profit and margin.
    Margin,
    /// Category × month pivot.
    Pivot,
    /// Raw rows of the selected month.
    Rows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Md,
}

/// Resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    pub selection: Selection,
    /// Cache entry lifetime; `None` keeps the dataset for the whole session.
    pub cache_ttl: Option<Duration>,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}
