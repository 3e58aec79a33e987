//! Command-line parsing for the monthly sales dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the loading/aggregation code.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{ExportFormat, ExportTable, MonthlyPeriod, Selection};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sales", version, about = "Monthly sales dashboard for CSV exports")]
pub struct Cli {
    /// More log output (debug level).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the dashboard as text: monthly trend, category share, margin.
    Summary(SummaryArgs),
    /// Print the category × month pivot and a heatmap.
    Pivot(DataArgs),
    /// Print monthly sales, profit and profit margin.
    Margin(DataArgs),
    /// Print per-category sales distribution (min / quartiles / max).
    Distribution(DataArgs),
    /// Export a table or the whole view to CSV, JSON or markdown.
    Export(ExportArgs),
    /// Write a synthetic sales CSV for trying things out.
    Sample(SampleArgs),
    /// Launch the interactive dashboard (default).
    Tui(DataArgs),
}

/// Options shared by every command that reads sales data.
#[derive(Debug, Args, Clone, Default)]
pub struct DataArgs {
    /// Sales CSV (default: $SALES_DATA, then ./data.csv).
    #[arg(short = 'f', long = "file", value_name = "CSV")]
    pub file: Option<PathBuf>,

    /// Month to focus on (YYYY-MM). Defaults to the latest month in the data.
    #[arg(short, long, value_name = "YYYY-MM")]
    pub month: Option<MonthlyPeriod>,

    /// Restrict to these categories (repeatable).
    #[arg(short = 'c', long = "category", value_name = "NAME")]
    pub categories: Vec<String>,
}

impl DataArgs {
    pub fn selection(&self) -> Selection {
        Selection {
            month: self.month,
            categories: (!self.categories.is_empty())
                .then(|| self.categories.iter().cloned().collect::<BTreeSet<_>>()),
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Disable the terminal charts.
    #[arg(long)]
    pub no_plot: bool,

    /// Also print the raw rows of the selected month.
    #[arg(long)]
    pub rows: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 16)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Output format.
    #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
    pub format: ExportFormat,

    /// Table to export (JSON without a table exports the whole view).
    #[arg(long, value_enum)]
    pub table: Option<ExportTable>,

    /// Output file.
    #[arg(short, long, value_name = "PATH")]
    pub out: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Output CSV.
    #[arg(short, long, value_name = "PATH", default_value = "data.csv")]
    pub out: PathBuf,

    /// First month to generate (YYYY-MM).
    #[arg(long, value_name = "YYYY-MM", default_value = "2024-01")]
    pub start: MonthlyPeriod,

    /// Number of months.
    #[arg(long, default_value_t = 12)]
    pub months: usize,

    /// Transactions per month.
    #[arg(long, default_value_t = 40)]
    pub rows_per_month: usize,

    /// Categories to draw from (repeatable; default: a built-in set).
    #[arg(short = 'c', long = "category", value_name = "NAME")]
    pub categories: Vec<String>,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_summary_with_filters() {
        let cli = Cli::parse_from(["sales", "summary", "-f", "d.csv", "-m", "2024-03", "-c", "A", "-c", "B"]);
        let Command::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        let sel = args.data.selection();
        assert_eq!(sel.month, Some("2024-03".parse().unwrap()));
        assert_eq!(sel.categories.unwrap().len(), 2);
        assert_eq!(args.data.file, Some(PathBuf::from("d.csv")));
    }

    #[test]
    fn no_categories_means_all() {
        assert_eq!(DataArgs::default().selection(), Selection::default());
    }

    #[test]
    fn rejects_bad_month() {
        assert!(Cli::try_parse_from(["sales", "pivot", "-m", "March"]).is_err());
    }

    #[test]
    fn export_requires_out() {
        assert!(Cli::try_parse_from(["sales", "export", "--format", "json"]).is_err());
        let cli = Cli::try_parse_from(["sales", "export", "--format", "json", "--table", "pivot", "-o", "p.json"]).unwrap();
        let Command::Export(args) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.format, ExportFormat::Json);
        assert_eq!(args.table, Some(ExportTable::Pivot));
    }
}
