//! Shared "view pipeline" logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! dataset -> category filter -> month filter -> aggregates
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::path::PathBuf;

use serde::Serialize;

use crate::aggregate;
use crate::domain::{
    CategoryDistribution, CategoryMonthPivot, CategoryMonthlyAggregate, CategoryTotal, Column, MonthlyAggregate,
    MonthlyPeriod, MonthlyTotal, RecordFilter, SalesDataset, SalesRecord, Selection,
};

/// Everything the front-ends draw for one selection.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub source: PathBuf,
    /// Month the per-month views were computed for (`None` on empty data).
    pub month: Option<MonthlyPeriod>,
    /// Categories included in the category-filtered views.
    pub selected_categories: Vec<String>,
    /// All months in the data, most recent first.
    pub months: Vec<MonthlyPeriod>,
    /// All categories in the data, ascending.
    pub categories: Vec<String>,
    /// Number of records after the category filter.
    pub record_count: usize,
    pub total_sales: f64,
    pub monthly_sales: Vec<MonthlyTotal>,
    pub category_monthly: Vec<CategoryMonthlyAggregate>,
    /// `None` when the source has no profit column.
    pub monthly_margin: Option<Vec<MonthlyAggregate>>,
    pub pivot: CategoryMonthPivot,
    pub distribution: Vec<CategoryDistribution>,
    /// Category share within `month`.
    pub month_categories: Vec<CategoryTotal>,
    /// Raw rows within `month`.
    pub month_rows: Vec<SalesRecord>,
}

/// Compute all aggregates for `selection` over `dataset`.
///
/// The category filter applies to every view; the month filter additionally
/// narrows the per-month views (category share and raw rows). An explicit
/// month that has no data yields empty per-month views, not an error.
pub fn build_view(dataset: &SalesDataset, selection: &Selection) -> DashboardView {
    let months = aggregate::available_months(&dataset.records);
    let categories = aggregate::categories(&dataset.records);

    let base = aggregate::filter_by(&dataset.records, &selection.category_filter());
    let month = selection.month.or_else(|| months.first().copied());

    let month_rows = match month {
        Some(m) => aggregate::filter_by(&base, &RecordFilter::Month(m)),
        None => Vec::new(),
    };

    let monthly_margin = match dataset
        .require(Column::Profit)
        .and_then(|()| aggregate::aggregate_monthly_with_margin(&base))
    {
        Ok(rows) => Some(rows),
        Err(e) => {
            tracing::warn!(source = %dataset.source.display(), "{e}; margin views disabled");
            None
        }
    };

    let selected_categories = match &selection.categories {
        Some(set) => set.iter().cloned().collect(),
        None => categories.clone(),
    };

    DashboardView {
        source: dataset.source.clone(),
        month,
        selected_categories,
        record_count: base.len(),
        total_sales: base.iter().map(|r| r.sales).sum(),
        monthly_sales: aggregate::aggregate_by_month(&base),
        category_monthly: aggregate::aggregate_by_category_month(&base),
        monthly_margin,
        pivot: aggregate::pivot_category_month(&base),
        distribution: aggregate::category_distribution(&base),
        month_categories: aggregate::aggregate_by_category(&month_rows),
        month_rows,
        months,
        categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use chrono::NaiveDate;

    use crate::domain::{ColumnSet, ProfitMargin};

    fn rec(date: &str, category: &str, sales: f64, profit: Option<f64>) -> SalesRecord {
        SalesRecord {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            category: category.to_string(),
            sales,
            profit,
            volume: Some(1.0),
        }
    }

    fn dataset(profit: bool) -> SalesDataset {
        let p = |v: f64| profit.then_some(v);
        let records = vec![
            rec("2024-01-05", "A", 100.0, p(20.0)),
            rec("2024-01-20", "B", 50.0, p(10.0)),
            rec("2024-02-02", "A", 80.0, p(-5.0)),
            rec("2024-02-10", "C", 0.0, p(0.0)),
        ];
        SalesDataset {
            source: PathBuf::from("data.csv"),
            rows_read: records.len(),
            records,
            columns: ColumnSet { profit, volume: true },
        }
    }

    #[test]
    fn default_selection_uses_latest_month() {
        let view = build_view(&dataset(true), &Selection::default());
        assert_eq!(view.month, Some("2024-02".parse().unwrap()));
        assert_eq!(view.month_rows.len(), 2);
        assert_eq!(view.month_categories.len(), 2);
        assert_eq!(view.month_categories[0].category, "A");
        assert_eq!(view.month_categories[0].sales, 80.0);
        assert_eq!(view.selected_categories, vec!["A", "B", "C"]);
        assert_eq!(view.total_sales, 230.0);
    }

    #[test]
    fn category_selection_narrows_every_view() {
        let selection = Selection {
            month: Some("2024-01".parse().unwrap()),
            categories: Some(BTreeSet::from(["A".to_string()])),
        };
        let view = build_view(&dataset(true), &selection);
        assert_eq!(view.record_count, 2);
        assert_eq!(view.monthly_sales.len(), 2);
        assert_eq!(view.monthly_sales[0].sales, 100.0);
        assert_eq!(view.pivot.categories, vec!["A"]);
        assert_eq!(view.month_rows.len(), 1);
        // The pickers still list everything.
        assert_eq!(view.categories, vec!["A", "B", "C"]);
        assert_eq!(view.months.len(), 2);
    }

    #[test]
    fn margin_view_requires_profit_column() {
        let view = build_view(&dataset(false), &Selection::default());
        assert!(view.monthly_margin.is_none());
        assert!(view.category_monthly.iter().all(|r| r.profit.is_none()));

        let view = build_view(&dataset(true), &Selection::default());
        let margin = view.monthly_margin.unwrap();
        assert_eq!(margin.len(), 2);
        assert_eq!(margin[0].profit_margin, ProfitMargin::Defined(20.0));
    }

    #[test]
    fn month_without_data_gives_empty_month_views() {
        let selection = Selection {
            month: Some("2023-06".parse().unwrap()),
            categories: None,
        };
        let view = build_view(&dataset(true), &selection);
        assert!(view.month_rows.is_empty());
        assert!(view.month_categories.is_empty());
        assert_eq!(view.monthly_sales.len(), 2);
    }

    #[test]
    fn empty_dataset_builds_empty_view() {
        let ds = SalesDataset {
            source: PathBuf::from("empty.csv"),
            records: Vec::new(),
            columns: ColumnSet::default(),
            rows_read: 0,
        };
        let view = build_view(&ds, &Selection::default());
        assert_eq!(view.month, None);
        assert!(view.monthly_sales.is_empty());
        assert!(view.pivot.is_empty());
    }
}
