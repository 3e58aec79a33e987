//! Filtering, grouping and pivoting over loaded sales records.
//!
//! Everything here is a pure function of its input slice. Ordering and
//! zero-fill behavior are part of each function's contract:
//!
//! - months are always in ascending calendar order
//! - categories are always in ascending lexical order
//! - pivots are dense; missing combinations are `0.0`
//! - empty input gives empty output, never an error
//! - a missing profit value never reads as zero

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::domain::{
    CategoryDistribution, CategoryMonthPivot, CategoryMonthlyAggregate, CategoryTotal, Column, MonthlyAggregate,
    MonthlyPeriod, MonthlyTotal, ProfitMargin, RecordFilter, SalesRecord,
};
use crate::error::DataError;

/// Truncate a date to its calendar month.
pub fn to_monthly_period(date: NaiveDate) -> MonthlyPeriod {
    MonthlyPeriod::from_date(date)
}

/// Records matching `filter`, in input order.
pub fn filter_by(records: &[SalesRecord], filter: &RecordFilter) -> Vec<SalesRecord> {
    records.iter().filter(|r| filter.matches(r)).cloned().collect()
}

/// Summed sales per month.
pub fn aggregate_by_month(records: &[SalesRecord]) -> Vec<MonthlyTotal> {
    let mut sums: BTreeMap<MonthlyPeriod, f64> = BTreeMap::new();
    for r in records {
        *sums.entry(r.month()).or_default() += r.sales;
    }
    sums.into_iter()
        .map(|(month, sales)| MonthlyTotal { month, sales })
        .collect()
}

/// Summed sales per category.
///
/// Callers normally pass a month-filtered slice (the "category share for
/// the selected month" view).
pub fn aggregate_by_category(records: &[SalesRecord]) -> Vec<CategoryTotal> {
    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for r in records {
        *sums.entry(r.category.as_str()).or_default() += r.sales;
    }
    sums.into_iter()
        .map(|(category, sales)| CategoryTotal {
            category: category.to_string(),
            sales,
        })
        .collect()
}

/// Summed sales and profit per (category, month), ordered by category then month.
///
/// A group's profit is `None` as soon as one of its records has no profit.
pub fn aggregate_by_category_month(records: &[SalesRecord]) -> Vec<CategoryMonthlyAggregate> {
    let mut sums: BTreeMap<(&str, MonthlyPeriod), (f64, Option<f64>)> = BTreeMap::new();
    for r in records {
        let entry = sums.entry((r.category.as_str(), r.month())).or_insert((0.0, Some(0.0)));
        entry.0 += r.sales;
        entry.1 = entry.1.zip(r.profit).map(|(acc, p)| acc + p);
    }
    sums.into_iter()
        .map(|((category, month), (sales, profit))| CategoryMonthlyAggregate {
            category: category.to_string(),
            month,
            sales,
            profit,
        })
        .collect()
}

/// Monthly sales and profit sums with `profit_margin = 100 * profit / sales`.
///
/// A month whose sales sum is exactly zero gets `ProfitMargin::Undefined`.
/// Any record without a profit value fails the whole call with a schema
/// error for `profit`.
pub fn aggregate_monthly_with_margin(records: &[SalesRecord]) -> Result<Vec<MonthlyAggregate>, DataError> {
    let mut sums: BTreeMap<MonthlyPeriod, (f64, f64)> = BTreeMap::new();
    for r in records {
        let profit = r.profit.ok_or(DataError::Schema {
            column: Column::Profit,
        })?;
        let entry = sums.entry(r.month()).or_default();
        entry.0 += r.sales;
        entry.1 += profit;
    }
    Ok(sums
        .into_iter()
        .map(|(month, (sales, profit))| MonthlyAggregate {
            month,
            sales,
            profit,
            profit_margin: ProfitMargin::compute(profit, sales),
        })
        .collect())
}

/// Dense category × month matrix of summed sales.
pub fn pivot_category_month(records: &[SalesRecord]) -> CategoryMonthPivot {
    let categories = categories(records);
    let months: Vec<MonthlyPeriod> = records
        .iter()
        .map(SalesRecord::month)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut cells = vec![vec![0.0; months.len()]; categories.len()];
    for r in records {
        // Both lookups succeed: the axes were built from the same records.
        let (Ok(row), Ok(col)) = (
            categories.binary_search(&r.category),
            months.binary_search(&r.month()),
        ) else {
            continue;
        };
        cells[row][col] += r.sales;
    }

    CategoryMonthPivot {
        categories,
        months,
        cells,
    }
}

/// Distinct months, most recent first.
pub fn available_months(records: &[SalesRecord]) -> Vec<MonthlyPeriod> {
    let set: BTreeSet<MonthlyPeriod> = records.iter().map(SalesRecord::month).collect();
    set.into_iter().rev().collect()
}

/// Distinct categories, ascending.
pub fn categories(records: &[SalesRecord]) -> Vec<String> {
    let set: BTreeSet<&str> = records.iter().map(|r| r.category.as_str()).collect();
    set.into_iter().map(str::to_string).collect()
}

/// Per-category five-number summary of record-level sales.
pub fn category_distribution(records: &[SalesRecord]) -> Vec<CategoryDistribution> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for r in records {
        groups.entry(r.category.as_str()).or_default().push(r.sales);
    }

    groups
        .into_iter()
        .map(|(category, mut values)| {
            values.sort_by(|a, b| a.total_cmp(b));
            CategoryDistribution {
                category: category.to_string(),
                count: values.len(),
                min: values[0],
                q1: quantile(&values, 0.25),
                median: quantile(&values, 0.5),
                q3: quantile(&values, 0.75),
                max: values[values.len() - 1],
            }
        })
        .collect()
}

/// Linear-interpolated quantile of an ascending, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(date: &str, category: &str, sales: f64, profit: f64, volume: f64) -> SalesRecord {
        SalesRecord {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            category: category.to_string(),
            sales,
            profit: Some(profit),
            volume: Some(volume),
        }
    }

    fn without_profit(mut record: SalesRecord) -> SalesRecord {
        record.profit = None;
        record
    }

    fn example() -> Vec<SalesRecord> {
        vec![
            rec("2024-01-05", "A", 100.0, 20.0, 5.0),
            rec("2024-01-20", "B", 50.0, 10.0, 2.0),
            rec("2024-02-02", "A", 80.0, -5.0, 3.0),
        ]
    }

    fn month(s: &str) -> MonthlyPeriod {
        s.parse().unwrap()
    }

    #[test]
    fn aggregate_by_month_worked_example() {
        let totals = aggregate_by_month(&example());
        assert_eq!(
            totals,
            vec![
                MonthlyTotal {
                    month: month("2024-01"),
                    sales: 150.0,
                },
                MonthlyTotal {
                    month: month("2024-02"),
                    sales: 80.0,
                },
            ]
        );
    }

    #[test]
    fn pivot_worked_example_zero_fills() {
        let pivot = pivot_category_month(&example());
        assert_eq!(pivot.categories, vec!["A", "B"]);
        assert_eq!(pivot.months, vec![month("2024-01"), month("2024-02")]);
        assert_eq!(pivot.get("A", month("2024-01")), 100.0);
        assert_eq!(pivot.get("B", month("2024-01")), 50.0);
        assert_eq!(pivot.get("A", month("2024-02")), 80.0);
        assert_eq!(pivot.get("B", month("2024-02")), 0.0);
        assert_eq!(pivot.get("C", month("2024-02")), 0.0);
        assert_eq!(pivot.get("A", month("2030-01")), 0.0);
    }

    #[test]
    fn monthly_sum_conserves_total_sales() {
        let mut records = example();
        records.push(rec("2023-12-31", "C", 12.5, 0.0, 1.0));
        records.push(rec("2024-02-28", "B", 7.25, 1.0, 1.0));

        let by_month: f64 = aggregate_by_month(&records).iter().map(|t| t.sales).sum();
        let direct: f64 = records.iter().map(|r| r.sales).sum();
        assert!((by_month - direct).abs() < 1e-9);
    }

    #[test]
    fn months_sort_by_calendar_not_insertion() {
        let records = vec![
            rec("2024-11-01", "A", 1.0, 0.0, 0.0),
            rec("2024-02-01", "A", 2.0, 0.0, 0.0),
            rec("2023-12-01", "A", 3.0, 0.0, 0.0),
        ];
        let months: Vec<String> = aggregate_by_month(&records)
            .iter()
            .map(|t| t.month.to_string())
            .collect();
        assert_eq!(months, vec!["2023-12", "2024-02", "2024-11"]);

        let latest_first: Vec<String> = available_months(&records).iter().map(ToString::to_string).collect();
        assert_eq!(latest_first, vec!["2024-11", "2024-02", "2023-12"]);
    }

    #[test]
    fn filter_with_all_categories_keeps_everything() {
        let records = example();
        let all: BTreeSet<String> = categories(&records).into_iter().collect();
        let filtered = filter_by(&records, &RecordFilter::Categories(all));
        assert_eq!(filtered, records);
    }

    #[test]
    fn filter_by_month_preserves_order_and_allows_empty() {
        let records = example();
        let jan = filter_by(&records, &RecordFilter::Month(month("2024-01")));
        assert_eq!(jan.len(), 2);
        assert_eq!(jan[0].category, "A");
        assert_eq!(jan[1].category, "B");

        let none = filter_by(&records, &RecordFilter::Month(month("2025-06")));
        assert!(none.is_empty());
        assert!(aggregate_by_month(&none).is_empty());
        assert!(aggregate_by_category(&none).is_empty());
        assert!(aggregate_monthly_with_margin(&none).unwrap().is_empty());
        assert!(pivot_category_month(&none).is_empty());
    }

    #[test]
    fn aggregate_by_category_for_one_month() {
        let records = vec![
            rec("2024-01-05", "B", 10.0, 0.0, 0.0),
            rec("2024-01-06", "A", 5.0, 0.0, 0.0),
            rec("2024-01-07", "B", 2.5, 0.0, 0.0),
        ];
        let totals = aggregate_by_category(&records);
        assert_eq!(
            totals,
            vec![
                CategoryTotal {
                    category: "A".to_string(),
                    sales: 5.0,
                },
                CategoryTotal {
                    category: "B".to_string(),
                    sales: 12.5,
                },
            ]
        );
    }

    #[test]
    fn category_month_sums_sales_and_profit() {
        let mut records = example();
        records.push(rec("2024-01-30", "A", 1.0, 1.0, 0.0));
        let rows = aggregate_by_category_month(&records);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].category, "A");
        assert_eq!(rows[0].month, month("2024-01"));
        assert_eq!(rows[0].sales, 101.0);
        assert_eq!(rows[0].profit, Some(21.0));
        assert_eq!(rows[1].month, month("2024-02"));
        assert_eq!(rows[2].category, "B");
    }

    #[test]
    fn missing_profit_is_never_summed_as_zero() {
        let records: Vec<SalesRecord> = example().into_iter().map(without_profit).collect();
        let rows = aggregate_by_category_month(&records);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.profit.is_none()));

        let err = aggregate_monthly_with_margin(&records).unwrap_err();
        assert!(matches!(err, DataError::Schema { column: Column::Profit }));
    }

    #[test]
    fn margin_uses_sentinel_for_zero_sales() {
        let records = vec![
            rec("2024-01-05", "A", 200.0, 50.0, 0.0),
            rec("2024-02-05", "A", 0.0, 10.0, 0.0),
        ];
        let rows = aggregate_monthly_with_margin(&records).unwrap();
        assert_eq!(rows[0].profit_margin, ProfitMargin::Defined(25.0));
        assert_eq!(rows[1].profit_margin, ProfitMargin::Undefined);
        assert!(rows[1].margin_value().is_err());
    }

    #[test]
    fn distribution_quartiles_interpolate() {
        let records: Vec<SalesRecord> = [1.0, 2.0, 3.0, 4.0]
            .iter()
            .map(|&s| rec("2024-01-01", "A", s, 0.0, 0.0))
            .collect();
        let dist = category_distribution(&records);
        assert_eq!(dist.len(), 1);
        let d = &dist[0];
        assert_eq!(d.count, 4);
        assert_eq!(d.min, 1.0);
        assert!((d.q1 - 1.75).abs() < 1e-12);
        assert!((d.median - 2.5).abs() < 1e-12);
        assert!((d.q3 - 3.25).abs() < 1e-12);
        assert_eq!(d.max, 4.0);
    }

    #[test]
    fn to_monthly_period_truncates() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(to_monthly_period(d).to_string(), "2024-02");
    }
}
