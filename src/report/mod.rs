//! Reporting utilities: category shares and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::CategoryTotal;

/// A category's slice of a month's sales (the pie chart input).
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryShare {
    pub category: String,
    pub sales: f64,
    /// Percentage of the month total; `None` when the total is zero.
    pub percent: Option<f64>,
}

/// Convert category totals into percentage shares, largest first.
pub fn category_shares(totals: &[CategoryTotal]) -> Vec<CategoryShare> {
    let sum: f64 = totals.iter().map(|t| t.sales).sum();
    let mut shares: Vec<CategoryShare> = totals
        .iter()
        .map(|t| CategoryShare {
            category: t.category.clone(),
            sales: t.sales,
            percent: (sum != 0.0).then(|| 100.0 * t.sales / sum),
        })
        .collect();
    // Stable sort keeps the alphabetical order for ties.
    shares.sort_by(|a, b| b.sales.total_cmp(&a.sales));
    shares
}
