//! Synthetic sales data generation.
//!
//! Produces a realistic-looking transaction file for demos and smoke tests:
//! each category has its own price level, sales follow a mild seasonal cycle
//! with log-normal noise, and profit is a noisy fraction of sales that can go
//! negative. Generation is fully determined by the seed.

use std::path::Path;

use chrono::Duration;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{LogNormal, Normal};

use crate::domain::{MonthlyPeriod, SalesRecord};
use crate::error::AppError;

/// Default categories when none are given.
pub const DEFAULT_CATEGORIES: [&str; 4] = ["Electronics", "Food", "Clothing", "Books"];

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub start: MonthlyPeriod,
    pub months: usize,
    pub rows_per_month: usize,
    pub categories: Vec<String>,
    pub seed: u64,
}

pub fn generate_sample(config: &SampleConfig) -> Result<Vec<SalesRecord>, AppError> {
    if config.months == 0 || config.rows_per_month == 0 {
        return Err(AppError::new(2, "Sample months and rows per month must be > 0."));
    }
    if config.categories.is_empty() {
        return Err(AppError::new(2, "Sample needs at least one category."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = LogNormal::new(0.0, 0.35)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    let margin = Normal::new(0.18, 0.12)
        .map_err(|e| AppError::new(4, format!("Margin distribution error: {e}")))?;

    // Per-category price level, drawn once so categories stay distinguishable.
    let levels: Vec<f64> = config
        .categories
        .iter()
        .map(|_| rng.gen_range(50.0..500.0))
        .collect();

    let mut records = Vec::with_capacity(config.months * config.rows_per_month);
    let mut month = config.start;

    for _ in 0..config.months {
        let first = month
            .first_day()
            .ok_or_else(|| AppError::new(2, format!("Invalid start month: {month}")))?;
        let days = days_in_month(month);
        // Peak in December, trough in June.
        let season = 1.0 + 0.25 * ((month.month() as f64 - 12.0) / 6.0 * std::f64::consts::PI).cos();

        for _ in 0..config.rows_per_month {
            let idx = rng.gen_range(0..config.categories.len());
            let day = rng.gen_range(0..days);
            let date = first + Duration::days(day as i64);

            let sales = round2(levels[idx] * season * noise.sample(&mut rng));
            let profit = round2(sales * margin.sample(&mut rng));
            let volume = rng.gen_range(1..=20) as f64;

            records.push(SalesRecord {
                date,
                category: config.categories[idx].clone(),
                sales,
                profit: Some(profit),
                volume: Some(volume),
            });
        }
        month = month.succ();
    }

    records.sort_by_key(|r| r.date);
    Ok(records)
}

/// Write records as a CSV with `date,category,sales,profit,volume` headers.
pub fn write_sample_csv(path: &Path, records: &[SalesRecord]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create sample CSV '{}': {e}", path.display())))?;
    for r in records {
        writer
            .serialize(r)
            .map_err(|e| AppError::new(2, format!("Failed to write sample CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush sample CSV: {e}")))?;
    Ok(())
}

fn days_in_month(month: MonthlyPeriod) -> u32 {
    match (month.first_day(), month.succ().first_day()) {
        (Some(a), Some(b)) => (b - a).num_days() as u32,
        _ => 28,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
