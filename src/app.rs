//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - resolves configuration (flags, `.env`, defaults)
//! - loads the dataset through the session cache
//! - builds the dashboard view
//! - prints tables/plots or hands over to the TUI

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, DataArgs, ExportArgs, SampleArgs, SummaryArgs};
use crate::config::EnvSettings;
use crate::data::DatasetCache;
use crate::domain::{Column, DashboardConfig, SalesDataset};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `sales` binary.
pub fn run() -> Result<(), AppError> {
    // `sales` and `sales -f data.csv` behave like `sales tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let interactive = matches!(cli.command, Command::Tui(_));
    init_tracing(cli.verbose, cli.quiet, interactive);

    let env = EnvSettings::from_env()?;

    match cli.command {
        Command::Summary(args) => handle_summary(&args, &env),
        Command::Pivot(args) => handle_pivot(&args, &env),
        Command::Margin(args) => handle_margin(&args, &env),
        Command::Distribution(args) => handle_distribution(&args, &env),
        Command::Export(args) => handle_export(&args, &env),
        Command::Sample(args) => handle_sample(&args),
        Command::Tui(args) => {
            let config = dashboard_config(&args, &env, None)?;
            crate::tui::run(config)
        }
    }
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the level comes from `-v`/`-q`
/// (default `warn`). The interactive dashboard logs nothing unless `RUST_LOG`
/// is set, since stderr output would corrupt the alternate screen.
fn init_tracing(verbose: bool, quiet: bool, interactive: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if interactive {
            EnvFilter::new("off")
        } else if quiet {
            EnvFilter::new("error")
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    // `try_init` so repeated calls (tests, embedding) don't panic.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn dashboard_config(
    args: &DataArgs,
    env: &EnvSettings,
    plot: Option<&SummaryArgs>,
) -> Result<DashboardConfig, AppError> {
    let data_path = crate::config::resolve_data_path(args.file.as_deref(), env)?;
    Ok(DashboardConfig {
        data_path,
        selection: args.selection(),
        cache_ttl: env.cache_ttl,
        plot: plot.is_none_or(|p| !p.no_plot),
        plot_width: plot.map_or(72, |p| p.width),
        plot_height: plot.map_or(16, |p| p.height),
    })
}

fn load(config: &DashboardConfig) -> Result<std::sync::Arc<SalesDataset>, AppError> {
    // One-shot commands still go through the cache so every front-end loads
    // data the same way.
    let mut cache = DatasetCache::new(config.cache_ttl);
    Ok(cache.get_or_load(&config.data_path)?)
}

fn handle_summary(args: &SummaryArgs, env: &EnvSettings) -> Result<(), AppError> {
    let config = dashboard_config(&args.data, env, Some(args))?;
    let dataset = load(&config)?;
    let view = pipeline::build_view(&dataset, &config.selection);

    println!("{}", crate::report::format_summary_header(&dataset, &view));

    println!("Monthly sales:");
    println!("{}", crate::report::format_monthly_table(&view.monthly_sales));
    if config.plot {
        let labels: Vec<String> = view.monthly_sales.iter().map(|r| r.month.to_string()).collect();
        let values: Vec<f64> = view.monthly_sales.iter().map(|r| r.sales).collect();
        println!(
            "{}",
            crate::plot::render_line_chart(&labels, &values, config.plot_width, config.plot_height, "sales")
        );
    }

    let shares = crate::report::category_shares(&view.month_categories);
    match view.month {
        Some(month) => println!("Category share ({month}):"),
        None => println!("Category share:"),
    }
    println!("{}", crate::report::format_category_table(&shares));
    if config.plot {
        println!("{}", crate::plot::render_bar_chart(&shares, config.plot_width / 2));
    }

    if let Some(margin) = &view.monthly_margin {
        println!("Profit margin:");
        println!("{}", crate::report::format_margin_table(margin));
    }

    if args.rows {
        println!("Rows ({}):", view.month_rows.len());
        println!("{}", crate::report::format_rows_table(&view.month_rows));
    }

    Ok(())
}

fn handle_pivot(args: &DataArgs, env: &EnvSettings) -> Result<(), AppError> {
    let config = dashboard_config(args, env, None)?;
    let dataset = load(&config)?;
    let view = pipeline::build_view(&dataset, &config.selection);

    println!("{}", crate::report::format_pivot_table(&view.pivot));
    println!("{}", crate::plot::render_heatmap(&view.pivot));
    Ok(())
}

fn handle_margin(args: &DataArgs, env: &EnvSettings) -> Result<(), AppError> {
    let config = dashboard_config(args, env, None)?;
    let dataset = load(&config)?;
    dataset.require(Column::Profit)?;

    let base = crate::aggregate::filter_by(&dataset.records, &config.selection.category_filter());
    let rows = crate::aggregate::aggregate_monthly_with_margin(&base)?;
    println!("{}", crate::report::format_margin_table(&rows));

    let undefined = rows.iter().filter(|r| !r.profit_margin.is_defined()).count();
    if undefined > 0 {
        println!("({undefined} month(s) with zero sales: margin n/a)");
    }
    Ok(())
}

fn handle_distribution(args: &DataArgs, env: &EnvSettings) -> Result<(), AppError> {
    let config = dashboard_config(args, env, None)?;
    let dataset = load(&config)?;
    let view = pipeline::build_view(&dataset, &config.selection);
    println!("{}", crate::report::format_distribution_table(&view.distribution));
    Ok(())
}

fn handle_export(args: &ExportArgs, env: &EnvSettings) -> Result<(), AppError> {
    let config = dashboard_config(&args.data, env, None)?;
    let dataset = load(&config)?;
    let view = pipeline::build_view(&dataset, &config.selection);
    crate::io::export::write_export(&args.out, &view, args.format, args.table)?;
    println!("Wrote {}", args.out.display());
    Ok(())
}

fn handle_sample(args: &SampleArgs) -> Result<(), AppError> {
    let categories = if args.categories.is_empty() {
        crate::data::sample::DEFAULT_CATEGORIES
            .iter()
            .map(|s| s.to_string())
            .collect()
    } else {
        args.categories.clone()
    };
    let config = crate::data::SampleConfig {
        start: args.start,
        months: args.months,
        rows_per_month: args.rows_per_month,
        categories,
        seed: args.seed,
    };
    let records = crate::data::generate_sample(&config)?;
    crate::data::write_sample_csv(&args.out, &records)?;
    tracing::info!(path = %args.out.display(), rows = records.len(), "sample written");
    println!("Wrote {} rows to {}", records.len(), args.out.display());
    Ok(())
}

/// Rewrite argv so `sales` defaults to `sales tui`.
///
/// Rules:
/// - `sales`                     -> `sales tui`
/// - `sales -f data.csv ...`     -> `sales tui -f data.csv ...`
/// - `sales --help/--version/-h` -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "summary" | "pivot" | "margin" | "distribution" | "export" | "sample" | "tui"
    );
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_opens_tui() {
        assert_eq!(rewrite_args(argv(&["sales"])), argv(&["sales", "tui"]));
    }

    #[test]
    fn leading_flags_go_to_tui() {
        assert_eq!(
            rewrite_args(argv(&["sales", "-f", "d.csv"])),
            argv(&["sales", "tui", "-f", "d.csv"])
        );
    }

    #[test]
    fn subcommands_and_help_untouched() {
        assert_eq!(rewrite_args(argv(&["sales", "pivot"])), argv(&["sales", "pivot"]));
        assert_eq!(rewrite_args(argv(&["sales", "--help"])), argv(&["sales", "--help"]));
    }

    #[test]
    fn summary_config_takes_plot_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.csv");
        let args = SummaryArgs {
            data: DataArgs {
                file: Some(path.clone()),
                ..DataArgs::default()
            },
            no_plot: true,
            rows: false,
            width: 40,
            height: 8,
        };
        let config = dashboard_config(&args.data, &EnvSettings::default(), Some(&args)).unwrap();
        assert_eq!(config.data_path, path);
        assert!(!config.plot);
        assert_eq!(config.plot_width, 40);
    }
}
