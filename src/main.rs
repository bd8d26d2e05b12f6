//! orderlens: e-commerce reporting CLI
//!
//! Loads the order, item and review tables, builds the report, then prints it
//! and renders the charts.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use orderlens::{build_report, load_tables, viz, Args, ReportConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => ReportConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ReportConfig::default(),
    };
    let config = args.apply_overrides(config);

    run(&args, &config)
}

/// Logs go to stderr so `--json` output stays parseable
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn run(args: &Args, config: &ReportConfig) -> Result<()> {
    let start_time = Instant::now();

    let paths = args.data_paths();
    let load_start = Instant::now();
    let tables = load_tables(&paths).context("loading input tables")?;
    info!(
        orders = tables.orders.len(),
        order_items = tables.order_items.len(),
        reviews = tables.review_products.len(),
        elapsed_ms = load_start.elapsed().as_millis() as u64,
        "tables loaded"
    );

    let report_start = Instant::now();
    let report = build_report(&tables, config).context("building report")?;
    info!(
        elapsed_ms = report_start.elapsed().as_millis() as u64,
        "report built"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        viz::print_report(&report);
    }

    if !args.no_charts {
        let written = viz::render_charts(&report, &args.output_dir)
            .with_context(|| format!("rendering charts into {}", args.output_dir.display()))?;
        info!(charts = written.len(), dir = %args.output_dir.display(), "charts rendered");
    }

    info!(
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "done"
    );
    Ok(())
}
