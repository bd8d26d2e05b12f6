//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;

use crate::data::DataPaths;
use crate::report::ReportConfig;

/// Monthly revenue, category quality and RFM reports from e-commerce order tables
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding orders_dataset.csv, order_items_dataset.csv and review_product_df.csv
    #[arg(short, long, default_value = "dashboard")]
    pub data_dir: PathBuf,

    /// Orders CSV (overrides the file in --data-dir)
    #[arg(long)]
    pub orders: Option<PathBuf>,

    /// Order items CSV (overrides the file in --data-dir)
    #[arg(long)]
    pub order_items: Option<PathBuf>,

    /// Reviewed products CSV (overrides the file in --data-dir)
    #[arg(long)]
    pub reviews: Option<PathBuf>,

    /// Directory for the PNG charts
    #[arg(short, long, default_value = "charts")]
    pub output_dir: PathBuf,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Print the report as JSON instead of tables
    #[arg(long)]
    pub json: bool,

    /// TOML file with report settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Months of history in the revenue trend
    #[arg(long)]
    pub revenue_months: Option<u32>,

    /// Months of history used for RFM features
    #[arg(long)]
    pub rfm_months: Option<u32>,

    /// Number of categories to rank
    #[arg(long)]
    pub top_categories: Option<usize>,

    /// Number of best customers to list
    #[arg(long)]
    pub best_customers: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Input files, with explicit paths taking precedence over the data directory
    pub fn data_paths(&self) -> DataPaths {
        let defaults = DataPaths::in_dir(&self.data_dir);
        DataPaths {
            orders: self.orders.clone().unwrap_or(defaults.orders),
            order_items: self.order_items.clone().unwrap_or(defaults.order_items),
            review_products: self.reviews.clone().unwrap_or(defaults.review_products),
        }
    }

    /// Apply command-line overrides on top of a base configuration
    pub fn apply_overrides(&self, mut config: ReportConfig) -> ReportConfig {
        if let Some(months) = self.revenue_months {
            config.revenue_window_months = months;
        }
        if let Some(months) = self.rfm_months {
            config.rfm_window_months = months;
        }
        if let Some(limit) = self.top_categories {
            config.top_categories = limit;
        }
        if let Some(limit) = self.best_customers {
            config.best_customers = limit;
        }
        config
    }
}
