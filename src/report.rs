//! Report configuration and assembly of all derived views

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::category::{rank_categories, CategoryRankRow};
use crate::data::{Tables, ORDERS_TABLE, ORDER_ITEMS_TABLE, REVIEW_PRODUCT_TABLE};
use crate::error::{DataWarning, PipelineError};
use crate::join::join_orders;
use crate::revenue::{monthly_revenue, MonthlyRevenueRow};
use crate::rfm::{build_rfm, select_best_customers, BestCustomerRow, RfmDistributions, RfmRow, RfmThresholds};

/// Name used in warnings when the join leaves no rows
pub const JOINED_ORDERS_TABLE: &str = "joined_orders";

/// Window sizes and list lengths of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub revenue_window_months: u32,
    pub rfm_window_months: u32,
    pub top_categories: usize,
    pub best_customers: usize,
    pub histogram_bins: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            revenue_window_months: 6,
            rfm_window_months: 1,
            top_categories: 10,
            best_customers: 5,
            histogram_bins: 30,
        }
    }
}

impl ReportConfig {
    /// Read a TOML file; keys left out keep their defaults
    pub fn from_toml_file(path: &Path) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|err| PipelineError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}

/// All views derived from one set of input tables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub monthly_revenue: Vec<MonthlyRevenueRow>,
    pub top_categories: Vec<CategoryRankRow>,
    pub rfm: Vec<RfmRow>,
    pub thresholds: Option<RfmThresholds>,
    pub distributions: RfmDistributions,
    pub best_customers: Vec<BestCustomerRow>,
    pub warnings: Vec<DataWarning>,
}

/// Run every stage over `tables`.
///
/// # Arguments
/// * `tables` - Loaded input tables; only borrowed
/// * `config` - Window lengths, result sizes and histogram bins
///
/// # Returns
/// The assembled report, including a warning for every empty input. Building
/// twice from the same tables gives equal reports.
pub fn build_report(tables: &Tables, config: &ReportConfig) -> crate::Result<Report> {
    let mut warnings = Vec::new();
    for (table, is_empty) in [
        (ORDERS_TABLE, tables.orders.is_empty()),
        (ORDER_ITEMS_TABLE, tables.order_items.is_empty()),
        (REVIEW_PRODUCT_TABLE, tables.review_products.is_empty()),
    ] {
        if is_empty {
            warnings.push(DataWarning::EmptyTable { table });
        }
    }

    let joined = join_orders(&tables.orders, &tables.order_items)?;
    if joined.is_empty() && !tables.orders.is_empty() && !tables.order_items.is_empty() {
        warnings.push(DataWarning::EmptyTable {
            table: JOINED_ORDERS_TABLE,
        });
    }
    for warning in &warnings {
        warn!(%warning, "empty input");
    }

    let monthly_revenue = monthly_revenue(&joined, config.revenue_window_months)?;
    info!(months = monthly_revenue.len(), "computed monthly revenue");

    let top_categories = rank_categories(&tables.review_products, config.top_categories)?;
    info!(categories = top_categories.len(), "ranked categories");

    let rfm = build_rfm(&joined, config.rfm_window_months)?;
    let thresholds = RfmThresholds::from_population(&rfm);
    let distributions = RfmDistributions::from_population(&rfm, config.histogram_bins);
    let best_customers = select_best_customers(&rfm, config.best_customers);
    info!(
        customers = rfm.len(),
        best = best_customers.len(),
        "computed rfm features"
    );

    Ok(Report {
        monthly_revenue,
        top_categories,
        rfm,
        thresholds,
        distributions,
        best_customers,
        warnings,
    })
}
