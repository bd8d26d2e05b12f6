//! orderlens: reporting over e-commerce order, item and review tables
//!
//! Builds four views from three input tables: monthly revenue over a trailing
//! window, product categories ranked by review score, per-customer RFM
//! (Recency, Frequency, Monetary) features, and a best-customer leaderboard.

pub mod category;
pub mod cli;
pub mod data;
pub mod error;
pub mod join;
pub mod report;
pub mod revenue;
pub mod rfm;
pub mod stats;
pub mod timeline;
pub mod viz;

// Re-export public items for easier access
pub use category::{rank_categories, CategoryRankRow};
pub use cli::Args;
pub use data::{load_tables, DataPaths, Order, OrderItem, ReviewProduct, Tables};
pub use error::{DataWarning, PipelineError};
pub use join::{join_orders, JoinedOrder};
pub use report::{build_report, Report, ReportConfig};
pub use revenue::{monthly_revenue, MonthlyRevenueRow};
pub use rfm::{build_rfm, select_best_customers, BestCustomerRow, RfmRow, RfmThresholds};

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, PipelineError>;
