//! Monthly order count and revenue over a trailing window

use std::collections::BTreeMap;

use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::join::JoinedOrder;
use crate::timeline::{self, MONTH, ORDER_ID, PRICE};

/// Order count and revenue of one calendar month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRevenueRow {
    /// e.g. "March-2024"
    pub month_label: String,
    pub month_end: NaiveDate,
    /// Distinct orders in the month
    pub order_count: usize,
    /// Sum of item prices in the month
    pub revenue: f64,
}

/// Aggregate the last `months` calendar months of purchases by month.
///
/// # Arguments
/// * `joined` - Joined order rows with raw purchase timestamps
/// * `months` - Length of the trailing window in calendar months
///
/// # Returns
/// One row per calendar month between the first and the last populated one,
/// in chronological order. Empty months carry zero orders and zero revenue.
/// The window starts `months` calendar months before the latest purchase and
/// includes that instant.
pub fn monthly_revenue(joined: &[JoinedOrder], months: u32) -> crate::Result<Vec<MonthlyRevenueRow>> {
    let purchases = timeline::purchase_frame(joined)?;
    let Some(max_date) = timeline::latest(&purchases)? else {
        return Ok(Vec::new());
    };
    let start = timeline::window_start(max_date, months);
    debug!(%start, end = %max_date, months, "monthly revenue window");

    let monthly = timeline::since(purchases, start)?
        .lazy()
        .group_by([col(MONTH)])
        .agg([
            col(ORDER_ID).n_unique().alias("order_count"),
            col(PRICE).sum().alias("revenue"),
        ])
        .collect()?;

    let month_keys: Vec<i32> = monthly.column(MONTH)?.i32()?.into_no_null_iter().collect();
    let order_counts: Vec<i64> = monthly
        .column("order_count")?
        .cast(&DataType::Int64)?
        .i64()?
        .into_no_null_iter()
        .collect();
    let revenues: Vec<f64> = monthly.column("revenue")?.f64()?.into_no_null_iter().collect();

    let buckets: BTreeMap<i32, (usize, f64)> = month_keys
        .into_iter()
        .zip(order_counts.into_iter().zip(revenues))
        .map(|(key, (count, revenue))| (key, (count as usize, revenue)))
        .collect();

    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Ok(Vec::new());
    };

    Ok((first..=last)
        .map(|key| {
            let (order_count, revenue) = buckets.get(&key).copied().unwrap_or((0, 0.0));
            month_row(timeline::month_of_key(key), order_count, revenue)
        })
        .collect())
}

fn month_row((year, month): (i32, u32), order_count: usize, revenue: f64) -> MonthlyRevenueRow {
    let month_end = NaiveDate::from_ymd_opt(year, month, 1)
        .map(timeline::month_end)
        .unwrap_or(NaiveDate::MAX);
    MonthlyRevenueRow {
        month_label: month_end.format("%B-%Y").to_string(),
        month_end,
        order_count,
        revenue,
    }
}
